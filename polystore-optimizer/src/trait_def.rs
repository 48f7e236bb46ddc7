// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The trait/convention framework (`spec.md` §4.2): pluggable trait
//! definitions with a partial order (`satisfies`), a default manifestation,
//! and conversion synthesis.
//!
//! A `TraitManifestation` is an interned, per-slot tag (`spec.md` §3 says
//! manifestations are interned per definition); the `TraitDef` that owns a
//! slot is the only code that interprets what a given tag means, so the
//! framework itself just threads opaque tags around by index.

use polystore_common::{invalid_input_err, PolystoreError, Result, RowTypeRef};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::algebra::AlgebraNode;
use crate::space::SubsetId;

/// An interned manifestation of some trait, e.g. the `ENUMERABLE`
/// convention or a `hash(a)` distribution. Cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitManifestation(pub Arc<str>);

impl TraitManifestation {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }
}

impl fmt::Display for TraitManifestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context handed to `TraitDef::convert`: the row type the converter node
/// must preserve, and whether an infinite-cost (always-correct-but-slow)
/// converter is acceptable when no cheap one exists.
pub struct ConvertContext<'a> {
    pub row_type: &'a RowTypeRef,
    pub allow_infinite: bool,
}

/// A pluggable trait definition: the slot (assigned by registration order),
/// a default manifestation, a partial order, and a converter factory.
pub trait TraitDef: fmt::Debug {
    /// Human-readable trait name, e.g. `"convention"`, `"collation"`.
    fn name(&self) -> &str;

    /// The manifestation logical nodes carry when nothing else requires
    /// one — e.g. `NONE` for convention.
    fn default_manifestation(&self) -> TraitManifestation;

    /// Whether holding `have` satisfies a requirement of `want`.
    fn satisfies(&self, have: &TraitManifestation, want: &TraitManifestation) -> bool;

    /// Synthesize a conversion node from `input` (already in manifestation
    /// `have`, implicitly) to `target`, or `None` if this trait doesn't
    /// know how to convert between the two.
    fn convert(
        &self,
        ctx: &ConvertContext<'_>,
        input: SubsetId,
        have: &TraitManifestation,
        target: &TraitManifestation,
    ) -> Option<AlgebraNode>;

    /// Escape hatch for the one caller (`TraitDefRegistry::convention_def`)
    /// that needs the concrete type back out of the type-erased slot list.
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A fixed-length vector of trait manifestations, one slot per registered
/// `TraitDef`, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitSet(Vec<TraitManifestation>);

impl TraitSet {
    pub fn new(manifestations: Vec<TraitManifestation>) -> Self {
        Self(manifestations)
    }

    pub fn get(&self, slot: usize) -> Option<&TraitManifestation> {
        self.0.get(slot)
    }

    pub fn set(&mut self, slot: usize, manifestation: TraitManifestation) {
        self.0[slot] = manifestation;
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slots(&self) -> &[TraitManifestation] {
        &self.0
    }
}

/// Name of the distinguished convention trait slot (always slot `0` in
/// this crate, per `spec.md` §4.2: "Conventions are one specific trait").
pub const CONVENTION_SLOT: usize = 0;

/// `NONE`: the convention of logical nodes. Cannot satisfy any
/// non-`NONE` requirement (`spec.md` §4.2).
pub fn none_convention() -> TraitManifestation {
    TraitManifestation::new("NONE")
}

/// One registered convention: its name plus whether it is interpreted
/// (vs. compiled/native codegen) — the "additional interpreter/codegen
/// flag" `spec.md` §4.2 calls for.
#[derive(Debug, Clone)]
pub struct Convention {
    pub name: TraitManifestation,
    pub is_interpreted: bool,
}

type ConverterFactory = Arc<dyn Fn(&ConvertContext<'_>, SubsetId) -> AlgebraNode + Send + Sync>;

/// The built-in `TraitDef` for convention: `NONE` plus whatever adapters
/// register via `registerConvention` (`spec.md` §6), along with converter
/// factories adapters register alongside their rules.
#[derive(Default)]
pub struct ConventionTraitDef {
    conventions: Vec<Convention>,
    converters: hashbrown::HashMap<(TraitManifestation, TraitManifestation), ConverterFactory>,
}

impl fmt::Debug for ConventionTraitDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionTraitDef")
            .field("conventions", &self.conventions)
            .finish()
    }
}

impl ConventionTraitDef {
    pub fn new() -> Self {
        let mut def = Self::default();
        def.conventions.push(Convention {
            name: none_convention(),
            is_interpreted: false,
        });
        def
    }

    pub fn register_convention(&mut self, name: impl AsRef<str>, is_interpreted: bool) -> Result<()> {
        let manifestation = TraitManifestation::new(name);
        if self.conventions.iter().any(|c| c.name == manifestation) {
            return invalid_input_err!("convention {manifestation} already registered");
        }
        self.conventions.push(Convention {
            name: manifestation,
            is_interpreted,
        });
        Ok(())
    }

    pub fn register_converter(
        &mut self,
        from: TraitManifestation,
        to: TraitManifestation,
        factory: impl Fn(&ConvertContext<'_>, SubsetId) -> AlgebraNode + Send + Sync + 'static,
    ) {
        self.converters.insert((from, to), Arc::new(factory));
    }

    pub fn conventions(&self) -> &[Convention] {
        &self.conventions
    }
}

impl TraitDef for ConventionTraitDef {
    fn name(&self) -> &str {
        "convention"
    }

    fn default_manifestation(&self) -> TraitManifestation {
        none_convention()
    }

    fn satisfies(&self, have: &TraitManifestation, want: &TraitManifestation) -> bool {
        if *want == none_convention() {
            return true;
        }
        if *have == none_convention() {
            return false;
        }
        have == want
    }

    fn convert(
        &self,
        ctx: &ConvertContext<'_>,
        input: SubsetId,
        have: &TraitManifestation,
        target: &TraitManifestation,
    ) -> Option<AlgebraNode> {
        self.converters
            .get(&(have.clone(), target.clone()))
            .map(|factory| factory(ctx, input))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of all `TraitDef`s known to a planner run, in registration
/// order; slot indices into `TraitSet` are assigned by this order.
pub struct TraitDefRegistry {
    defs: Vec<Box<dyn TraitDef>>,
}

impl fmt::Debug for TraitDefRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitDefRegistry")
            .field("names", &self.defs.iter().map(|d| d.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

impl TraitDefRegistry {
    /// A fresh registry with the convention trait already installed in
    /// slot `0` (`CONVENTION_SLOT`), matching `spec.md`'s treatment of
    /// convention as "one specific trait" every planner run needs.
    pub fn with_convention() -> (Self, ()) {
        let registry = Self {
            defs: vec![Box::new(ConventionTraitDef::new())],
        };
        (registry, ())
    }

    pub fn add(&mut self, def: Box<dyn TraitDef>) -> Result<usize> {
        if self.defs.iter().any(|d| d.name() == def.name()) {
            return invalid_input_err!("trait def {} already registered", def.name());
        }
        self.defs.push(def);
        Ok(self.defs.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&dyn TraitDef> {
        self.defs.get(slot).map(|b| b.as_ref())
    }

    pub fn convention_def(&self) -> Result<&ConventionTraitDef> {
        self.defs
            .get(CONVENTION_SLOT)
            .and_then(|d| d.as_any().downcast_ref::<ConventionTraitDef>())
            .ok_or_else(|| PolystoreError::Internal("convention trait def missing from slot 0".into()))
    }

    pub fn convention_def_mut(&mut self) -> Result<&mut ConventionTraitDef> {
        self.defs
            .get_mut(CONVENTION_SLOT)
            .and_then(|d| d.as_any_mut().downcast_mut::<ConventionTraitDef>())
            .ok_or_else(|| PolystoreError::Internal("convention trait def missing from slot 0".into()))
    }

    /// The default `TraitSet` (every slot at its `TraitDef`'s default
    /// manifestation), assigned to freshly-built logical nodes.
    pub fn default_trait_set(&self) -> TraitSet {
        TraitSet::new(self.defs.iter().map(|d| d.default_manifestation()).collect())
    }

    /// Whether `have` satisfies every slot `want` requires.
    pub fn satisfies(&self, have: &TraitSet, want: &TraitSet) -> bool {
        (0..self.defs.len()).all(|slot| match (have.get(slot), want.get(slot)) {
            (Some(h), Some(w)) => self.defs[slot].satisfies(h, w),
            _ => false,
        })
    }

    pub fn convert(
        &self,
        slot: usize,
        ctx: &ConvertContext<'_>,
        input: SubsetId,
        have: &TraitManifestation,
        target: &TraitManifestation,
    ) -> Option<AlgebraNode> {
        self.defs.get(slot)?.convert(ctx, input, have, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_satisfies_non_none_requirement() {
        let def = ConventionTraitDef::new();
        let jdbc = TraitManifestation::new("JDBC");
        assert!(!def.satisfies(&none_convention(), &jdbc));
        assert!(def.satisfies(&jdbc, &none_convention()));
        assert!(def.satisfies(&jdbc, &jdbc));
    }

    #[test]
    fn duplicate_convention_registration_rejected() {
        let mut def = ConventionTraitDef::new();
        def.register_convention("JDBC", false).unwrap();
        assert!(def.register_convention("JDBC", false).is_err());
    }
}
