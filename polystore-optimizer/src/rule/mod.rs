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

//! The rule engine (`spec.md` §4.4): a rule is `(pattern, action)`; matched
//! bindings become `RuleCall`s in an importance-ordered queue.

pub mod builtin;
pub mod pattern;
pub mod queue;

pub use pattern::{Binding, ChildMatch, KindMatch, Operand, Pattern};
pub use queue::{RuleCall, RuleCallQueue};

use crate::algebra::AlgebraKind;
use crate::space::{Space, SubsetId};
use crate::trait_def::TraitSet;
use polystore_common::{incompatible_rewrite_err, Result, RowTypeRef};
use std::fmt;

/// Handed to a rule's `apply`: a narrow view over the space scoped to the
/// one root subset the rule is rewriting, since `spec.md` §5 requires rule
/// actions to be synchronous functions of the space with no suspension
/// points.
pub struct RuleContext<'a> {
    space: &'a mut Space,
    root: SubsetId,
    expected_row_type: RowTypeRef,
    produced: Vec<SubsetId>,
}

impl<'a> RuleContext<'a> {
    pub fn new(space: &'a mut Space, root: SubsetId, expected_row_type: RowTypeRef) -> Self {
        Self {
            space,
            root,
            expected_row_type,
            produced: Vec::new(),
        }
    }

    /// Subsets that received a genuinely new member during this rule call,
    /// for the planner to seed further rule matches against.
    pub fn take_produced(self) -> Vec<SubsetId> {
        self.produced
    }

    pub fn root(&self) -> SubsetId {
        self.root
    }

    pub fn space(&self) -> &Space {
        self.space
    }

    /// `intern(node) -> Subset` (`spec.md` §4.3): registers a node that is
    /// not itself the rewritten root — an intermediate node a multi-level
    /// rewrite needs below (or beside) the replacement it eventually hands
    /// to `transform_to`.
    pub fn intern(
        &mut self,
        kind: AlgebraKind,
        inputs: Vec<SubsetId>,
        trait_set: TraitSet,
        row_type: RowTypeRef,
    ) -> Result<(SubsetId, bool)> {
        let result = self.space.intern_new(kind, inputs, trait_set, row_type)?;
        if result.1 {
            self.produced.push(result.0);
        }
        Ok(result)
    }

    /// `transformTo(equivalent)`: interns `kind` into the same set as the
    /// rule's root. Rejects a replacement whose row type differs from the
    /// original (`spec.md` §4.4: "Fatal conditions" -> `IncompatibleRewrite`).
    pub fn transform_to(
        &mut self,
        kind: AlgebraKind,
        inputs: Vec<SubsetId>,
        trait_set: TraitSet,
        row_type: RowTypeRef,
    ) -> Result<(SubsetId, bool)> {
        if !row_type.compatible_with(&self.expected_row_type) {
            return incompatible_rewrite_err!(
                "rule produced a node with row type {row_type:?}, expected a type compatible with {:?}",
                self.expected_row_type
            );
        }
        let result = self.space.transform_to(self.root, kind, inputs, trait_set, row_type)?;
        if result.1 {
            self.produced.push(result.0);
        }
        Ok(result)
    }
}

/// A transformation or implementation rule: `spec.md` §4.4's `(pattern,
/// action)` pair.
pub trait Rule: fmt::Debug {
    fn name(&self) -> &str;
    fn pattern(&self) -> &Pattern;

    /// Implementation rules convert logical nodes to physical ones in a
    /// declared convention (`spec.md` §2 component 5); transformation
    /// rules stay logical-to-logical.
    fn is_implementation_rule(&self) -> bool {
        false
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, binding: &Binding) -> Result<()>;
}
