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

//! Canonical digests (`spec.md` §3: "kind + operands + referenced subsets +
//! trait manifestations"). Kept as a readable string rather than a numeric
//! hash so that set-merge scenarios and test assertions can be read
//! directly off it, matching the pretty `Display` the rest of this crate
//! uses for plan trees.
//!
//! This is purely a structural hash over whatever `AlgebraKind` it is
//! handed; `Space::intern_new`/`transform_to` run each kind through
//! `AlgebraKind::canonicalize` first, so two syntactically different
//! predicates that simplify to the same canonical form produce the same
//! digest here, which is what scenario 4's set-merge-on-equivalent-rewrite
//! (`spec.md` §8) depends on.

use crate::algebra::AlgebraKind;
use crate::space::SubsetId;
use crate::trait_def::TraitSet;

pub fn compute(kind: &AlgebraKind, inputs: &[SubsetId], trait_set: &TraitSet) -> String {
    let inputs_part = inputs.iter().map(|s| s.0.to_string()).collect::<Vec<_>>().join(",");
    let traits_part = trait_set
        .slots()
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{kind}|in=[{inputs_part}]|traits=[{traits_part}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::AlgebraKind;
    use crate::trait_def::{none_convention, TraitSet};

    #[test]
    fn equal_shape_yields_equal_digest() {
        let kind = AlgebraKind::Scan { table: "T".into() };
        let inputs: Vec<SubsetId> = vec![];
        let traits = TraitSet::new(vec![none_convention()]);
        assert_eq!(compute(&kind, &inputs, &traits), compute(&kind, &inputs, &traits));
    }

    #[test]
    fn different_table_yields_different_digest() {
        let traits = TraitSet::new(vec![none_convention()]);
        let a = compute(&AlgebraKind::Scan { table: "T".into() }, &[], &traits);
        let b = compute(&AlgebraKind::Scan { table: "S".into() }, &[], &traits);
        assert_ne!(a, b);
    }
}
