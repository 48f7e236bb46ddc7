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

//! Rule patterns: an operand tree matched against the space on intern
//! (`spec.md` §4.4). The root operand matches a node's kind; each child
//! operand matches a child input subset's members, positionally or
//! unordered.

use crate::space::{NodeId, Space};
use itertools::Itertools;

/// What an operand's root kind must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindMatch {
    /// Matches a node of any kind.
    Any,
    /// Matches exactly the named algebra kind (`AlgebraKind::name()`).
    Exact(String),
}

#[derive(Debug, Clone)]
pub enum ChildMatch {
    /// Don't recurse into this operand's inputs; any member matching the
    /// kind suffices.
    Leaf,
    /// Children matched in input order.
    Positional(Vec<Operand>),
    /// Children matched in any order (`spec.md` §4.4: operands may be
    /// `unordered`), tried via full permutation since operand counts here
    /// are small (joins, set ops).
    Unordered(Vec<Operand>),
}

#[derive(Debug, Clone)]
pub struct Operand {
    pub kind: KindMatch,
    pub children: ChildMatch,
}

impl Operand {
    pub fn any() -> Self {
        Self {
            kind: KindMatch::Any,
            children: ChildMatch::Leaf,
        }
    }

    pub fn exact(kind: impl Into<String>) -> Self {
        Self {
            kind: KindMatch::Exact(kind.into()),
            children: ChildMatch::Leaf,
        }
    }

    pub fn with_positional_children(mut self, children: Vec<Operand>) -> Self {
        self.children = ChildMatch::Positional(children);
        self
    }

    pub fn with_unordered_children(mut self, children: Vec<Operand>) -> Self {
        self.children = ChildMatch::Unordered(children);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub root: Operand,
}

impl Pattern {
    pub fn new(root: Operand) -> Self {
        Self { root }
    }
}

/// A successful binding: every node id bound by the pattern, in pre-order
/// (root first, then each child's binding in match order).
pub type Binding = Vec<NodeId>;

fn kind_matches(kind: &KindMatch, node: &crate::algebra::AlgebraNode) -> bool {
    match kind {
        KindMatch::Any => true,
        KindMatch::Exact(name) => node.kind.name() == name,
    }
}

fn match_operand(operand: &Operand, node_id: NodeId, space: &Space) -> Vec<Binding> {
    let node = space.node(node_id);
    if !kind_matches(&operand.kind, node) {
        return Vec::new();
    }
    match &operand.children {
        ChildMatch::Leaf => vec![vec![node_id]],
        ChildMatch::Positional(children) => {
            if children.len() != node.inputs.len() {
                return Vec::new();
            }
            let per_child: Vec<Vec<Binding>> = node
                .inputs
                .iter()
                .zip(children)
                .map(|(&subset, child_operand)| match_subset(child_operand, subset, space))
                .collect();
            cross_product(&per_child, node_id)
        }
        ChildMatch::Unordered(children) => {
            if children.len() != node.inputs.len() {
                return Vec::new();
            }
            let mut bindings = Vec::new();
            for permuted in children.iter().collect::<Vec<_>>().into_iter().permutations(children.len()) {
                let per_child: Vec<Vec<Binding>> = node
                    .inputs
                    .iter()
                    .zip(permuted)
                    .map(|(&subset, child_operand)| match_subset(child_operand, subset, space))
                    .collect();
                bindings.extend(cross_product(&per_child, node_id));
            }
            bindings
        }
    }
}

fn match_subset(operand: &Operand, subset: crate::space::SubsetId, space: &Space) -> Vec<Binding> {
    space
        .subset(subset)
        .members()
        .iter()
        .flat_map(|&member| match_operand(operand, member, space))
        .collect()
}

fn cross_product(per_child: &[Vec<Binding>], root: NodeId) -> Vec<Binding> {
    if per_child.iter().any(|c| c.is_empty()) {
        return Vec::new();
    }
    per_child
        .iter()
        .multi_cartesian_product()
        .map(|combo| {
            let mut binding = vec![root];
            for child_binding in combo {
                binding.extend(child_binding.iter().copied());
            }
            binding
        })
        .collect()
}

/// All bindings of `pattern` rooted at `node_id`.
pub fn match_pattern(pattern: &Pattern, node_id: NodeId, space: &Space) -> Vec<Binding> {
    match_operand(&pattern.root, node_id, space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::AlgebraKind;
    use crate::trait_def::{none_convention, TraitSet};
    use polystore_common::{DataType, Field, RowType};

    fn row_type() -> polystore_common::RowTypeRef {
        RowType::new(vec![Field {
            name: "a".into(),
            data_type: DataType::Int64 { nullable: false },
        }])
    }

    fn none_trait_set() -> TraitSet {
        TraitSet::new(vec![none_convention()])
    }

    #[test]
    fn positional_pattern_matches_filter_over_scan() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let filter_cond = polystore_expr::RowExpression::boolean(true);
        let (filter_subset, _) = space
            .intern_new(
                AlgebraKind::Filter { condition: filter_cond },
                vec![scan],
                none_trait_set(),
                row_type(),
            )
            .unwrap();

        let pattern = Pattern::new(
            Operand::exact("Filter").with_positional_children(vec![Operand::exact("Scan")]),
        );
        let filter_node = space.subset(filter_subset).members()[0];
        let bindings = match_pattern(&pattern, filter_node, &space);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].len(), 2);
    }

    #[test]
    fn kind_mismatch_yields_no_bindings() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let scan_node = space.subset(scan).members()[0];
        let pattern = Pattern::new(Operand::exact("Filter"));
        assert!(match_pattern(&pattern, scan_node, &space).is_empty());
    }
}
