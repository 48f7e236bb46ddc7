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

//! The equivalence-class search space (`spec.md` §4.3): `intern`,
//! `mergeSets`, and `ancestors` over an arena of `AlgebraNode`s, `Set`s and
//! `Subset`s addressed by handle rather than pointer, per `spec.md` §9
//! ("Cyclic references in the search space").

pub mod set;
pub mod subset;
pub mod union_find;

pub use set::Set;
pub use subset::Subset;
use union_find::UnionFind;

use crate::algebra::AlgebraKind;
use crate::algebra::AlgebraNode;
use crate::digest;
use crate::trait_def::TraitSet;
use hashbrown::HashMap;
use polystore_common::{internal_err, Result, RowTypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetId(pub usize);

/// Arena-owned search space. Nothing here is ever freed mid-run (`spec.md`
/// §3: "Nodes are never freed during a planning run"); the whole space is
/// dropped at planner teardown.
pub struct Space {
    nodes: Vec<AlgebraNode>,
    node_set: Vec<SetId>,
    sets: Vec<Option<Set>>,
    subsets: Vec<Subset>,
    subset_redirect: Vec<Option<SubsetId>>,
    digest_index: HashMap<String, NodeId>,
    uf: UnionFind,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_set: Vec::new(),
            sets: Vec::new(),
            subsets: Vec::new(),
            subset_redirect: Vec::new(),
            digest_index: HashMap::new(),
            uf: UnionFind::new(),
        }
    }

    fn new_set(&mut self, row_type: RowTypeRef) -> SetId {
        let id = self.uf.push();
        debug_assert_eq!(id.0, self.sets.len());
        self.sets.push(Some(Set::new(id, row_type)));
        id
    }

    fn new_subset(&mut self, set_id: SetId, trait_set: TraitSet) -> SubsetId {
        let id = SubsetId(self.subsets.len());
        self.subsets.push(Subset::new(id, set_id, trait_set));
        self.subset_redirect.push(None);
        id
    }

    /// Follows a subset's redirect chain to its currently-live alias
    /// (`spec.md` §4.3: "references ... redirected lazily").
    pub fn resolve_subset(&self, id: SubsetId) -> SubsetId {
        let mut cur = id;
        while let Some(next) = self.subset_redirect[cur.0] {
            cur = next;
        }
        cur
    }

    fn find_set(&self, id: SetId) -> SetId {
        self.uf.find_ro(id)
    }

    pub fn node(&self, id: NodeId) -> &AlgebraNode {
        &self.nodes[id.0]
    }

    pub fn subset(&self, id: SubsetId) -> &Subset {
        &self.subsets[self.resolve_subset(id).0]
    }

    pub fn subset_mut(&mut self, id: SubsetId) -> &mut Subset {
        let resolved = self.resolve_subset(id);
        &mut self.subsets[resolved.0]
    }

    pub fn set_of(&self, subset: SubsetId) -> SetId {
        self.find_set(self.subset(subset).set_id)
    }

    pub fn row_type_of(&self, subset: SubsetId) -> RowTypeRef {
        let set_id = self.set_of(subset);
        self.sets[set_id.0].as_ref().expect("leader set present").row_type.clone()
    }

    fn record_parents(&mut self, node: NodeId, inputs: &[SubsetId]) {
        for &input in inputs {
            let set_id = self.set_of(input);
            self.sets[set_id.0].as_mut().expect("leader set present").add_parent(node);
        }
    }

    /// `intern(node) -> Subset`: the first registration of a freshly built
    /// node with no target set in mind. Returns the subset plus whether a
    /// new member was actually created (vs. deduplicated against an
    /// existing digest), so the rule engine knows whether to seed new rule
    /// calls.
    pub fn intern_new(
        &mut self,
        kind: AlgebraKind,
        inputs: Vec<SubsetId>,
        trait_set: TraitSet,
        row_type: RowTypeRef,
    ) -> Result<(SubsetId, bool)> {
        let kind = kind.canonicalize()?;
        let resolved_inputs: Vec<SubsetId> = inputs.into_iter().map(|s| self.resolve_subset(s)).collect();
        let digest = digest::compute(&kind, &resolved_inputs, &trait_set);

        if let Some(&existing) = self.digest_index.get(&digest) {
            let existing_subset = self.node_home_subset(existing);
            return Ok((existing_subset, false));
        }

        let set_id = self.new_set(row_type.clone());
        let subset_id = self.new_subset(set_id, trait_set.clone());
        self.sets[set_id.0]
            .as_mut()
            .expect("just created")
            .register_subset(trait_set.clone(), subset_id);

        let node_id = NodeId(self.nodes.len());
        self.nodes.push(AlgebraNode {
            digest: digest.clone(),
            kind,
            trait_set,
            inputs: resolved_inputs.clone(),
            row_type,
        });
        self.node_set.push(set_id);
        self.digest_index.insert(digest, node_id);
        self.subsets[subset_id.0].add_member(node_id);
        self.record_parents(node_id, &resolved_inputs);

        Ok((subset_id, true))
    }

    /// `transformTo`: a rule action's replacement for `root`'s member. If
    /// the new node's canonical digest is already registered under a
    /// *different* set, the two sets are merged (`spec.md` §8 scenario 4);
    /// otherwise the node becomes a new member of `root`'s own set.
    pub fn transform_to(
        &mut self,
        root: SubsetId,
        kind: AlgebraKind,
        inputs: Vec<SubsetId>,
        trait_set: TraitSet,
        row_type: RowTypeRef,
    ) -> Result<(SubsetId, bool)> {
        let kind = kind.canonicalize()?;
        let root = self.resolve_subset(root);
        let root_set = self.set_of(root);
        let resolved_inputs: Vec<SubsetId> = inputs.into_iter().map(|s| self.resolve_subset(s)).collect();
        let digest = digest::compute(&kind, &resolved_inputs, &trait_set);

        if let Some(&existing) = self.digest_index.get(&digest) {
            let existing_subset = self.node_home_subset(existing);
            let existing_set = self.set_of(existing_subset);
            if existing_set != root_set {
                self.merge_sets(root_set, existing_set)?;
                return Ok((self.resolve_subset(existing_subset), false));
            }
            return Ok((existing_subset, false));
        }

        let target_subset = match self.sets[root_set.0]
            .as_ref()
            .expect("leader set present")
            .subset_for(&trait_set)
        {
            Some(existing) => existing,
            None => {
                let created = self.new_subset(root_set, trait_set.clone());
                self.sets[root_set.0]
                    .as_mut()
                    .expect("leader set present")
                    .register_subset(trait_set.clone(), created);
                created
            }
        };

        let node_id = NodeId(self.nodes.len());
        self.nodes.push(AlgebraNode {
            digest: digest.clone(),
            kind,
            trait_set,
            inputs: resolved_inputs.clone(),
            row_type,
        });
        self.node_set.push(root_set);
        self.digest_index.insert(digest, node_id);
        self.subsets[target_subset.0].add_member(node_id);
        self.record_parents(node_id, &resolved_inputs);

        Ok((target_subset, true))
    }

    fn node_home_subset(&self, node: NodeId) -> SubsetId {
        let set_id = self.find_set(self.node_set[node.0]);
        let set = self.sets[set_id.0].as_ref().expect("leader set present");
        let trait_set = &self.nodes[node.0].trait_set;
        set.subset_for(trait_set).expect("node registered under its own trait set")
    }

    /// The (possibly-redirected) subset a given node currently lives in.
    pub fn subset_of_node(&self, node: NodeId) -> SubsetId {
        self.resolve_subset(self.node_home_subset(node))
    }

    /// Every node id ever registered, for initial rule-call seeding.
    pub fn all_node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// `mergeSets(a, b)`: union-find union, re-registering the follower's
    /// subsets (and their members) under the leader (`spec.md` §4.3).
    pub fn merge_sets(&mut self, a: SetId, b: SetId) -> Result<()> {
        let ra = self.find_set(a);
        let rb = self.find_set(b);
        if ra == rb {
            return Ok(());
        }
        let (leader, follower) = self
            .uf
            .union(ra, rb)
            .expect("ra != rb implies union always succeeds");
        let follower_set = match self.sets[follower.0].take() {
            Some(set) => set,
            None => return internal_err!("follower set {} already absorbed", follower.0),
        };

        let aliases = self.sets[leader.0]
            .as_mut()
            .expect("leader set present")
            .absorb(follower_set);

        for (follower_subset, leader_subset) in aliases {
            let follower_members = self.subsets[follower_subset.0].members().to_vec();
            self.subsets[leader_subset.0].absorb_members(&follower_members);
            self.subset_redirect[follower_subset.0] = Some(leader_subset);
        }
        Ok(())
    }

    /// `ancestors(subset)`: nodes whose inputs include any subset of
    /// `subset`'s set, for rule re-triggering.
    pub fn ancestors(&self, subset: SubsetId) -> Vec<NodeId> {
        let set_id = self.set_of(subset);
        self.sets[set_id.0]
            .as_ref()
            .map(|s| s.parents().to_vec())
            .unwrap_or_default()
    }

    /// A sibling subset of `subset`'s own set already manifesting
    /// `trait_set`, if one has been interned.
    pub fn sibling_subset(&self, subset: SubsetId, trait_set: &TraitSet) -> Option<SubsetId> {
        let set_id = self.set_of(subset);
        self.sets[set_id.0].as_ref().and_then(|s| s.subset_for(trait_set))
    }

    /// Every subset registered under `subset`'s set, one per distinct trait
    /// manifestation interned so far — every equivalent physical/logical
    /// form of the same result (`spec.md` §8 scenario 5: conversion may
    /// need to start from any of a set's existing members, not just the
    /// one the caller happened to hand in).
    pub fn subsets_of_set(&self, subset: SubsetId) -> Vec<SubsetId> {
        let set_id = self.set_of(subset);
        self.sets[set_id.0]
            .as_ref()
            .map(|s| s.subsets().map(|(_, &sid)| sid).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trait_def::{none_convention, TraitSet};
    use polystore_common::{DataType, Field, RowType};

    fn row_type() -> RowTypeRef {
        RowType::new(vec![Field {
            name: "a".into(),
            data_type: DataType::Int64 { nullable: false },
        }])
    }

    fn none_trait_set() -> TraitSet {
        TraitSet::new(vec![none_convention()])
    }

    #[test]
    fn intern_dedupes_same_digest() {
        let mut space = Space::new();
        let kind = AlgebraKind::Scan { table: "T".into() };
        let (first, created_first) = space
            .intern_new(kind.clone(), vec![], none_trait_set(), row_type())
            .unwrap();
        let (second, created_second) = space.intern_new(kind, vec![], none_trait_set(), row_type()).unwrap();
        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first, second);
    }

    #[test]
    fn transform_to_merges_on_digest_collision() {
        let mut space = Space::new();
        let scan_a = AlgebraKind::Scan { table: "A".into() };
        let scan_b = AlgebraKind::Scan { table: "B".into() };
        let (n1, _) = space.intern_new(scan_a, vec![], none_trait_set(), row_type()).unwrap();
        let (n2, _) = space.intern_new(scan_b.clone(), vec![], none_trait_set(), row_type()).unwrap();
        assert_ne!(n1, n2);

        // Rewriting n1's set to the same shape as n2's registers under the
        // same digest, so the two independently-registered sets merge.
        let (merged, created) = space
            .transform_to(n1, scan_b, vec![], none_trait_set(), row_type())
            .unwrap();
        assert!(!created);
        assert_eq!(space.set_of(merged), space.set_of(n2));
    }

    #[test]
    fn ancestors_track_parent_nodes() {
        let mut space = Space::new();
        let scan = AlgebraKind::Scan { table: "T".into() };
        let (scan_subset, _) = space.intern_new(scan, vec![], none_trait_set(), row_type()).unwrap();
        let filter = AlgebraKind::Filter {
            condition: polystore_expr::RowExpression::boolean(true),
        };
        let (_, _) = space
            .intern_new(filter, vec![scan_subset], none_trait_set(), row_type())
            .unwrap();
        assert_eq!(space.ancestors(scan_subset).len(), 1);
    }
}
