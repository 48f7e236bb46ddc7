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

//! `Set`: an equivalence class of algebra nodes known to produce identical
//! results, narrowed per trait manifestation into `Subset`s (`spec.md` §3).

use super::{NodeId, SetId, SubsetId};
use crate::trait_def::TraitSet;
use hashbrown::HashMap;
use polystore_common::RowTypeRef;

#[derive(Debug)]
pub struct Set {
    pub id: SetId,
    pub row_type: RowTypeRef,
    subsets: HashMap<TraitSet, SubsetId>,
    /// Back-pointers to nodes whose inputs include any subset of this set,
    /// so a rewrite of this set can re-trigger their patterns (`spec.md`
    /// §3: "back-pointers to parent nodes").
    parents: Vec<NodeId>,
}

impl Set {
    pub fn new(id: SetId, row_type: RowTypeRef) -> Self {
        Self {
            id,
            row_type,
            subsets: HashMap::new(),
            parents: Vec::new(),
        }
    }

    pub fn subset_for(&self, trait_set: &TraitSet) -> Option<SubsetId> {
        self.subsets.get(trait_set).copied()
    }

    pub fn register_subset(&mut self, trait_set: TraitSet, subset: SubsetId) {
        self.subsets.insert(trait_set, subset);
    }

    pub fn subsets(&self) -> impl Iterator<Item = (&TraitSet, &SubsetId)> {
        self.subsets.iter()
    }

    pub fn add_parent(&mut self, node: NodeId) {
        if !self.parents.contains(&node) {
            self.parents.push(node);
        }
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Absorb a follower set's subsets and parents into this (leader) set,
    /// merging member lists where both sides already have a subset for the
    /// same trait set. Returns the follower subsets that were merged into
    /// an existing leader subset, paired with the leader subset they now
    /// alias to, so the caller can redirect any outstanding references.
    pub fn absorb(&mut self, mut follower: Set) -> Vec<(SubsetId, SubsetId)> {
        let mut aliases = Vec::new();
        for (trait_set, follower_subset) in follower.subsets.drain() {
            match self.subsets.get(&trait_set) {
                Some(leader_subset) => aliases.push((follower_subset, *leader_subset)),
                None => {
                    self.subsets.insert(trait_set, follower_subset);
                }
            }
        }
        for parent in follower.parents {
            self.add_parent(parent);
        }
        aliases
    }
}
