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

//! `Subset`: a `Set` narrowed to exactly one `TraitSet` (`spec.md` §3).

use super::{NodeId, SetId, SubsetId};
use crate::cost::Cost;
use crate::trait_def::TraitSet;

#[derive(Debug)]
pub struct Subset {
    pub id: SubsetId,
    pub set_id: SetId,
    pub trait_set: TraitSet,
    members: Vec<NodeId>,
    best: Option<(NodeId, Cost)>,
    importance: f64,
}

impl Subset {
    pub fn new(id: SubsetId, set_id: SetId, trait_set: TraitSet) -> Self {
        Self {
            id,
            set_id,
            trait_set,
            members: Vec::new(),
            best: None,
            importance: 0.0,
        }
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn add_member(&mut self, node: NodeId) {
        if !self.members.contains(&node) {
            self.members.push(node);
            // Adding a member may improve the best cost; the planner
            // recomputes it lazily on next `best()` access (`spec.md` §4.5:
            // "invalidated on: (a) new member added").
            self.best = None;
        }
    }

    /// Copies every member of a subset being merged away into this one, used
    /// when a set merge redirects a follower subset onto its leader.
    pub fn absorb_members(&mut self, members: &[NodeId]) {
        for &m in members {
            self.add_member(m);
        }
    }

    pub fn best(&self) -> Option<(NodeId, Cost)> {
        self.best.clone()
    }

    pub fn set_best(&mut self, node: NodeId, cost: Cost) {
        self.best = Some((node, cost));
    }

    pub fn invalidate_cost(&mut self) {
        self.best = None;
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// A subset's importance is the `max` over its parents' contributions
    /// (`spec.md` §4.4); callers fold in each parent's contribution as it's
    /// discovered rather than recomputing from scratch.
    pub fn bump_importance(&mut self, candidate: f64) {
        if candidate > self.importance {
            self.importance = candidate;
        }
    }
}
