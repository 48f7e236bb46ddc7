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

//! The rule-call priority queue (`spec.md` §4.4, §9: "a pairing heap or
//! bucketed priority queue suffices; exact ordering beyond importance is
//! insertion order"). Built on `BinaryHeap` since importance comparisons
//! dominate and `f64` needs a total order wrapper to live in one.
//!
//! Re-keying on set merges (`spec.md` §9) is the caller's responsibility:
//! the planner pops a call, recomputes its importance and re-resolves its
//! binding against the current space before deciding whether to execute it
//! or push it back with a fresh importance.

use crate::rule::pattern::Binding;
use crate::space::NodeId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
pub struct RuleCall {
    pub rule_index: usize,
    pub root: NodeId,
    pub binding: Binding,
    pub importance: f64,
    seq: u64,
}

impl PartialEq for RuleCall {
    fn eq(&self, other: &Self) -> bool {
        self.importance == other.importance && self.seq == other.seq
    }
}
impl Eq for RuleCall {}

impl PartialOrd for RuleCall {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuleCall {
    /// Higher importance first; among equal importance, earlier insertion
    /// (lower `seq`) first — `BinaryHeap` is a max-heap, so ties reverse
    /// `seq`'s natural order to make the earliest-inserted call "greatest".
    fn cmp(&self, other: &Self) -> Ordering {
        self.importance
            .partial_cmp(&other.importance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct RuleCallQueue {
    heap: BinaryHeap<RuleCall>,
    next_seq: u64,
}

impl RuleCallQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, rule_index: usize, root: NodeId, binding: Binding, importance: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(RuleCall {
            rule_index,
            root,
            binding,
            importance,
            seq,
        });
    }

    pub fn pop(&mut self) -> Option<RuleCall> {
        self.heap.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_importance_pops_first() {
        let mut q = RuleCallQueue::new();
        q.push(0, NodeId(0), vec![NodeId(0)], 0.2);
        q.push(1, NodeId(1), vec![NodeId(1)], 0.9);
        q.push(2, NodeId(2), vec![NodeId(2)], 0.5);
        assert_eq!(q.pop().unwrap().rule_index, 1);
        assert_eq!(q.pop().unwrap().rule_index, 2);
        assert_eq!(q.pop().unwrap().rule_index, 0);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut q = RuleCallQueue::new();
        q.push(0, NodeId(0), vec![NodeId(0)], 0.5);
        q.push(1, NodeId(1), vec![NodeId(1)], 0.5);
        assert_eq!(q.pop().unwrap().rule_index, 0);
        assert_eq!(q.pop().unwrap().rule_index, 1);
    }
}
