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

//! Standard path-compressed disjoint-set over `SetId` (`spec.md` §9:
//! "Union-find on sets"). Followers rewrite their references lazily on
//! next `find`; a set merge does not eagerly walk every referencing node.

use super::SetId;

#[derive(Debug, Default)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self { parent: Vec::new() }
    }

    /// Registers a freshly created set as its own leader.
    pub fn push(&mut self) -> SetId {
        let id = self.parent.len();
        self.parent.push(id);
        SetId(id)
    }

    /// Resolves `id` to its current leader without compressing the path;
    /// for read-only callers that cannot take `&mut self`.
    pub fn find_ro(&self, id: SetId) -> SetId {
        let mut root = id.0;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        SetId(root)
    }

    /// Resolves `id` to its current leader, compressing the path.
    pub fn find(&mut self, id: SetId) -> SetId {
        let mut root = id.0;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = id.0;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        SetId(root)
    }

    /// Unions `a` and `b`, always keeping the lower-numbered id as leader
    /// so that the "canonical id" `spec.md` §3 describes is stable and
    /// independent of merge order. Returns `(leader, follower)`, or `None`
    /// if the two already share a leader.
    pub fn union(&mut self, a: SetId, b: SetId) -> Option<(SetId, SetId)> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return None;
        }
        let (leader, follower) = if ra.0 < rb.0 { (ra, rb) } else { (rb, ra) };
        self.parent[follower.0] = leader.0;
        Some((leader, follower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_lower_id_as_leader() {
        let mut uf = UnionFind::new();
        let a = uf.push();
        let b = uf.push();
        let (leader, follower) = uf.union(b, a).unwrap();
        assert_eq!(leader, a);
        assert_eq!(follower, b);
        assert_eq!(uf.find(b), a);
    }

    #[test]
    fn union_of_already_merged_is_none() {
        let mut uf = UnionFind::new();
        let a = uf.push();
        let b = uf.push();
        uf.union(a, b);
        assert!(uf.union(a, b).is_none());
    }

    #[test]
    fn path_compression_chains_resolve() {
        let mut uf = UnionFind::new();
        let a = uf.push();
        let b = uf.push();
        let c = uf.push();
        uf.union(a, b);
        uf.union(b, c);
        assert_eq!(uf.find(c), a);
    }
}
