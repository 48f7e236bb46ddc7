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

//! Best-plan extraction (`spec.md` §4.5): walk the goal subset picking the
//! cheapest member and recursing into its input subsets. Cycle-safe: a
//! subset already on the current path is skipped in favor of the
//! next-cheapest member (`spec.md` §8: "must not cause extraction to
//! loop").

use crate::algebra::AlgebraKind;
use crate::cost::{compute_cost, Cost, CostModelConfig};
use crate::space::{NodeId, Space, SubsetId};
use polystore_common::{PolystoreError, Result};
use std::collections::HashSet;

/// A reconstructed physical plan node: operator-specific fields plus
/// already-extracted children, detached from the search space so it can
/// outlive the planner run.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub kind: AlgebraKind,
    pub cost: Cost,
    pub children: Vec<PlanNode>,
}

impl std::fmt::Display for PlanNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_indented(f, 0)
    }
}

impl PlanNode {
    fn write_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(depth), self.kind)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Walks from `goal`, picking the cheapest member of every subset visited
/// and recursing into its inputs. Ties are broken by member insertion
/// order (`spec.md` §4.5) since `Subset::members` is already insertion
/// ordered and `Cost::compare` only orders strictly-cheaper replacements
/// ahead.
pub fn extract(space: &mut Space, goal: SubsetId, config: &CostModelConfig) -> Result<PlanNode> {
    let mut visiting = HashSet::new();
    compute_cost(space, goal, config, &mut visiting);
    let mut path = HashSet::new();
    extract_rec(space, goal, config, &mut path)
}

fn extract_rec(space: &mut Space, subset: SubsetId, config: &CostModelConfig, path: &mut HashSet<SubsetId>) -> Result<PlanNode> {
    let resolved = space.resolve_subset(subset);
    if !path.insert(resolved) {
        return Err(PolystoreError::NoImplementationFound);
    }

    let candidates = best_members_in_order(space, resolved);
    let mut last_err = PolystoreError::NoImplementationFound;
    for node in candidates {
        match extract_node(space, node, config, path) {
            Ok(plan) => {
                path.remove(&resolved);
                return Ok(plan);
            }
            Err(err) => last_err = err,
        }
    }
    path.remove(&resolved);
    Err(last_err)
}

fn extract_node(space: &mut Space, node: NodeId, config: &CostModelConfig, path: &mut HashSet<SubsetId>) -> Result<PlanNode> {
    let (kind, inputs) = {
        let n = space.node(node);
        (n.kind.clone(), n.inputs.clone())
    };
    let mut children = Vec::with_capacity(inputs.len());
    for input in inputs {
        children.push(extract_rec(space, input, config, path)?);
    }
    let input_row_counts: Vec<f64> = children.iter().map(|c| c.cost.row_count).collect();
    let local = crate::cost::node_local_cost(&kind, &input_row_counts);
    let total = children.iter().fold(local, |acc, c| acc.add(&c.cost));
    Ok(PlanNode {
        kind,
        cost: total,
        children,
    })
}

/// The subset's memoized best member first (if any), falling back to the
/// rest of the members in insertion order so a failed extraction (e.g. a
/// cycle through the recorded best) still has somewhere to go.
fn best_members_in_order(space: &Space, subset: SubsetId) -> Vec<NodeId> {
    let members = space.subset(subset).members().to_vec();
    let mut ordered = Vec::with_capacity(members.len());
    if let Some((best_node, _)) = space.subset(subset).best() {
        ordered.push(best_node);
    }
    for member in members {
        if !ordered.contains(&member) {
            ordered.push(member);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn extracts_scan_directly() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let plan = extract(&mut space, scan, &CostModelConfig::default()).unwrap();
        assert!(matches!(plan.kind, AlgebraKind::Scan { .. }));
        assert!(plan.children.is_empty());
    }

    #[test]
    fn extracts_filter_over_scan_with_child() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let filter = AlgebraKind::Filter {
            condition: polystore_expr::RowExpression::boolean(true),
        };
        let (filter_subset, _) = space
            .intern_new(filter, vec![scan], none_trait_set(), row_type())
            .unwrap();
        let plan = extract(&mut space, filter_subset, &CostModelConfig::default()).unwrap();
        assert!(matches!(plan.kind, AlgebraKind::Filter { .. }));
        assert_eq!(plan.children.len(), 1);
    }
}
