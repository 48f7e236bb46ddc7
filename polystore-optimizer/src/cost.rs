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

//! Additive cost and memoized best-cost computation (`spec.md` §4.5).

use crate::algebra::AlgebraKind;
use crate::space::{NodeId, Space, SubsetId};
use std::cmp::Ordering;
use std::collections::HashSet;

/// `(rowCount, cpu, io)`, compared lexicographically by `rowCount ×
/// (cpuWeight·cpu + ioWeight·io)` under a `CostModelConfig`'s weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub row_count: f64,
    pub cpu: f64,
    pub io: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        row_count: 0.0,
        cpu: 0.0,
        io: 0.0,
    };

    pub fn new(row_count: f64, cpu: f64, io: f64) -> Self {
        Self { row_count, cpu, io }
    }

    pub fn add(&self, other: &Cost) -> Cost {
        Cost {
            row_count: self.row_count + other.row_count,
            cpu: self.cpu + other.cpu,
            io: self.io + other.io,
        }
    }

    fn weighted(&self, config: &CostModelConfig) -> f64 {
        self.row_count * (config.cpu_weight * self.cpu + config.io_weight * self.io)
    }

    pub fn compare(&self, other: &Cost, config: &CostModelConfig) -> Ordering {
        self.weighted(config)
            .partial_cmp(&other.weighted(config))
            .unwrap_or(Ordering::Equal)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CostModelConfig {
    pub cpu_weight: f64,
    pub io_weight: f64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            cpu_weight: 1.0,
            io_weight: 1.0,
        }
    }
}

/// Per-kind local cost (excludes children): the one function-table-keyed
/// operation `spec.md` §9 calls for, for the "cost" axis.
pub fn node_local_cost(kind: &AlgebraKind, input_row_counts: &[f64]) -> Cost {
    let total_input_rows: f64 = input_row_counts.iter().sum();
    match kind {
        AlgebraKind::Scan { .. } => Cost::new(1_000.0, 1.0, 1_000.0),
        AlgebraKind::Filter { .. } => Cost::new(total_input_rows * 0.5, total_input_rows, 0.0),
        AlgebraKind::Project { .. } => Cost::new(total_input_rows, total_input_rows, 0.0),
        AlgebraKind::Join { .. } => {
            let product: f64 = input_row_counts.iter().product();
            Cost::new(product * 0.1, product, 0.0)
        }
        AlgebraKind::Aggregate { .. } => Cost::new(total_input_rows * 0.1, total_input_rows * 2.0, 0.0),
        AlgebraKind::Sort { .. } => {
            let n = total_input_rows.max(1.0);
            Cost::new(total_input_rows, n * n.log2().max(1.0), 0.0)
        }
        AlgebraKind::Union { .. } => Cost::new(total_input_rows, total_input_rows, 0.0),
        AlgebraKind::Values { rows } => Cost::new(rows.len() as f64, rows.len() as f64, 0.0),
        AlgebraKind::Modify { .. } => Cost::new(total_input_rows, total_input_rows, total_input_rows),
        AlgebraKind::Match { .. } => Cost::new(total_input_rows * 2.0, total_input_rows * 4.0, 0.0),
        AlgebraKind::Converter { .. } => Cost::new(total_input_rows, total_input_rows * 0.1, 0.0),
        AlgebraKind::Custom { .. } => Cost::new(total_input_rows, total_input_rows, 0.0),
    }
}

/// `cost(subset)`: the minimum over a subset's members of `nodeCost + sum
/// of cost(childSubset)`, memoized on the `Subset` itself and recomputed
/// push-style from leaves. Cycle-safe: a subset already on `visiting` is
/// treated as having no currently-known cost, mirroring the extractor's
/// already-visited handling for recursive rewrites (`spec.md` §8).
pub fn compute_cost(space: &mut Space, subset: SubsetId, config: &CostModelConfig, visiting: &mut HashSet<SubsetId>) -> Option<Cost> {
    let resolved = space.resolve_subset(subset);
    if let Some((_, cost)) = space.subset(resolved).best() {
        return Some(cost);
    }
    if !visiting.insert(resolved) {
        return None;
    }

    let members = space.subset(resolved).members().to_vec();
    let mut best: Option<(NodeId, Cost)> = None;
    for member in members {
        if let Some(cost) = member_cost(space, member, config, visiting) {
            best = Some(match best {
                Some((best_node, best_cost)) if best_cost.compare(&cost, config) != Ordering::Greater => {
                    (best_node, best_cost)
                }
                _ => (member, cost),
            });
        }
    }

    visiting.remove(&resolved);
    if let Some((node, cost)) = best {
        space.subset_mut(resolved).set_best(node, cost);
        Some(cost)
    } else {
        None
    }
}

fn member_cost(space: &mut Space, node: NodeId, config: &CostModelConfig, visiting: &mut HashSet<SubsetId>) -> Option<Cost> {
    let inputs = space.node(node).inputs.clone();
    let mut child_costs = Vec::with_capacity(inputs.len());
    for input in &inputs {
        child_costs.push(compute_cost(space, *input, config, visiting)?);
    }
    let input_row_counts: Vec<f64> = child_costs.iter().map(|c| c.row_count).collect();
    let local = node_local_cost(&space.node(node).kind, &input_row_counts);
    Some(child_costs.into_iter().fold(local, |acc, c| acc.add(&c)))
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
    fn scan_cost_is_memoized() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let config = CostModelConfig::default();
        let mut visiting = HashSet::new();
        let first = compute_cost(&mut space, scan, &config, &mut visiting).unwrap();
        let second = compute_cost(&mut space, scan, &config, &mut visiting).unwrap();
        assert_eq!(first.row_count, second.row_count);
        assert!(space.subset(scan).best().is_some());
    }

    #[test]
    fn filter_over_scan_adds_child_cost() {
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
        let config = CostModelConfig::default();
        let mut visiting = HashSet::new();
        let scan_cost = compute_cost(&mut space, scan, &config, &mut visiting).unwrap();
        let filter_cost = compute_cost(&mut space, filter_subset, &config, &mut visiting).unwrap();
        assert!(filter_cost.row_count >= scan_cost.row_count * 0.5);
    }
}
