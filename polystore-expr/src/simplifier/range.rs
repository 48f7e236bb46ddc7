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

//! Range reasoning: collect per-variable interval constraints from a
//! conjunction, reject conjunctions whose intervals are empty, drop
//! dominated constraints (`spec.md` §4.1).
//!
//! Scoped to the one variable shape the rest of the simplifier produces
//! literal comparisons against: a bare `InputRef`/`LocalRef` compared to an
//! `Int64` literal. Adapters needing wider coverage extend this at the
//! `Bound` level, not by changing the conjunction-walking algorithm.

use crate::expr::RowExpression;
use crate::operator::OperatorKind;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

/// A half-open-aware interval over `i64`: `lower`/`upper` are inclusive
/// bounds, `None` meaning unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
}

impl Interval {
    pub fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) => l > u,
            _ => false,
        }
    }

    /// Intersect two constraints on the same variable, keeping the
    /// tighter bound on each side (dropping the dominated, looser one).
    pub fn intersect(&self, other: &Interval) -> Interval {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Interval { lower, upper }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.lower.map(|v| v.to_string()).unwrap_or_else(|| "-inf".into()),
            self.upper.map(|v| v.to_string()).unwrap_or_else(|| "+inf".into())
        )
    }
}

/// Variable identity for interval collection: the conjunction-walking
/// algorithm only recognizes bare `InputRef`/`LocalRef` variables, not
/// arbitrary sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VarId {
    Input(usize),
    Local(usize),
}

fn var_id(e: &RowExpression) -> Option<VarId> {
    match e {
        RowExpression::InputRef(i, _) => Some(VarId::Input(*i)),
        RowExpression::LocalRef(i, _) => Some(VarId::Local(*i)),
        _ => None,
    }
}

fn as_i64(e: &RowExpression) -> Option<i64> {
    match e.as_literal()? {
        polystore_common::ScalarValue::Int64(Some(v)) => Some(*v),
        polystore_common::ScalarValue::Int32(Some(v)) => Some(*v as i64),
        _ => None,
    }
}

fn constraint_from_comparison(e: &RowExpression) -> Option<(VarId, Interval)> {
    let (kind, operands) = match e {
        RowExpression::Call { operator, operands, .. } if operator.kind.is_comparison() => {
            (operator.kind, operands)
        }
        _ => return None,
    };
    if let (Some(var), Some(lit)) = (var_id(&operands[0]), as_i64(&operands[1])) {
        return Some((var, interval_for(kind, lit)));
    }
    if let (Some(lit), Some(var)) = (as_i64(&operands[0]), var_id(&operands[1])) {
        return Some((var, interval_for(flip(kind), lit)));
    }
    None
}

fn flip(kind: OperatorKind) -> OperatorKind {
    match kind {
        OperatorKind::Lt => OperatorKind::Gt,
        OperatorKind::Le => OperatorKind::Ge,
        OperatorKind::Gt => OperatorKind::Lt,
        OperatorKind::Ge => OperatorKind::Le,
        other => other,
    }
}

fn interval_for(kind: OperatorKind, value: i64) -> Interval {
    match kind {
        OperatorKind::Eq => Interval {
            lower: Some(value),
            upper: Some(value),
        },
        OperatorKind::Lt => Interval {
            lower: None,
            upper: Some(value - 1),
        },
        OperatorKind::Le => Interval {
            lower: None,
            upper: Some(value),
        },
        OperatorKind::Gt => Interval {
            lower: Some(value + 1),
            upper: None,
        },
        OperatorKind::Ge => Interval {
            lower: Some(value),
            upper: None,
        },
        _ => Interval::unbounded(),
    }
}

/// Collect per-variable interval constraints out of the conjuncts of `e`
/// (which need not itself be an `AND`: a single comparison is a
/// one-conjunct conjunction). Returns `None` if the combined intervals are
/// empty, i.e. the conjunction is unsatisfiable.
pub fn collect_intervals(e: &RowExpression) -> Option<HashMap<String, Interval>> {
    let conjuncts = split_conjunction(e);
    let mut by_var: HashMap<VarId, Interval> = HashMap::new();
    for c in &conjuncts {
        if let Some((var, interval)) = constraint_from_comparison(c) {
            let merged = by_var
                .get(&var)
                .map(|existing| existing.intersect(&interval))
                .unwrap_or(interval);
            if merged.is_empty() {
                return None;
            }
            by_var.insert(var, merged);
        }
    }
    Some(
        by_var
            .into_iter()
            .map(|(k, v)| (format!("{k:?}"), v))
            .collect(),
    )
}

fn split_conjunction(e: &RowExpression) -> Vec<RowExpression> {
    match e {
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::And => {
            operands.iter().flat_map(split_conjunction).collect()
        }
        other => vec![other.clone()],
    }
}

/// Whether the conjuncts of `e`, combined with an already-known
/// `PredicateContext`'s facts, have a non-empty satisfying interval for
/// every variable — i.e. whether the conjunction is not a contradiction
/// purely on range grounds.
pub fn is_satisfiable(e: &RowExpression, context_facts: &[RowExpression]) -> bool {
    let mut conjuncts = split_conjunction(e);
    conjuncts.extend(context_facts.iter().cloned());
    let combined = match conjuncts.len() {
        0 => return true,
        1 => conjuncts.into_iter().next().unwrap(),
        _ => RowExpression::and(conjuncts).expect("well-typed boolean operands"),
    };
    collect_intervals(&combined).is_some()
}

/// Drop dominated constraints: given an already-merged interval table,
/// return the constraints as a sorted, deduplicated list of
/// `(variable, interval)` pairs, suitable for rebuilding a simplified
/// conjunction.
pub fn dominant_constraints(intervals: &HashMap<String, Interval>) -> Vec<(String, Interval)> {
    intervals
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::RowExpression;
    use polystore_common::{DataType, ScalarValue};

    fn int_ref(i: usize) -> RowExpression {
        RowExpression::InputRef(i, DataType::Int64 { nullable: false })
    }

    fn lit(v: i64) -> RowExpression {
        RowExpression::literal(ScalarValue::Int64(Some(v)))
    }

    #[test]
    fn empty_interval_detected() {
        let gt_5 = RowExpression::call(crate::operator::Operator::gt(), vec![int_ref(0), lit(5)]).unwrap();
        let lt_3 = RowExpression::call(crate::operator::Operator::lt(), vec![int_ref(0), lit(3)]).unwrap();
        let e = RowExpression::and(vec![gt_5, lt_3]).unwrap();
        assert!(collect_intervals(&e).is_none());
    }

    #[test]
    fn dominated_constraint_is_tightened() {
        let ge_0 = RowExpression::call(crate::operator::Operator::ge(), vec![int_ref(0), lit(0)]).unwrap();
        let ge_10 = RowExpression::call(crate::operator::Operator::ge(), vec![int_ref(0), lit(10)]).unwrap();
        let e = RowExpression::and(vec![ge_0, ge_10]).unwrap();
        let intervals = collect_intervals(&e).unwrap();
        let (_, interval) = intervals.into_iter().next().unwrap();
        assert_eq!(interval.lower, Some(10));
    }
}
