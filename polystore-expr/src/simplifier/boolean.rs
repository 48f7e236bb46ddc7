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

//! Boolean algebra: duplicate elimination, absorption, de Morgan's law,
//! double-negation, constant folding, and CNF/DNF conversion
//! (`spec.md` §4.1).

use super::{simplify_rec, simplify_value, PredicateContext, Signal, Simplified, UnknownAs};
use crate::expr::RowExpression;
use crate::operator::OperatorKind;
use itertools::Itertools;
use polystore_common::Result;

fn flatten(kind: OperatorKind, exprs: Vec<RowExpression>) -> Vec<RowExpression> {
    let mut out = Vec::with_capacity(exprs.len());
    for e in exprs {
        match &e {
            RowExpression::Call { operator, operands, .. } if operator.kind == kind => {
                out.extend(flatten(kind, operands.clone()));
            }
            _ => out.push(e),
        }
    }
    out
}

/// `x AND NOT x` detection: returns the operand `x` that is directly
/// negated by another operand in the list, if any.
fn find_contradiction(operands: &[RowExpression]) -> Option<RowExpression> {
    for a in operands {
        for b in operands {
            if let RowExpression::Call { operator, operands: not_operands, .. } = b {
                if operator.kind == OperatorKind::Not && not_operands.first() == Some(a) {
                    return Some(a.clone());
                }
            }
        }
    }
    None
}

/// `x OR NOT x` detection, the disjunctive dual of [`find_contradiction`].
fn find_tautology(operands: &[RowExpression]) -> Option<RowExpression> {
    find_contradiction(operands)
}

/// `x AND (x OR y) = x`: drop any OR-operand that already contains one of
/// the AND's other (non-OR) operands as a disjunct.
fn absorb_and(operands: Vec<RowExpression>) -> Vec<RowExpression> {
    let plain: Vec<&RowExpression> = operands
        .iter()
        .filter(|e| !matches!(e.kind(), Some(OperatorKind::Or)))
        .collect();
    operands
        .iter()
        .filter(|e| match e.kind() {
            Some(OperatorKind::Or) => {
                !e.operands().iter().any(|d| plain.iter().any(|p| *p == d))
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// `x OR (x AND y) = x`, the dual of [`absorb_and`].
fn absorb_or(operands: Vec<RowExpression>) -> Vec<RowExpression> {
    let plain: Vec<&RowExpression> = operands
        .iter()
        .filter(|e| !matches!(e.kind(), Some(OperatorKind::And)))
        .collect();
    operands
        .iter()
        .filter(|e| match e.kind() {
            Some(OperatorKind::And) => {
                !e.operands().iter().any(|d| plain.iter().any(|p| *p == d))
            }
            _ => true,
        })
        .cloned()
        .collect()
}

pub(crate) fn simplify_and(
    e: &RowExpression,
    mode: UnknownAs,
    ctx: &PredicateContext,
) -> Simplified<RowExpression> {
    let operands = e.operands();
    let simplified: Vec<RowExpression> = operands
        .iter()
        .map(|o| simplify_rec(o, mode, ctx))
        .collect::<Simplified<Vec<_>>>()?;
    let flattened = flatten(OperatorKind::And, simplified);

    if flattened.iter().any(|o| o.is_literal_false()) {
        return Ok(RowExpression::boolean(false));
    }
    if let Some(x) = find_contradiction(&flattened) {
        return Ok(resolve_contradiction(&x, mode));
    }

    let mut deduped: Vec<RowExpression> = flattened
        .into_iter()
        .filter(|o| !o.is_literal_true())
        .unique()
        .collect();
    deduped = absorb_and(deduped);

    match deduped.len() {
        0 => Ok(RowExpression::boolean(true)),
        1 => Ok(deduped.into_iter().next().unwrap()),
        _ => Ok(RowExpression::and(deduped).map_err(Signal::Error)?),
    }
}

pub(crate) fn simplify_or(
    e: &RowExpression,
    mode: UnknownAs,
    ctx: &PredicateContext,
) -> Simplified<RowExpression> {
    let operands = e.operands();
    let simplified: Vec<RowExpression> = operands
        .iter()
        .map(|o| simplify_rec(o, mode, ctx))
        .collect::<Simplified<Vec<_>>>()?;
    let flattened = flatten(OperatorKind::Or, simplified);

    if flattened.iter().any(|o| o.is_literal_true()) {
        return Ok(RowExpression::boolean(true));
    }
    if find_tautology(&flattened).is_some() {
        return Ok(RowExpression::boolean(true));
    }

    let mut deduped: Vec<RowExpression> = flattened
        .into_iter()
        .filter(|o| !o.is_literal_false())
        .unique()
        .collect();
    deduped = absorb_or(deduped);

    match deduped.len() {
        0 => Ok(RowExpression::boolean(false)),
        1 => Ok(deduped.into_iter().next().unwrap()),
        _ => Ok(RowExpression::or(deduped).map_err(Signal::Error)?),
    }
}

fn resolve_contradiction(x: &RowExpression, mode: UnknownAs) -> RowExpression {
    // `x AND NOT x`: FALSE when x is known not-null, NULL (UNKNOWN mode) or
    // FALSE (FALSE mode) otherwise, per spec.md 4.1.
    if !x.data_type().is_nullable() {
        return RowExpression::boolean(false);
    }
    match mode {
        UnknownAs::False => RowExpression::boolean(false),
        // Under True mode a NULL row passes the filter, and `x AND NOT x` is
        // NULL exactly when `x` is null (and FALSE otherwise), so the
        // filter-equivalent rewrite is "pass iff x is null", not a constant.
        UnknownAs::True => RowExpression::is_null(x.clone()).expect("IS NULL always typechecks"),
        UnknownAs::Unknown => {
            let is_null = RowExpression::is_null(x.clone()).expect("IS NULL always typechecks");
            RowExpression::and(vec![RowExpression::null_literal(x.data_type().clone()), is_null])
                .unwrap_or_else(|_| RowExpression::null_literal(x.data_type().with_nullable(true)))
        }
    }
}

pub(crate) fn simplify_not(
    e: &RowExpression,
    mode: UnknownAs,
    ctx: &PredicateContext,
) -> Simplified<RowExpression> {
    let inverted_mode = match mode {
        UnknownAs::True => UnknownAs::False,
        UnknownAs::False => UnknownAs::True,
        UnknownAs::Unknown => UnknownAs::Unknown,
    };
    let inner = simplify_rec(&e.operands()[0], inverted_mode, ctx)?;
    match &inner {
        RowExpression::Literal(v, _) => match v.as_bool() {
            Some(b) => Ok(RowExpression::boolean(!b)),
            None => Err(Signal::AlwaysNull),
        },
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::Not => {
            Ok(operands[0].clone())
        }
        _ => Ok(RowExpression::not(inner).map_err(Signal::Error)?),
    }
}

/// `pullFactors`: lift a factor shared by every disjunct of an `OR` out as
/// `factor AND (rest1 OR rest2 OR ...)`, without otherwise normalizing the
/// expression. Shallow: operates one `OR` level at a time.
pub fn pull_factors(e: &RowExpression) -> RowExpression {
    match e {
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::Or => {
            let disjuncts: Vec<Vec<RowExpression>> = operands
                .iter()
                .map(|d| match d {
                    RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::And => {
                        operands.clone()
                    }
                    other => vec![other.clone()],
                })
                .collect();
            let common: Vec<RowExpression> = disjuncts[0]
                .iter()
                .filter(|f| disjuncts[1..].iter().all(|d| d.contains(f)))
                .cloned()
                .collect();
            if common.is_empty() {
                return e.clone();
            }
            let remainders: Vec<RowExpression> = disjuncts
                .into_iter()
                .map(|mut d| {
                    d.retain(|f| !common.contains(f));
                    if d.is_empty() {
                        RowExpression::boolean(true)
                    } else if d.len() == 1 {
                        d.into_iter().next().unwrap()
                    } else {
                        RowExpression::and(d).expect("well-typed boolean operands")
                    }
                })
                .collect();
            let mut factors = common;
            if let Ok(rest) = RowExpression::or(remainders) {
                if !rest.is_literal_true() {
                    factors.push(rest);
                }
            }
            RowExpression::and(factors).unwrap_or_else(|_| e.clone())
        }
        _ => e.clone(),
    }
}

/// Expand `e` into conjunctive normal form, failing soft (returning `e`
/// unchanged) if the expanded clause count would exceed
/// `max_factor * disjunct_count(e)` (`spec.md` §4.1, tested by §8 scenario 2).
/// Scaled off the pre-expansion disjunct count rather than total AST node
/// count, since that's what actually bounds how large the cartesian product
/// can blow up to.
pub fn to_cnf(e: &RowExpression, max_factor: usize) -> RowExpression {
    let disjunction_of_conjunctions = collect_or_of_and(e);
    let original_factors = disjunction_of_conjunctions.len();
    let clauses = cartesian_clauses(&disjunction_of_conjunctions);
    if clauses.len() > max_factor.saturating_mul(original_factors.max(1)) {
        log::trace!(
            "to_cnf: bailing out, {} clauses would exceed bound {} * {}",
            clauses.len(),
            max_factor,
            original_factors
        );
        return e.clone();
    }
    let conjuncts: Vec<RowExpression> = clauses
        .into_iter()
        .map(|clause| {
            if clause.len() == 1 {
                clause.into_iter().next().unwrap()
            } else {
                RowExpression::or(clause).expect("well-typed boolean operands")
            }
        })
        .collect();
    if conjuncts.len() == 1 {
        conjuncts.into_iter().next().unwrap()
    } else {
        RowExpression::and(conjuncts).unwrap_or_else(|_| e.clone())
    }
}

/// Normalize `e` (already assumed OR-of-AND structure, i.e. DNF) into the
/// list of conjunctive terms feeding the CNF cross-product.
fn collect_or_of_and(e: &RowExpression) -> Vec<Vec<RowExpression>> {
    match e {
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::Or => {
            operands.iter().flat_map(collect_or_of_and).collect()
        }
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::And => {
            vec![operands.clone()]
        }
        other => vec![vec![other.clone()]],
    }
}

/// Cartesian product across disjuncts' conjunctive terms, producing the
/// list of CNF clauses (one literal choice per disjunct).
fn cartesian_clauses(terms: &[Vec<RowExpression>]) -> Vec<Vec<RowExpression>> {
    terms.iter().fold(vec![vec![]], |acc, term| {
        acc.into_iter()
            .cartesian_product(term.iter().cloned())
            .map(|(mut clause, literal)| {
                clause.push(literal);
                clause
            })
            .collect()
    })
}

/// Apply de Morgan's law to push a `NOT` one level inward: `NOT(A AND B) =
/// NOT A OR NOT B`, `NOT(A OR B) = NOT A AND NOT B`.
pub fn push_not_inward(operand: &RowExpression) -> Result<RowExpression> {
    match operand {
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::And => {
            let negated: Vec<RowExpression> = operands
                .iter()
                .map(|o| RowExpression::not(o.clone()))
                .collect::<Result<_>>()?;
            RowExpression::or(negated)
        }
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::Or => {
            let negated: Vec<RowExpression> = operands
                .iter()
                .map(|o| RowExpression::not(o.clone()))
                .collect::<Result<_>>()?;
            RowExpression::and(negated)
        }
        RowExpression::Call { operator, operands, .. } if operator.kind == OperatorKind::Not => {
            Ok(operands[0].clone())
        }
        other => RowExpression::not(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplifier::simplify;
    use polystore_common::{DataType, ScalarValue};

    fn bool_ref(i: usize) -> RowExpression {
        RowExpression::InputRef(i, DataType::Boolean { nullable: false })
    }

    #[test]
    fn duplicate_elimination() {
        let a = bool_ref(0);
        let e = RowExpression::and(vec![a.clone(), a.clone()]).unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, a);
    }

    #[test]
    fn absorption_and_over_or() {
        let x = bool_ref(0);
        let y = bool_ref(1);
        let or_xy = RowExpression::or(vec![x.clone(), y]).unwrap();
        let e = RowExpression::and(vec![x.clone(), or_xy]).unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, x);
    }

    #[test]
    fn contradiction_non_nullable_is_false() {
        let x = bool_ref(0);
        let not_x = RowExpression::not(x.clone()).unwrap();
        let e = RowExpression::and(vec![x, not_x]).unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert!(simplified.is_literal_false());
    }

    #[test]
    fn contradiction_nullable_under_true_mode_is_is_null() {
        // `x AND NOT x` is never true, only NULL-or-false; under True mode a
        // NULL row passes the filter, so the rewrite must pass exactly on
        // the null rows rather than collapsing to a mode-independent
        // constant.
        let x = RowExpression::InputRef(0, DataType::Boolean { nullable: true });
        let not_x = RowExpression::not(x.clone()).unwrap();
        let e = RowExpression::and(vec![x.clone(), not_x]).unwrap();
        let simplified = simplify(&e, UnknownAs::True, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, RowExpression::is_null(x).unwrap());
    }

    #[test]
    fn to_cnf_bound_rejects_expansion() {
        let a1 = bool_ref(0);
        let b1 = bool_ref(1);
        let a2 = RowExpression::InputRef(2, DataType::Boolean { nullable: false });
        let b2 = RowExpression::InputRef(3, DataType::Boolean { nullable: false });
        let a3 = RowExpression::InputRef(4, DataType::Boolean { nullable: false });
        let b3 = RowExpression::InputRef(5, DataType::Boolean { nullable: false });
        let term = |a: RowExpression, b: RowExpression| RowExpression::and(vec![a, b]).unwrap();
        let e = RowExpression::or(vec![term(a1, b1), term(a2, b2), term(a3, b3)]).unwrap();

        let unchanged = to_cnf(&e, 2);
        assert_eq!(unchanged, e);

        let expanded = to_cnf(&e, 16);
        assert!(matches!(expanded.kind(), Some(OperatorKind::And)));
        assert_eq!(expanded.operands().len(), 8);
    }

    #[test]
    fn literal_const_fold_in_and() {
        let t = RowExpression::literal(ScalarValue::Boolean(Some(true)));
        let x = bool_ref(0);
        let e = RowExpression::and(vec![t, x.clone()]).unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, x);
    }
}
