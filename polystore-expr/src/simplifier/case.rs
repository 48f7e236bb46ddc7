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

//! CASE normalization and COALESCE/NULLIF folding (`spec.md` §4.1).
//!
//! A `Call` with operator kind `Case` stores its operands as
//! `[cond_1, result_1, cond_2, result_2, ..., (else_result)]`; an odd total
//! length means the last operand is a trailing `ELSE`.

use super::{is_not_true, simplify_value, PredicateContext, Signal, Simplified, UnknownAs};
use crate::expr::RowExpression;
use crate::operator::{Operator, OperatorKind};
use polystore_common::Result;

struct CaseBranches {
    arms: Vec<(RowExpression, RowExpression)>,
    else_result: Option<RowExpression>,
}

fn split(operands: &[RowExpression]) -> CaseBranches {
    let has_else = operands.len() % 2 == 1;
    let arm_count = operands.len() / 2;
    let mut arms = Vec::with_capacity(arm_count);
    for i in 0..arm_count {
        arms.push((operands[2 * i].clone(), operands[2 * i + 1].clone()));
    }
    let else_result = if has_else {
        Some(operands[operands.len() - 1].clone())
    } else {
        None
    };
    CaseBranches { arms, else_result }
}

fn rebuild(branches: CaseBranches, data_type: &polystore_common::DataType) -> Result<RowExpression> {
    let mut operands = Vec::with_capacity(branches.arms.len() * 2 + 1);
    for (c, r) in branches.arms {
        operands.push(c);
        operands.push(r);
    }
    if let Some(e) = branches.else_result {
        operands.push(e);
    }
    RowExpression::call_with_type(Operator::case(), operands, data_type.clone())
}

pub(crate) fn simplify_case(
    e: &RowExpression,
    mode: UnknownAs,
    ctx: &PredicateContext,
) -> Simplified<RowExpression> {
    let (operands, data_type) = match e {
        RowExpression::Call { operands, data_type, .. } => (operands.clone(), data_type.clone()),
        _ => unreachable!(),
    };
    let CaseBranches { arms, else_result } = split(&operands);

    let mut new_arms = Vec::with_capacity(arms.len());
    for (cond, result) in arms {
        let cond = simplify_value(&cond, ctx)?;
        if is_not_true(&cond, ctx) {
            // Remove branches with always-false (or always-null) conditions.
            continue;
        }
        let result = simplify_value(&result, ctx)?;
        if cond.is_literal_true() && new_arms.is_empty() {
            // The first unconditionally-true branch short-circuits
            // everything after it, including any ELSE.
            let case = CaseBranches {
                arms: vec![],
                else_result: Some(result),
            };
            return finish(case, &data_type, mode);
        }
        new_arms.push((cond, result));
    }
    let else_result = match else_result {
        Some(r) => Some(simplify_value(&r, ctx)?),
        None => None,
    };

    // Collapse adjacent arms whose result expressions are equal into one
    // OR-combined condition.
    let mut collapsed: Vec<(RowExpression, RowExpression)> = Vec::with_capacity(new_arms.len());
    for (cond, result) in new_arms {
        if let Some(last) = collapsed.last_mut() {
            if last.1 == result {
                last.0 = RowExpression::or(vec![last.0.clone(), cond]).map_err(Signal::Error)?;
                continue;
            }
        }
        collapsed.push((cond, result));
    }

    finish(
        CaseBranches {
            arms: collapsed,
            else_result,
        },
        &data_type,
        mode,
    )
}

fn finish(
    branches: CaseBranches,
    data_type: &polystore_common::DataType,
    mode: UnknownAs,
) -> Simplified<RowExpression> {
    match (branches.arms.len(), &branches.else_result) {
        (0, Some(r)) => Ok(r.clone()),
        (0, None) => Err(Signal::AlwaysNull),
        (1, Some(else_result)) => reduce_to_boolean(&branches.arms[0], else_result, data_type, mode)
            .unwrap_or_else(|| rebuild(branches, data_type).map_err(Signal::Error)),
        _ => rebuild(branches, data_type).map_err(Signal::Error),
    }
}

/// `CASE WHEN c THEN true ELSE false END` collapses to a plain boolean
/// condition per `spec.md` §4.1: `c` itself when `c` is non-nullable (even if
/// the CASE's own result type is nullable), otherwise `IS TRUE(c)` when the
/// CASE's result type is non-nullable.
fn reduce_to_boolean(
    arm: &(RowExpression, RowExpression),
    else_result: &RowExpression,
    data_type: &polystore_common::DataType,
    _mode: UnknownAs,
) -> Option<Simplified<RowExpression>> {
    let (cond, then_result) = arm;
    if !matches!(data_type, polystore_common::DataType::Boolean { .. }) {
        return None;
    }
    if then_result.is_literal_true() && else_result.is_literal_false() {
        // Check condition-non-nullability first: when `c` can't be NULL,
        // `CASE WHEN c THEN true ELSE false END` is just `c`, regardless of
        // whether the CASE's own result type happens to be nullable.
        if !cond.data_type().is_nullable() {
            return Some(Ok(cond.clone()));
        }
        if !data_type.is_nullable() {
            return Some(RowExpression::is_true(cond.clone()).map_err(Signal::Error));
        }
    }
    None
}

pub(crate) fn simplify_coalesce(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (operands, data_type) = match e {
        RowExpression::Call { operands, data_type, .. } => (operands.clone(), data_type.clone()),
        _ => unreachable!(),
    };
    let mut kept: Vec<RowExpression> = Vec::with_capacity(operands.len());
    for o in operands {
        let simplified = simplify_value(&o, ctx)?;
        if let RowExpression::Literal(v, _) = &simplified {
            if v.is_null() {
                // Drop provably-null arguments.
                continue;
            }
        }
        let is_duplicate = kept.iter().any(|k| k == &simplified);
        if is_duplicate {
            continue;
        }
        let is_terminal = simplified.as_literal().is_some();
        kept.push(simplified);
        if is_terminal {
            // First provably non-null literal: everything after it is dead.
            break;
        }
    }
    match kept.len() {
        0 => Err(Signal::AlwaysNull),
        1 => Ok(kept.into_iter().next().unwrap()),
        _ => Ok(RowExpression::call_with_type(Operator::coalesce(), kept, data_type).map_err(Signal::Error)?),
    }
}

pub(crate) fn simplify_null_if(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (operands, data_type) = match e {
        RowExpression::Call { operands, data_type, .. } => (operands.clone(), data_type.clone()),
        _ => unreachable!(),
    };
    let left = simplify_value(&operands[0], ctx)?;
    let right = simplify_value(&operands[1], ctx)?;
    if left == right {
        return Err(Signal::AlwaysNull);
    }
    Ok(RowExpression::call_with_type(Operator::null_if(), vec![left, right], data_type).map_err(Signal::Error)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplifier::simplify;
    use polystore_common::{DataType, ScalarValue};

    fn build_case(
        arms: Vec<(RowExpression, RowExpression)>,
        else_result: Option<RowExpression>,
        data_type: DataType,
    ) -> RowExpression {
        let mut operands = vec![];
        for (c, r) in arms {
            operands.push(c);
            operands.push(r);
        }
        if let Some(e) = else_result {
            operands.push(e);
        }
        RowExpression::call_with_type(Operator::case(), operands, data_type).unwrap()
    }

    #[test]
    fn case_reduces_to_is_true_when_result_nullable() {
        let c = RowExpression::InputRef(0, DataType::Boolean { nullable: true });
        let e = build_case(
            vec![(c.clone(), RowExpression::boolean(true))],
            Some(RowExpression::boolean(false)),
            DataType::Boolean { nullable: true },
        );
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, RowExpression::is_true(c).unwrap());
    }

    #[test]
    fn case_reduces_to_condition_when_condition_not_nullable() {
        let c = RowExpression::InputRef(0, DataType::Boolean { nullable: false });
        let e = build_case(
            vec![(c.clone(), RowExpression::boolean(true))],
            Some(RowExpression::boolean(false)),
            DataType::Boolean { nullable: false },
        );
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, c);
    }

    #[test]
    fn case_removes_always_false_branch() {
        let c1 = RowExpression::boolean(false);
        let c2 = RowExpression::InputRef(0, DataType::Boolean { nullable: false });
        let e = build_case(
            vec![
                (c1, RowExpression::literal(ScalarValue::Int64(Some(1)))),
                (c2.clone(), RowExpression::literal(ScalarValue::Int64(Some(2)))),
            ],
            Some(RowExpression::literal(ScalarValue::Int64(Some(3)))),
            DataType::Int64 { nullable: false },
        );
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        match simplified {
            RowExpression::Call { operands, .. } => assert_eq!(operands.len(), 3),
            _ => panic!("expected a reduced CASE"),
        }
    }

    #[test]
    fn coalesce_drops_null_and_stops_at_literal() {
        let e = RowExpression::call_with_type(
            Operator::coalesce(),
            vec![
                RowExpression::null_literal(DataType::Int64 { nullable: true }),
                RowExpression::InputRef(0, DataType::Int64 { nullable: true }),
                RowExpression::literal(ScalarValue::Int64(Some(5))),
                RowExpression::InputRef(1, DataType::Int64 { nullable: true }),
            ],
            DataType::Int64 { nullable: true },
        )
        .unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        match simplified {
            RowExpression::Call { operands, .. } => assert_eq!(operands.len(), 2),
            _ => panic!("expected a trimmed COALESCE"),
        }
    }

    #[test]
    fn null_if_equal_operands_is_always_null() {
        let x = RowExpression::InputRef(0, DataType::Int64 { nullable: false });
        let e = RowExpression::call_with_type(
            Operator::null_if(),
            vec![x.clone(), x],
            DataType::Int64 { nullable: true },
        )
        .unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert!(simplified.as_literal().map(|v| v.is_null()).unwrap_or(false));
    }
}
