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

//! Comparison folding: `x = x`, `x <= x`, `x >= x`, `x < x`, `x > x`,
//! `x <> x`, and literal/literal comparisons (`spec.md` §4.1).

use super::{simplify_value, PredicateContext, Signal, Simplified, UnknownAs};
use crate::expr::RowExpression;
use crate::operator::{Operator, OperatorKind};
use std::cmp::Ordering;

pub(crate) fn simplify_comparison(
    e: &RowExpression,
    mode: UnknownAs,
    ctx: &PredicateContext,
) -> Simplified<RowExpression> {
    let (operator, operands) = match e {
        RowExpression::Call { operator, operands, .. } => (operator.clone(), operands.clone()),
        _ => unreachable!(),
    };
    let left = simplify_value(&operands[0], ctx)?;
    let right = simplify_value(&operands[1], ctx)?;

    if left == right {
        return Ok(reflexive_result(&left, operator.kind, mode));
    }

    if let (RowExpression::Literal(a, _), RowExpression::Literal(b, _)) = (&left, &right) {
        if a.is_null() || b.is_null() {
            return Err(Signal::AlwaysNull);
        }
        if let Some(ordering) = a.compare(b) {
            return Ok(RowExpression::boolean(fold_ordering(operator.kind, ordering)));
        }
    }

    Ok(RowExpression::call(operator, vec![left, right]).map_err(Signal::Error)?)
}

/// `x OP x` for any of the six comparison operators.
fn reflexive_result(x: &RowExpression, kind: OperatorKind, mode: UnknownAs) -> RowExpression {
    let nullable = x.data_type().is_nullable();
    match kind {
        OperatorKind::Eq | OperatorKind::Le | OperatorKind::Ge => {
            if !nullable {
                RowExpression::boolean(true)
            } else {
                match mode {
                    // `x = x` is never false, only NULL-or-true, so under
                    // True mode (NULL passes the filter) it's always true.
                    UnknownAs::True => RowExpression::boolean(true),
                    UnknownAs::False | UnknownAs::Unknown => {
                        RowExpression::is_not_null(x.clone()).expect("IS NOT NULL always typechecks")
                    }
                }
            }
        }
        OperatorKind::Lt | OperatorKind::Gt | OperatorKind::NotEq => {
            if !nullable {
                RowExpression::boolean(false)
            } else {
                match mode {
                    UnknownAs::False => RowExpression::boolean(false),
                    // Never true, only NULL-or-false, so under True mode
                    // (NULL passes) the filter-equivalent form passes
                    // exactly on the null rows.
                    UnknownAs::True => RowExpression::is_null(x.clone()).expect("IS NULL always typechecks"),
                    UnknownAs::Unknown => {
                        // NULL when x is null, FALSE otherwise: expressed
                        // as a CASE so the three-valued shape is explicit.
                        RowExpression::call_with_type(
                            Operator::case(),
                            vec![
                                RowExpression::is_null(x.clone()).unwrap(),
                                RowExpression::null_literal(
                                    x.data_type().with_nullable(true),
                                ),
                                RowExpression::boolean(false),
                            ],
                            polystore_common::DataType::Boolean { nullable: true },
                        )
                        .expect("well-typed CASE")
                    }
                }
            }
        }
        _ => unreachable!("only comparison kinds reach reflexive_result"),
    }
}

fn fold_ordering(kind: OperatorKind, ordering: Ordering) -> bool {
    match kind {
        OperatorKind::Eq => ordering == Ordering::Equal,
        OperatorKind::NotEq => ordering != Ordering::Equal,
        OperatorKind::Lt => ordering == Ordering::Less,
        OperatorKind::Le => ordering != Ordering::Greater,
        OperatorKind::Gt => ordering == Ordering::Greater,
        OperatorKind::Ge => ordering != Ordering::Less,
        _ => unreachable!(),
    }
}

/// `IS [NOT] NULL` / `IS [NOT] TRUE` / `IS [NOT] FALSE`.
pub(crate) fn simplify_null_check(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (kind, operand) = match e {
        RowExpression::Call { operator, operands, .. } => (operator.kind, simplify_value(&operands[0], ctx)?),
        _ => unreachable!(),
    };

    if let RowExpression::Literal(v, _) = &operand {
        let is_null = v.is_null();
        return Ok(RowExpression::boolean(match kind {
            OperatorKind::IsNull => is_null,
            OperatorKind::IsNotNull => !is_null,
            OperatorKind::IsTrue => v.as_bool() == Some(true),
            OperatorKind::IsNotTrue => v.as_bool() != Some(true),
            OperatorKind::IsFalse => v.as_bool() == Some(false),
            OperatorKind::IsNotFalse => v.as_bool() != Some(false),
            _ => unreachable!(),
        }));
    }

    if !operand.data_type().is_nullable() {
        match kind {
            OperatorKind::IsNull => return Ok(RowExpression::boolean(false)),
            OperatorKind::IsNotNull => return Ok(RowExpression::boolean(true)),
            OperatorKind::IsTrue | OperatorKind::IsNotTrue | OperatorKind::IsFalse | OperatorKind::IsNotFalse
                if matches!(operand.data_type(), polystore_common::DataType::Boolean { .. }) =>
            {
                // IS TRUE(x) = x, IS NOT TRUE(x) = NOT x, etc. when x is a
                // non-nullable boolean ("CASE reduces to the condition"
                // family of rewrites, spec.md 4.1).
                return Ok(match kind {
                    OperatorKind::IsTrue => operand,
                    OperatorKind::IsFalse => RowExpression::not(operand).map_err(Signal::Error)?,
                    OperatorKind::IsNotTrue => RowExpression::not(operand).map_err(Signal::Error)?,
                    OperatorKind::IsNotFalse => operand,
                    _ => unreachable!(),
                });
            }
            _ => {}
        }
    }

    let operator = Operator::new(kind, operator_name(kind), true);
    Ok(RowExpression::call(operator, vec![operand]).map_err(Signal::Error)?)
}

fn operator_name(kind: OperatorKind) -> &'static str {
    match kind {
        OperatorKind::IsNull => "IS NULL",
        OperatorKind::IsNotNull => "IS NOT NULL",
        OperatorKind::IsTrue => "IS TRUE",
        OperatorKind::IsNotTrue => "IS NOT TRUE",
        OperatorKind::IsFalse => "IS FALSE",
        OperatorKind::IsNotFalse => "IS NOT FALSE",
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplifier::simplify;
    use polystore_common::DataType;

    fn nullable_ref() -> RowExpression {
        RowExpression::InputRef(0, DataType::Int64 { nullable: true })
    }

    fn not_null_ref() -> RowExpression {
        RowExpression::InputRef(0, DataType::Int64 { nullable: false })
    }

    #[test]
    fn eq_reflexive_nullable_is_not_null() {
        let x = nullable_ref();
        let e = RowExpression::eq(x.clone(), x.clone()).unwrap();
        let unknown = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        let false_mode = simplify(&e, UnknownAs::False, &PredicateContext::new()).unwrap();
        let expected = RowExpression::is_not_null(x).unwrap();
        assert_eq!(unknown, expected);
        assert_eq!(false_mode, expected);
    }

    #[test]
    fn eq_reflexive_non_nullable_is_true() {
        let x = not_null_ref();
        let e = RowExpression::eq(x.clone(), x).unwrap();
        for mode in [UnknownAs::Unknown, UnknownAs::True, UnknownAs::False] {
            let simplified = simplify(&e, mode, &PredicateContext::new()).unwrap();
            assert!(simplified.is_literal_true());
        }
    }

    #[test]
    fn eq_reflexive_nullable_under_true_mode_is_constant_true() {
        // `x = x` is never false, only NULL-or-true; under True mode a NULL
        // row passes the filter, so the rewrite must be the constant `true`,
        // not `IS NOT NULL(x)` (which would wrongly reject null rows).
        let x = nullable_ref();
        let e = RowExpression::eq(x.clone(), x).unwrap();
        let simplified = simplify(&e, UnknownAs::True, &PredicateContext::new()).unwrap();
        assert!(simplified.is_literal_true());
    }

    #[test]
    fn lt_reflexive_nullable_under_true_mode_is_is_null() {
        // `x < x` is never true, only NULL-or-false; under True mode a NULL
        // row passes, so the rewrite must pass exactly on the null rows.
        let x = nullable_ref();
        let e = RowExpression::call(Operator::lt(), vec![x.clone(), x.clone()]).unwrap();
        let simplified = simplify(&e, UnknownAs::True, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, RowExpression::is_null(x).unwrap());
    }

    #[test]
    fn is_null_of_literal_folds() {
        use polystore_common::ScalarValue;
        let lit = RowExpression::literal(ScalarValue::Int64(Some(1)));
        let e = RowExpression::is_null(lit).unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert!(simplified.is_literal_false());

        let null_lit = RowExpression::null_literal(DataType::Int64 { nullable: true });
        let e2 = RowExpression::is_not_null(null_lit).unwrap();
        let simplified2 = simplify(&e2, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert!(simplified2.is_literal_false());
    }
}
