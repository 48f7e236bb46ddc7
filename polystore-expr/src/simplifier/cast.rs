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

//! Cast elimination: no-op casts, nested casts to the same target,
//! constant folding through a cast, and `isLosslessCast` (`spec.md` §4.1).

use super::{simplify_value, PredicateContext, Signal, Simplified};
use crate::expr::RowExpression;
use crate::operator::{Operator, OperatorKind};
use polystore_common::{DataType, ScalarValue};

pub(crate) fn simplify_cast(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (operands, target) = match e {
        RowExpression::Call { operands, data_type, .. } => (operands.clone(), data_type.clone()),
        _ => unreachable!(),
    };
    let inner = simplify_value(&operands[0], ctx)?;

    // cast(x, T) where x already has type T: no-op.
    if inner.data_type() == &target {
        return Ok(inner);
    }

    // cast(cast(x, S), T) = cast(x, T), regardless of S, since the
    // original inner cast's effect is entirely superseded by the outer one.
    if let RowExpression::Call { operator, operands: inner_operands, .. } = &inner {
        if operator.kind == OperatorKind::Cast {
            return Ok(RowExpression::call_with_type(
                Operator::cast(target.clone()).op,
                vec![inner_operands[0].clone()],
                target,
            )
            .map_err(Signal::Error)?);
        }
    }

    if let RowExpression::Literal(value, _) = &inner {
        if value.is_null() {
            return Err(Signal::AlwaysNull);
        }
        if let Some(folded) = fold_literal_cast(value, &target) {
            return Ok(RowExpression::Literal(folded, target));
        }
    }

    Ok(RowExpression::call_with_type(
        Operator::cast(target.clone()).op,
        vec![inner],
        target,
    )
    .map_err(Signal::Error)?)
}

fn fold_literal_cast(value: &ScalarValue, target: &DataType) -> Option<ScalarValue> {
    match (value, target) {
        (ScalarValue::Int32(Some(v)), DataType::Int64 { .. }) => Some(ScalarValue::Int64(Some(*v as i64))),
        (ScalarValue::Int32(Some(v)), DataType::Float64 { .. }) => {
            Some(ScalarValue::Float64(Some(*v as f64)))
        }
        (ScalarValue::Int64(Some(v)), DataType::Float64 { .. }) => {
            Some(ScalarValue::Float64(Some(*v as f64)))
        }
        (ScalarValue::Int64(Some(v)), DataType::Int32 { .. }) => {
            i32::try_from(*v).ok().map(|v| ScalarValue::Int32(Some(v)))
        }
        _ => None,
    }
}

/// `isLosslessCast`: widening numeric casts, and char-precision casts that
/// never truncate (modeled here as `Utf8 -> Utf8`, since this crate does
/// not carry a fixed-length char type).
pub fn is_lossless_cast(from: &DataType, to: &DataType) -> bool {
    match (from.numeric_rank(), to.numeric_rank()) {
        (Some(a), Some(b)) => a <= b,
        _ => matches!((from, to), (DataType::Utf8 { .. }, DataType::Utf8 { .. })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplifier::{simplify, UnknownAs};

    #[test]
    fn no_op_cast_removed() {
        let x = RowExpression::InputRef(0, DataType::Int64 { nullable: false });
        let e = RowExpression::call_with_type(
            Operator::cast(DataType::Int64 { nullable: false }).op,
            vec![x.clone()],
            DataType::Int64 { nullable: false },
        )
        .unwrap();
        let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        assert_eq!(simplified, x);
    }

    #[test]
    fn nested_cast_collapses() {
        let x = RowExpression::InputRef(0, DataType::Int32 { nullable: false });
        let inner = RowExpression::call_with_type(
            Operator::cast(DataType::Int64 { nullable: false }).op,
            vec![x.clone()],
            DataType::Int64 { nullable: false },
        )
        .unwrap();
        let outer = RowExpression::call_with_type(
            Operator::cast(DataType::Float64 { nullable: false }).op,
            vec![inner],
            DataType::Float64 { nullable: false },
        )
        .unwrap();
        let simplified = simplify(&outer, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
        match simplified {
            RowExpression::Call { operands, data_type, .. } => {
                assert_eq!(operands[0], x);
                assert_eq!(data_type, DataType::Float64 { nullable: false });
            }
            _ => panic!("expected a single collapsed CAST"),
        }
    }

    #[test]
    fn lossless_cast_checks_widening() {
        assert!(is_lossless_cast(
            &DataType::Int32 { nullable: false },
            &DataType::Int64 { nullable: false }
        ));
        assert!(!is_lossless_cast(
            &DataType::Int64 { nullable: false },
            &DataType::Int32 { nullable: false }
        ));
    }
}
