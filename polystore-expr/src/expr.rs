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

//! `RowExpression`: the typed scalar-expression IR of `spec.md` §3.

use crate::operator::{Operator, OperatorKind};
use polystore_common::{invalid_input_err, DataType, Result, ScalarValue};
use std::fmt;

/// A typed scalar expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RowExpression {
    Literal(ScalarValue, DataType),
    InputRef(usize, DataType),
    LocalRef(usize, DataType),
    DynamicParam(usize, DataType),
    FieldAccess {
        target: Box<RowExpression>,
        field_index: usize,
        field_name: String,
        data_type: DataType,
    },
    CorrelVariable(String, DataType),
    Call {
        operator: Operator,
        operands: Vec<RowExpression>,
        data_type: DataType,
    },
}

impl RowExpression {
    pub fn literal(value: ScalarValue) -> Self {
        let ty = value.data_type();
        RowExpression::Literal(value, ty)
    }

    pub fn null_literal(data_type: DataType) -> Self {
        RowExpression::Literal(ScalarValue::null_of(&data_type), data_type.with_nullable(true))
    }

    pub fn boolean(value: bool) -> Self {
        RowExpression::literal(ScalarValue::Boolean(Some(value)))
    }

    pub fn call(operator: Operator, operands: Vec<RowExpression>) -> Result<Self> {
        let operand_types: Vec<DataType> = operands.iter().map(|e| e.data_type().clone()).collect();
        crate::operator::check_operands(operator.kind, &operand_types)?;
        let data_type = crate::operator::infer_return_type(operator.kind, &operand_types)?;
        Ok(RowExpression::Call {
            operator,
            operands,
            data_type,
        })
    }

    /// Build a `Call` with an explicitly supplied return type, bypassing
    /// inference. Used for `CAST`, whose target type is not a function of
    /// its operand, and for adapter-contributed custom operators.
    pub fn call_with_type(
        operator: Operator,
        operands: Vec<RowExpression>,
        data_type: DataType,
    ) -> Result<Self> {
        let operand_types: Vec<DataType> = operands.iter().map(|e| e.data_type().clone()).collect();
        crate::operator::check_operands(operator.kind, &operand_types)?;
        Ok(RowExpression::Call {
            operator,
            operands,
            data_type,
        })
    }

    pub fn and(exprs: Vec<RowExpression>) -> Result<Self> {
        match exprs.len() {
            0 => invalid_input_err!("AND requires at least one operand"),
            1 => Ok(exprs.into_iter().next().unwrap()),
            _ => Self::call(Operator::and(), exprs),
        }
    }

    pub fn or(exprs: Vec<RowExpression>) -> Result<Self> {
        match exprs.len() {
            0 => invalid_input_err!("OR requires at least one operand"),
            1 => Ok(exprs.into_iter().next().unwrap()),
            _ => Self::call(Operator::or(), exprs),
        }
    }

    pub fn not(expr: RowExpression) -> Result<Self> {
        Self::call(Operator::not(), vec![expr])
    }

    pub fn is_null(expr: RowExpression) -> Result<Self> {
        Self::call(Operator::is_null(), vec![expr])
    }

    pub fn is_not_null(expr: RowExpression) -> Result<Self> {
        Self::call(Operator::is_not_null(), vec![expr])
    }

    pub fn is_true(expr: RowExpression) -> Result<Self> {
        Self::call(Operator::is_true(), vec![expr])
    }

    pub fn eq(left: RowExpression, right: RowExpression) -> Result<Self> {
        Self::call(Operator::eq(), vec![left, right])
    }

    pub fn data_type(&self) -> &DataType {
        match self {
            RowExpression::Literal(_, t) => t,
            RowExpression::InputRef(_, t) => t,
            RowExpression::LocalRef(_, t) => t,
            RowExpression::DynamicParam(_, t) => t,
            RowExpression::FieldAccess { data_type, .. } => data_type,
            RowExpression::CorrelVariable(_, t) => t,
            RowExpression::Call { data_type, .. } => data_type,
        }
    }

    pub fn operands(&self) -> &[RowExpression] {
        match self {
            RowExpression::Call { operands, .. } => operands,
            _ => &[],
        }
    }

    pub fn kind(&self) -> Option<OperatorKind> {
        match self {
            RowExpression::Call { operator, .. } => Some(operator.kind),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&ScalarValue> {
        match self {
            RowExpression::Literal(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn is_literal_true(&self) -> bool {
        matches!(self.as_literal(), Some(ScalarValue::Boolean(Some(true))))
    }

    pub fn is_literal_false(&self) -> bool {
        matches!(self.as_literal(), Some(ScalarValue::Boolean(Some(false))))
    }

    /// `LocalRef` indices must be bounded by the enclosing program's
    /// expression-list length (`spec.md` §3 invariant). Programs with no
    /// local-ref table pass `0`.
    pub fn validate_local_refs(&self, local_program_len: usize) -> Result<()> {
        match self {
            RowExpression::LocalRef(index, _) => {
                if *index >= local_program_len {
                    invalid_input_err!(
                        "LocalRef index {index} out of bounds for program of length {local_program_len}"
                    )
                } else {
                    Ok(())
                }
            }
            RowExpression::FieldAccess { target, .. } => target.validate_local_refs(local_program_len),
            RowExpression::Call { operands, .. } => {
                for o in operands {
                    o.validate_local_refs(local_program_len)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// `isDeterministic` per `spec.md` §4.1: false if any `Call` in the
    /// tree is itself non-deterministic.
    pub fn is_deterministic(&self) -> bool {
        match self {
            RowExpression::Call {
                operator, operands, ..
            } => operator.deterministic && operands.iter().all(|o| o.is_deterministic()),
            RowExpression::FieldAccess { target, .. } => target.is_deterministic(),
            _ => true,
        }
    }
}

impl fmt::Display for RowExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowExpression::Literal(v, _) => write!(f, "{v}"),
            RowExpression::InputRef(i, _) => write!(f, "$input{i}"),
            RowExpression::LocalRef(i, _) => write!(f, "$local{i}"),
            RowExpression::DynamicParam(i, _) => write!(f, "?{i}"),
            RowExpression::FieldAccess {
                target, field_name, ..
            } => write!(f, "{target}.{field_name}"),
            RowExpression::CorrelVariable(name, _) => write!(f, "${name}"),
            RowExpression::Call {
                operator, operands, ..
            } => {
                if operands.len() == 2 && operator.kind.is_comparison()
                    || operator.kind.is_boolean_connective() && operands.len() == 2
                {
                    write!(f, "({} {} {})", operands[0], operator.name, operands[1])
                } else {
                    write!(f, "{}(", operator.name)?;
                    for (i, o) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{o}")?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_infers_nullable_and() {
        let a = RowExpression::InputRef(0, DataType::Boolean { nullable: true });
        let b = RowExpression::InputRef(1, DataType::Boolean { nullable: false });
        let e = RowExpression::and(vec![a, b]).unwrap();
        assert_eq!(e.data_type(), &DataType::Boolean { nullable: true });
    }

    #[test]
    fn is_deterministic_propagates() {
        let mut nondet = Operator::eq();
        nondet.deterministic = false;
        let e = RowExpression::call(
            nondet,
            vec![
                RowExpression::literal(ScalarValue::Int64(Some(1))),
                RowExpression::literal(ScalarValue::Int64(Some(1))),
            ],
        )
        .unwrap();
        assert!(!e.is_deterministic());
    }

    #[test]
    fn local_ref_bounds_checked() {
        let e = RowExpression::LocalRef(2, DataType::Int64 { nullable: false });
        assert!(e.validate_local_refs(2).is_err());
        assert!(e.validate_local_refs(3).is_ok());
    }
}
