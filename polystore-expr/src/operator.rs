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

//! `Call` operators: a fixed kind, a name, a return-type inference function
//! and an operand checker, plus a determinism flag, per `spec.md` §3.
//!
//! Built-in operators (boolean algebra, comparisons, CASE/COALESCE/NULLIF,
//! CAST, arithmetic) are dispatched through a `match` on `OperatorKind` —
//! "a function table indexed by kind" per `spec.md` §9 — rather than through
//! trait objects per variant. Adapter-contributed operators (`spec.md` §6
//! `registerOperators`) plug into the same table via `OperatorRegistry`.

use polystore_common::{invalid_input_err, DataType, Result};

/// The fixed kind of a `Call` operator. Adapters register additional
/// operators under `Custom`, identified by the name carried on `Operator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    And,
    Or,
    Not,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
    Plus,
    Minus,
    Times,
    Divide,
    Case,
    Coalesce,
    NullIf,
    Cast,
    /// An adapter-contributed operator, opaque to the simplifier beyond
    /// its declared determinism and operand/return-type checks.
    Custom,
}

impl OperatorKind {
    /// Whether this operator commutes (`a OP b == b OP a`), used by CNF/DNF
    /// normalization and duplicate-argument elimination.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            OperatorKind::And
                | OperatorKind::Or
                | OperatorKind::Eq
                | OperatorKind::NotEq
                | OperatorKind::Plus
                | OperatorKind::Times
        )
    }

    pub fn is_boolean_connective(self) -> bool {
        matches!(self, OperatorKind::And | OperatorKind::Or | OperatorKind::Not)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OperatorKind::Eq
                | OperatorKind::NotEq
                | OperatorKind::Lt
                | OperatorKind::Le
                | OperatorKind::Gt
                | OperatorKind::Ge
        )
    }
}

/// A `Call` operator: fixed kind, name, determinism, plus the return-type
/// inference and operand-checker functions dispatched via `OperatorKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub kind: OperatorKind,
    pub name: String,
    pub deterministic: bool,
}

impl Operator {
    pub fn new(kind: OperatorKind, name: impl Into<String>, deterministic: bool) -> Self {
        Self {
            kind,
            name: name.into(),
            deterministic,
        }
    }

    pub fn and() -> Self {
        Self::new(OperatorKind::And, "AND", true)
    }
    pub fn or() -> Self {
        Self::new(OperatorKind::Or, "OR", true)
    }
    pub fn not() -> Self {
        Self::new(OperatorKind::Not, "NOT", true)
    }
    pub fn eq() -> Self {
        Self::new(OperatorKind::Eq, "=", true)
    }
    pub fn not_eq() -> Self {
        Self::new(OperatorKind::NotEq, "<>", true)
    }
    pub fn lt() -> Self {
        Self::new(OperatorKind::Lt, "<", true)
    }
    pub fn le() -> Self {
        Self::new(OperatorKind::Le, "<=", true)
    }
    pub fn gt() -> Self {
        Self::new(OperatorKind::Gt, ">", true)
    }
    pub fn ge() -> Self {
        Self::new(OperatorKind::Ge, ">=", true)
    }
    pub fn is_null() -> Self {
        Self::new(OperatorKind::IsNull, "IS NULL", true)
    }
    pub fn is_not_null() -> Self {
        Self::new(OperatorKind::IsNotNull, "IS NOT NULL", true)
    }
    pub fn is_true() -> Self {
        Self::new(OperatorKind::IsTrue, "IS TRUE", true)
    }
    pub fn is_not_true() -> Self {
        Self::new(OperatorKind::IsNotTrue, "IS NOT TRUE", true)
    }
    pub fn case() -> Self {
        Self::new(OperatorKind::Case, "CASE", true)
    }
    pub fn coalesce() -> Self {
        Self::new(OperatorKind::Coalesce, "COALESCE", true)
    }
    pub fn null_if() -> Self {
        Self::new(OperatorKind::NullIf, "NULLIF", true)
    }
    pub fn cast(target: DataType) -> CastOperator {
        CastOperator {
            op: Self::new(OperatorKind::Cast, "CAST", true),
            target,
        }
    }
}

/// `Cast` carries its target type alongside the operator; kept as a
/// distinct helper rather than growing `Operator` with an optional payload
/// used by exactly one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOperator {
    pub op: Operator,
    pub target: DataType,
}

/// Infer the return type of a `Call` given its already-typed operands.
/// Strict (null-propagating) operators return a nullable type whenever any
/// operand is nullable, per `spec.md` §4.1's null-propagation rule.
pub fn infer_return_type(kind: OperatorKind, operand_types: &[DataType]) -> Result<DataType> {
    let any_nullable = operand_types.iter().any(|t| t.is_nullable());
    match kind {
        OperatorKind::And | OperatorKind::Or | OperatorKind::Not => {
            // AND/OR/NOT have explicit null tables (spec.md 4.1): the
            // result is nullable whenever any operand is nullable, since a
            // single unknown can make the whole expression unknown.
            Ok(DataType::Boolean {
                nullable: any_nullable,
            })
        }
        OperatorKind::Eq
        | OperatorKind::NotEq
        | OperatorKind::Lt
        | OperatorKind::Le
        | OperatorKind::Gt
        | OperatorKind::Ge => Ok(DataType::Boolean {
            nullable: any_nullable,
        }),
        OperatorKind::IsNull
        | OperatorKind::IsNotNull
        | OperatorKind::IsTrue
        | OperatorKind::IsNotTrue
        | OperatorKind::IsFalse
        | OperatorKind::IsNotFalse => Ok(DataType::Boolean { nullable: false }),
        OperatorKind::Plus | OperatorKind::Minus | OperatorKind::Times | OperatorKind::Divide => {
            numeric_result_type(operand_types, any_nullable)
        }
        OperatorKind::Case => {
            // Result branches are every odd-indexed operand (THEN/ELSE);
            // nullability is the union across all of them.
            if operand_types.len() < 2 {
                return invalid_input_err!("CASE requires at least a condition and a result");
            }
            let result_nullable = operand_types
                .iter()
                .skip(1)
                .step_by(2)
                .chain(
                    // trailing ELSE, if arity is odd
                    if operand_types.len() % 2 == 1 {
                        operand_types.last()
                    } else {
                        None
                    },
                )
                .any(|t| t.is_nullable());
            let base = operand_types
                .get(1)
                .cloned()
                .unwrap_or(DataType::Null);
            Ok(base.with_nullable(result_nullable))
        }
        OperatorKind::Coalesce => {
            if operand_types.is_empty() {
                return invalid_input_err!("COALESCE requires at least one argument");
            }
            let all_nullable = operand_types.iter().all(|t| t.is_nullable());
            Ok(operand_types[0].with_nullable(all_nullable))
        }
        OperatorKind::NullIf => {
            if operand_types.len() != 2 {
                return invalid_input_err!("NULLIF requires exactly two arguments");
            }
            Ok(operand_types[0].with_nullable(true))
        }
        OperatorKind::Cast => {
            invalid_input_err!("CAST return type must be supplied by the caller, not inferred")
        }
        OperatorKind::Custom => {
            invalid_input_err!("custom operators must supply their own return type inference")
        }
    }
}

fn numeric_result_type(operand_types: &[DataType], any_nullable: bool) -> Result<DataType> {
    let rank = operand_types
        .iter()
        .map(|t| t.numeric_rank())
        .collect::<Option<Vec<_>>>()
        .and_then(|ranks| ranks.into_iter().max());
    match rank {
        Some(0) => Ok(DataType::Int32 {
            nullable: any_nullable,
        }),
        Some(1) => Ok(DataType::Int64 {
            nullable: any_nullable,
        }),
        Some(_) => Ok(DataType::Float64 {
            nullable: any_nullable,
        }),
        None => invalid_input_err!("arithmetic operator requires numeric operands"),
    }
}

/// Check that operand types conform to what `kind` accepts, per `spec.md`
/// §3's `Call` invariant. Returns the checked slice back (as a borrow) so
/// call sites can chain into `infer_return_type`.
pub fn check_operands(kind: OperatorKind, operand_types: &[DataType]) -> Result<()> {
    match kind {
        OperatorKind::And | OperatorKind::Or => {
            if operand_types.len() < 2 {
                return invalid_input_err!("{kind:?} requires at least two operands");
            }
            for t in operand_types {
                require_boolean(t)?;
            }
            Ok(())
        }
        OperatorKind::Not
        | OperatorKind::IsNull
        | OperatorKind::IsNotNull
        | OperatorKind::IsTrue
        | OperatorKind::IsNotTrue
        | OperatorKind::IsFalse
        | OperatorKind::IsNotFalse => {
            if operand_types.len() != 1 {
                return invalid_input_err!("{kind:?} requires exactly one operand");
            }
            if matches!(
                kind,
                OperatorKind::Not | OperatorKind::IsTrue | OperatorKind::IsNotTrue
            ) {
                require_boolean(&operand_types[0])?;
            }
            Ok(())
        }
        OperatorKind::Eq
        | OperatorKind::NotEq
        | OperatorKind::Lt
        | OperatorKind::Le
        | OperatorKind::Gt
        | OperatorKind::Ge => {
            if operand_types.len() != 2 {
                return invalid_input_err!("{kind:?} requires exactly two operands");
            }
            Ok(())
        }
        OperatorKind::Plus | OperatorKind::Minus | OperatorKind::Times | OperatorKind::Divide => {
            if operand_types.len() != 2 {
                return invalid_input_err!("{kind:?} requires exactly two operands");
            }
            for t in operand_types {
                if !t.is_numeric() {
                    return invalid_input_err!("{kind:?} requires numeric operands, got {t}");
                }
            }
            Ok(())
        }
        OperatorKind::Case => {
            if operand_types.len() < 2 {
                return invalid_input_err!("CASE requires a condition and a result");
            }
            Ok(())
        }
        OperatorKind::Coalesce => {
            if operand_types.is_empty() {
                return invalid_input_err!("COALESCE requires at least one argument");
            }
            Ok(())
        }
        OperatorKind::NullIf => {
            if operand_types.len() != 2 {
                return invalid_input_err!("NULLIF requires exactly two arguments");
            }
            Ok(())
        }
        OperatorKind::Cast => {
            if operand_types.len() != 1 {
                return invalid_input_err!("CAST requires exactly one operand");
            }
            Ok(())
        }
        OperatorKind::Custom => Ok(()),
    }
}

fn require_boolean(t: &DataType) -> Result<()> {
    match t {
        DataType::Boolean { .. } | DataType::Null => Ok(()),
        other => invalid_input_err!("expected BOOLEAN, got {other}"),
    }
}
