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

//! Row-expression simplification (`spec.md` §4.1): constant folding,
//! CNF/DNF conversion, nullability-aware predicate reduction and
//! CASE/COALESCE normalization.
//!
//! Modeled on `datafusion_optimizer`'s `simplify_expressions` rule family:
//! a public, pure entry point (`simplify`) that the rule engine and the
//! planner driver can call on any `RowExpression` without needing to know
//! its internal recursion strategy.

pub mod boolean;
pub mod case;
pub mod cast;
pub mod comparison;
pub mod range;

use crate::expr::RowExpression;
use crate::operator::OperatorKind;
use polystore_common::{DataType, Result, ScalarValue};

/// How the simplifier should interpret a three-valued (possibly `NULL`)
/// boolean result, per `spec.md` §4.1 and the GLOSSARY. `simplify` with
/// `mode = False` is what a `WHERE` clause uses: `NULL` filters a row out
/// just like `FALSE` does, so the simplifier is free to fold `NULL` to
/// `FALSE` wherever the two are indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownAs {
    Unknown,
    True,
    False,
}

/// A conjunction of facts believed true over the surrounding row, e.g.
/// `x IS NOT NULL` inferred from an enclosing `NOT NULL` column
/// constraint. Range reasoning (`range.rs`) and comparison folding consult
/// this to avoid re-deriving facts the caller already knows.
#[derive(Debug, Clone, Default)]
pub struct PredicateContext {
    facts: Vec<RowExpression>,
}

impl PredicateContext {
    pub fn new() -> Self {
        Self { facts: Vec::new() }
    }

    pub fn with_facts(facts: Vec<RowExpression>) -> Self {
        Self { facts }
    }

    pub fn facts(&self) -> &[RowExpression] {
        &self.facts
    }

    pub fn assert_fact(&mut self, fact: RowExpression) {
        self.facts.push(fact);
    }

    /// True if the context already asserts that `expr` is not null (either
    /// directly, via `expr IS NOT NULL`, or because `expr`'s static type is
    /// non-nullable).
    pub fn knows_not_null(&self, expr: &RowExpression) -> bool {
        if !expr.data_type().is_nullable() {
            return true;
        }
        self.facts.iter().any(|f| matches!(f.kind(), Some(OperatorKind::IsNotNull)) && f.operands().first() == Some(expr))
    }

    /// True if the context directly asserts `expr`, i.e. `simplify` can
    /// fold `expr` to `true` under `mode = False`.
    pub fn implies(&self, expr: &RowExpression) -> bool {
        self.facts.iter().any(|f| f == expr)
    }

    /// True if the context directly asserts `NOT expr`.
    pub fn implies_not(&self, expr: &RowExpression) -> bool {
        self.facts.iter().any(|f| match f.kind() {
            Some(OperatorKind::Not) => f.operands().first() == Some(expr),
            _ => false,
        })
    }
}

pub(crate) type Simplified<T> = std::result::Result<T, Signal>;

/// Internal unwinding signal. `AlwaysNull` is raised when a sub-expression
/// is known to evaluate to `NULL` but the surrounding recursion demanded a
/// concrete value; it is caught at `simplify`'s public boundary and
/// converted into a typed null literal or a constant boolean per `mode`
/// (`spec.md` §7).
pub(crate) enum Signal {
    AlwaysNull,
    Error(polystore_common::PolystoreError),
}

impl From<polystore_common::PolystoreError> for Signal {
    fn from(e: polystore_common::PolystoreError) -> Self {
        Signal::Error(e)
    }
}

fn unwind(signal: Signal, data_type: &DataType, mode: UnknownAs) -> Result<RowExpression> {
    match signal {
        Signal::Error(e) => Err(e),
        Signal::AlwaysNull => {
            let resolved = resolve_always_null(data_type, mode);
            log::debug!("simplify: unwinding AlwaysNull under {mode:?} to {resolved}");
            Ok(resolved)
        }
    }
}

fn resolve_always_null(data_type: &DataType, mode: UnknownAs) -> RowExpression {
    match (data_type, mode) {
        (DataType::Boolean { .. }, UnknownAs::True) => RowExpression::boolean(true),
        (DataType::Boolean { .. }, UnknownAs::False) => RowExpression::boolean(false),
        _ => RowExpression::null_literal(data_type.with_nullable(true)),
    }
}

/// Simplify `e` under the given unknown-as mode and predicate context.
/// Idempotent: `simplify(simplify(e, m, ctx), m, ctx) == simplify(e, m, ctx)`.
pub fn simplify(e: &RowExpression, mode: UnknownAs, context: &PredicateContext) -> Result<RowExpression> {
    match simplify_rec(e, mode, context) {
        Ok(expr) => Ok(expr),
        Err(signal) => unwind(signal, e.data_type(), mode),
    }
}

fn simplify_rec(e: &RowExpression, mode: UnknownAs, ctx: &PredicateContext) -> Simplified<RowExpression> {
    if ctx.implies(e) && matches!(e.data_type(), DataType::Boolean { .. }) {
        return Ok(RowExpression::boolean(true));
    }
    if ctx.implies_not(e) && matches!(e.data_type(), DataType::Boolean { .. }) {
        return Ok(RowExpression::boolean(false));
    }

    match e {
        RowExpression::Literal(..)
        | RowExpression::InputRef(..)
        | RowExpression::LocalRef(..)
        | RowExpression::DynamicParam(..)
        | RowExpression::CorrelVariable(..) => Ok(e.clone()),

        RowExpression::FieldAccess {
            target,
            field_index,
            field_name,
            data_type,
        } => {
            let new_target = simplify_value(target, ctx)?;
            Ok(RowExpression::FieldAccess {
                target: Box::new(new_target),
                field_index: *field_index,
                field_name: field_name.clone(),
                data_type: data_type.clone(),
            })
        }

        RowExpression::Call { operator, .. } => match operator.kind {
            OperatorKind::And => boolean::simplify_and(e, mode, ctx),
            OperatorKind::Or => boolean::simplify_or(e, mode, ctx),
            OperatorKind::Not => boolean::simplify_not(e, mode, ctx),
            OperatorKind::Eq
            | OperatorKind::NotEq
            | OperatorKind::Lt
            | OperatorKind::Le
            | OperatorKind::Gt
            | OperatorKind::Ge => comparison::simplify_comparison(e, mode, ctx),
            OperatorKind::IsNull
            | OperatorKind::IsNotNull
            | OperatorKind::IsTrue
            | OperatorKind::IsNotTrue
            | OperatorKind::IsFalse
            | OperatorKind::IsNotFalse => comparison::simplify_null_check(e, ctx),
            OperatorKind::Case => case::simplify_case(e, mode, ctx),
            OperatorKind::Coalesce => case::simplify_coalesce(e, ctx),
            OperatorKind::NullIf => case::simplify_null_if(e, ctx),
            OperatorKind::Cast => cast::simplify_cast(e, ctx),
            OperatorKind::Plus | OperatorKind::Minus | OperatorKind::Times | OperatorKind::Divide => {
                simplify_arithmetic(e, ctx)
            }
            OperatorKind::Custom => simplify_opaque_call(e, ctx),
        },
    }
}

/// Simplify `e` in a plain value context (not a filter): always
/// `UnknownAs::Unknown`, so three-valued results are preserved rather than
/// collapsed.
pub(crate) fn simplify_value(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    simplify_rec(e, UnknownAs::Unknown, ctx)
}

fn simplify_arithmetic(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (operator, operands, data_type) = match e {
        RowExpression::Call {
            operator,
            operands,
            data_type,
        } => (operator, operands, data_type),
        _ => unreachable!(),
    };
    let simplified: Vec<RowExpression> = operands
        .iter()
        .map(|o| simplify_value(o, ctx))
        .collect::<Simplified<Vec<_>>>()?;

    if simplified.iter().any(|o| o.as_literal().map(|v| v.is_null()).unwrap_or(false)) {
        return Err(Signal::AlwaysNull);
    }

    if let [RowExpression::Literal(a, _), RowExpression::Literal(b, _)] = simplified.as_slice() {
        if let Some(folded) = fold_arithmetic(operator.kind, a, b) {
            return Ok(RowExpression::literal(folded));
        }
    }

    Ok(RowExpression::Call {
        operator: operator.clone(),
        operands: simplified,
        data_type: data_type.clone(),
    })
}

fn fold_arithmetic(kind: OperatorKind, a: &ScalarValue, b: &ScalarValue) -> Option<ScalarValue> {
    let (a, b) = match (a, b) {
        (ScalarValue::Int64(Some(a)), ScalarValue::Int64(Some(b))) => (*a, *b),
        (ScalarValue::Int32(Some(a)), ScalarValue::Int32(Some(b))) => (*a as i64, *b as i64),
        _ => return None,
    };
    let result = match kind {
        OperatorKind::Plus => a.checked_add(b)?,
        OperatorKind::Minus => a.checked_sub(b)?,
        OperatorKind::Times => a.checked_mul(b)?,
        OperatorKind::Divide => {
            if b == 0 {
                return None;
            }
            a.checked_div(b)?
        }
        _ => return None,
    };
    Some(ScalarValue::Int64(Some(result)))
}

fn simplify_opaque_call(e: &RowExpression, ctx: &PredicateContext) -> Simplified<RowExpression> {
    let (operator, operands, data_type) = match e {
        RowExpression::Call {
            operator,
            operands,
            data_type,
        } => (operator, operands, data_type),
        _ => unreachable!(),
    };
    let simplified: Vec<RowExpression> = operands
        .iter()
        .map(|o| simplify_value(o, ctx))
        .collect::<Simplified<Vec<_>>>()?;
    Ok(RowExpression::Call {
        operator: operator.clone(),
        operands: simplified,
        data_type: data_type.clone(),
    })
}

/// `isDeterministic` per `spec.md` §4.1.
pub fn is_deterministic(e: &RowExpression) -> bool {
    e.is_deterministic()
}

/// `isNull` per `spec.md` §4.1: true when `e` is known (statically, or via
/// `known_nulls`) to always evaluate to `NULL`.
pub fn is_null(e: &RowExpression, known_nulls: &PredicateContext) -> bool {
    match e {
        RowExpression::Literal(v, _) => v.is_null(),
        _ => known_nulls.facts().iter().any(|f| {
            matches!(f.kind(), Some(OperatorKind::IsNull)) && f.operands().first() == Some(e)
        }),
    }
}

/// `isNotTrue` per `spec.md` §4.1: true when `e` is known to never
/// evaluate to `TRUE` (i.e. it is `FALSE` or `NULL` for every row).
pub fn is_not_true(e: &RowExpression, known_nulls: &PredicateContext) -> bool {
    if e.is_literal_false() {
        return true;
    }
    if is_null(e, known_nulls) {
        return true;
    }
    false
}

pub use boolean::{pull_factors, to_cnf};
