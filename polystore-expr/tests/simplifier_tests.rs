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

//! End-to-end simplifier properties from `spec.md` §8, mirroring the shape
//! of `datafusion/optimizer/tests/integration-test.rs`: black-box tests
//! against the crate's public API only.

use polystore_common::{DataType, ScalarValue};
use polystore_expr::{simplify, PredicateContext, RowExpression, UnknownAs};
use rstest::rstest;

#[ctor::ctor]
fn init_logging() {
    let _ = env_logger::try_init();
}

fn bool_ref(i: usize, nullable: bool) -> RowExpression {
    RowExpression::InputRef(i, DataType::Boolean { nullable })
}

#[rstest]
#[case(UnknownAs::Unknown)]
#[case(UnknownAs::True)]
#[case(UnknownAs::False)]
fn idempotence_holds_for_every_mode(#[case] mode: UnknownAs) {
    let x = bool_ref(0, true);
    let not_x = RowExpression::not(x.clone()).unwrap();
    let e = RowExpression::and(vec![x, not_x]).unwrap();

    let ctx = PredicateContext::new();
    let once = simplify(&e, mode, &ctx).unwrap();
    let twice = simplify(&once, mode, &ctx).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn contradiction_nullable_under_true_mode_is_not_a_blanket_constant() {
    // `x AND NOT x` is never true, only NULL-or-false. Under False mode a
    // NULL row is rejected so the filter-equivalent value is constant
    // false; under True mode a NULL row passes, so it must reduce to
    // exactly "x is null", not to a mode-independent constant in either
    // direction.
    let x = bool_ref(0, true);
    let not_x = RowExpression::not(x.clone()).unwrap();
    let e = RowExpression::and(vec![x.clone(), not_x]).unwrap();
    let ctx = PredicateContext::new();

    let false_mode = simplify(&e, UnknownAs::False, &ctx).unwrap();
    assert!(false_mode.is_literal_false());

    let true_mode = simplify(&e, UnknownAs::True, &ctx).unwrap();
    assert_eq!(true_mode, RowExpression::is_null(x).unwrap());
}

#[test]
fn predicate_context_implication_folds_to_true_under_false_mode() {
    let x = bool_ref(0, false);
    let mut ctx = PredicateContext::new();
    ctx.assert_fact(x.clone());

    let simplified = simplify(&x, UnknownAs::False, &ctx).unwrap();
    assert!(simplified.is_literal_true());
}

#[test]
fn predicate_context_negated_implication_folds_to_false() {
    let x = bool_ref(0, false);
    let not_x = RowExpression::not(x.clone()).unwrap();
    let mut ctx = PredicateContext::new();
    ctx.assert_fact(not_x);

    let simplified = simplify(&x, UnknownAs::False, &ctx).unwrap();
    assert!(simplified.is_literal_false());
}

#[test]
fn is_null_of_non_null_literal_is_false() {
    let lit = RowExpression::literal(ScalarValue::Int64(Some(1)));
    let e = RowExpression::is_null(lit).unwrap();
    let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
    assert!(simplified.is_literal_false());
}

#[test]
fn is_not_null_of_null_literal_is_false() {
    let null_lit = RowExpression::null_literal(DataType::Int64 { nullable: true });
    let e = RowExpression::is_not_null(null_lit).unwrap();
    let simplified = simplify(&e, UnknownAs::Unknown, &PredicateContext::new()).unwrap();
    assert!(simplified.is_literal_false());
}
