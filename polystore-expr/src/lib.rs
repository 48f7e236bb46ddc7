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

//! Row-expression IR and simplifier (`spec.md` §3, §4.1). Plays the role
//! `datafusion-expr` plays for DataFusion: the typed scalar-expression
//! representation that both the rule engine and adapters build against.

pub mod expr;
pub mod operator;
pub mod simplifier;

pub use expr::RowExpression;
pub use operator::{CastOperator, Operator, OperatorKind};
pub use simplifier::{is_deterministic, is_not_true, is_null, pull_factors, simplify, to_cnf, PredicateContext, UnknownAs};
