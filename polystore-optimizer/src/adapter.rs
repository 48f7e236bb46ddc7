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

//! External-collaborator contracts (`spec.md` §6): storage/engine plugins
//! register operators, rules and conventions against the planner without
//! the optimizer core knowing anything about their concrete physical
//! representation.

use crate::planner::Planner;
use crate::trait_def::Convention;
use polystore_common::{DataType, Result};
use polystore_expr::OperatorKind;

/// One operator an adapter contributes: the planner only needs enough to
/// type-check and cost it, not to evaluate it.
pub struct OperatorDescriptor {
    pub name: String,
    pub kind: OperatorKind,
    pub deterministic: bool,
    pub infer_return_type: fn(&[DataType]) -> Result<DataType>,
}

/// Registry an `OperatorAdapter` pushes definitions into. Kept separate
/// from `Planner` itself since operator registration happens once, at
/// startup, shared across planner runs (`spec.md` §5: "share only
/// immutable trait/operator/rule registries").
#[derive(Default)]
pub struct OperatorRegistry {
    operators: Vec<OperatorDescriptor>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: OperatorDescriptor) {
        self.operators.push(descriptor);
    }

    pub fn operators(&self) -> &[OperatorDescriptor] {
        &self.operators
    }
}

/// `registerOperators(registry)`.
pub trait OperatorAdapter {
    fn register_operators(&self, registry: &mut OperatorRegistry);
}

/// `registerRules(planner)`.
pub trait RuleAdapter {
    fn register_rules(&self, planner: &mut Planner) -> Result<()>;
}

/// `registerConvention(def)`.
pub trait ConventionAdapter {
    fn register_convention(&self, planner: &mut Planner) -> Result<Convention>;
}
