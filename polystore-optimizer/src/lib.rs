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

//! Cost-based Volcano/Cascades query optimizer (`spec.md` §2): the
//! equivalence search space, rule engine, trait framework, cost model and
//! planner driver that turn a logical tree into the cheapest physical one.
//! Plays the role `datafusion-optimizer` plays for DataFusion.

pub mod adapter;
pub mod algebra;
pub mod cost;
pub mod digest;
pub mod extractor;
pub mod planner;
pub mod rule;
pub mod space;
pub mod trait_def;

pub use adapter::{ConventionAdapter, OperatorAdapter, OperatorDescriptor, OperatorRegistry, RuleAdapter};
pub use algebra::{AlgebraKind, AlgebraNode, JoinType, ModifyOperation, SortKey};
pub use cost::{Cost, CostModelConfig};
pub use extractor::PlanNode;
pub use planner::{LogicalNode, Planner, PlannerState};
pub use rule::builtin::{CombineFilters, PushFilterThroughProject, ScanToConvention};
pub use rule::{Binding, ChildMatch, KindMatch, Operand, Pattern, Rule, RuleContext};
pub use space::{NodeId, SetId, Space, SubsetId};
pub use trait_def::{
    none_convention, ConventionTraitDef, ConvertContext, Convention, TraitDef, TraitDefRegistry, TraitManifestation,
    TraitSet, CONVENTION_SLOT,
};
