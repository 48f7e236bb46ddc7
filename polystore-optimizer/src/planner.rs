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

//! The planner driver (`spec.md` §4.6): registration of the initial tree,
//! the fixpoint invocation loop, conversion insertion, cancellation and
//! time/iteration bounds.

use crate::adapter::{ConventionAdapter, OperatorAdapter, OperatorRegistry, RuleAdapter};
use crate::algebra::AlgebraKind;
use crate::cost::CostModelConfig;
use crate::extractor::{extract, PlanNode};
use crate::rule::{pattern::match_pattern, Rule, RuleCallQueue, RuleContext};
use crate::space::{NodeId, Space, SubsetId};
use crate::trait_def::{TraitDef, TraitDefRegistry, TraitSet};
use polystore_common::{invalid_input_err, BoundReason, PolystoreError, Result, RowTypeRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A not-yet-interned logical tree, the shape a parser/validator hands the
/// planner (`spec.md` §6: "Supplies a logical algebra tree... the
/// optimizer treats it as opaque once received").
#[derive(Debug, Clone)]
pub struct LogicalNode {
    pub kind: AlgebraKind,
    pub inputs: Vec<LogicalNode>,
    pub row_type: RowTypeRef,
}

impl LogicalNode {
    pub fn leaf(kind: AlgebraKind, row_type: RowTypeRef) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            row_type,
        }
    }

    pub fn with_inputs(kind: AlgebraKind, inputs: Vec<LogicalNode>, row_type: RowTypeRef) -> Self {
        Self { kind, inputs, row_type }
    }
}

/// `spec.md` §4.6's state machine: `Configuring -> Seeded -> Running ->
/// {Done | Cancelled | Exhausted | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Configuring,
    Seeded,
    Running,
    Done,
    Cancelled,
    Exhausted,
    Failed,
}

pub struct Planner {
    space: Space,
    rules: Vec<Box<dyn Rule>>,
    trait_defs: TraitDefRegistry,
    operators: OperatorRegistry,
    queue: RuleCallQueue,
    state: PlannerState,
    goal: Option<SubsetId>,
    required_traits: Option<TraitSet>,
    cancel: Option<Arc<AtomicBool>>,
    iteration_limit: Option<u64>,
    deadline: Option<Instant>,
    iterations: u64,
    cost_config: CostModelConfig,
}

impl Planner {
    pub fn new() -> Self {
        let (trait_defs, ()) = TraitDefRegistry::with_convention();
        Self {
            space: Space::new(),
            rules: Vec::new(),
            trait_defs,
            operators: OperatorRegistry::new(),
            queue: RuleCallQueue::new(),
            state: PlannerState::Configuring,
            goal: None,
            required_traits: None,
            cancel: None,
            iteration_limit: None,
            deadline: None,
            iterations: 0,
            cost_config: CostModelConfig::default(),
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn set_cost_config(&mut self, config: CostModelConfig) {
        self.cost_config = config;
    }

    fn ensure_configuring(&self) -> Result<()> {
        if self.state != PlannerState::Configuring {
            return invalid_input_err!("planner is no longer in the Configuring state");
        }
        Ok(())
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) -> Result<usize> {
        self.ensure_configuring()?;
        self.rules.push(rule);
        Ok(self.rules.len() - 1)
    }

    /// Disables a previously added rule; rule ids stay stable for the life
    /// of the planner so any call already queued for it is ignored.
    pub fn remove_rule(&mut self, rule_id: usize) -> Result<()> {
        self.ensure_configuring()?;
        if rule_id >= self.rules.len() {
            return invalid_input_err!("no rule with id {rule_id}");
        }
        self.rules.remove(rule_id);
        Ok(())
    }

    pub fn add_trait_def(&mut self, def: Box<dyn TraitDef>) -> Result<usize> {
        self.ensure_configuring()?;
        self.trait_defs.add(def)
    }

    pub fn apply_operator_adapter(&mut self, adapter: &dyn OperatorAdapter) -> Result<()> {
        self.ensure_configuring()?;
        adapter.register_operators(&mut self.operators);
        Ok(())
    }

    pub fn apply_rule_adapter(&mut self, adapter: &dyn RuleAdapter) -> Result<()> {
        self.ensure_configuring()?;
        adapter.register_rules(self)
    }

    pub fn apply_convention_adapter(&mut self, adapter: &dyn ConventionAdapter) -> Result<()> {
        self.ensure_configuring()?;
        adapter.register_convention(self)?;
        Ok(())
    }

    pub fn trait_defs_mut(&mut self) -> &mut TraitDefRegistry {
        &mut self.trait_defs
    }

    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    pub fn set_iteration_limit(&mut self, n: u64) {
        self.iteration_limit = Some(n);
    }

    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// `setRoot(node, requiredTraits) -> goalSubset`: interns the whole
    /// tree bottom-up, seeding rule calls for every node along the way,
    /// and transitions `Configuring -> Seeded`.
    pub fn set_root(&mut self, node: &LogicalNode, required_traits: TraitSet) -> Result<SubsetId> {
        self.ensure_configuring()?;
        let root_subset = self.intern_tree(node)?;
        self.space.subset_mut(root_subset).bump_importance(1.0);
        self.goal = Some(root_subset);
        self.required_traits = Some(required_traits);
        self.state = PlannerState::Seeded;
        log::debug!("planner: Configuring -> Seeded, goal subset {root_subset:?}");
        Ok(root_subset)
    }

    fn intern_tree(&mut self, node: &LogicalNode) -> Result<SubsetId> {
        let mut input_subsets = Vec::with_capacity(node.inputs.len());
        for child in &node.inputs {
            input_subsets.push(self.intern_tree(child)?);
        }
        let trait_set = self.trait_defs.default_trait_set();
        let (subset, created) =
            self.space
                .intern_new(node.kind.clone(), input_subsets, trait_set, node.row_type.clone())?;
        if created {
            let node_id = *self.space.subset(subset).members().last().expect("just inserted");
            self.seed_rule_calls_for_node(node_id, subset);
        }
        Ok(subset)
    }

    fn seed_rule_calls_for_node(&mut self, node_id: NodeId, subset: SubsetId) {
        let importance = self.space.subset(subset).importance().max(0.1);
        for (idx, rule) in self.rules.iter().enumerate() {
            for binding in match_pattern(rule.pattern(), node_id, &self.space) {
                self.queue.push(idx, node_id, binding, importance);
            }
        }
    }

    fn check_bounds(&mut self) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                self.state = PlannerState::Cancelled;
                log::debug!("planner: Running -> Cancelled after {} iterations", self.iterations);
                return Err(PolystoreError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.state = PlannerState::Exhausted;
                log::debug!("planner: Running -> Exhausted (deadline) after {} iterations", self.iterations);
                return Err(PolystoreError::Bound(BoundReason::Deadline));
            }
        }
        if let Some(limit) = self.iteration_limit {
            if self.iterations >= limit {
                self.state = PlannerState::Exhausted;
                log::debug!("planner: Running -> Exhausted (iteration limit {limit})");
                return Err(PolystoreError::Bound(BoundReason::IterationLimit));
            }
        }
        Ok(())
    }

    /// `findBestPlan() -> Node` or error: runs the fixpoint loop until the
    /// queue empties, a bound fires, cancellation is observed, or a rule
    /// raises, then extracts the cheapest plan from the goal subset.
    pub fn find_best_plan(&mut self) -> Result<PlanNode> {
        if self.state != PlannerState::Seeded {
            return invalid_input_err!("findBestPlan called outside the Seeded state");
        }
        self.state = PlannerState::Running;
        log::debug!("planner: Seeded -> Running");

        loop {
            self.check_bounds()?;
            let Some(call) = self.queue.pop() else {
                break;
            };
            self.iterations += 1;
            if call.rule_index >= self.rules.len() {
                continue;
            }

            let root_subset = self.space.subset_of_node(call.binding[0]);
            let row_type = self.space.row_type_of(root_subset);
            let mut ctx = RuleContext::new(&mut self.space, root_subset, row_type);
            let rule_name = self.rules[call.rule_index].name().to_string();
            log::trace!("planner: firing rule {rule_name} on binding {:?}", call.binding);
            let outcome = self.rules[call.rule_index].apply(&mut ctx, &call.binding);
            let produced = ctx.take_produced();

            if let Err(err) = outcome {
                self.state = PlannerState::Failed;
                log::debug!("planner: Running -> Failed in rule {rule_name}");
                return Err(match err {
                    PolystoreError::IncompatibleRewrite(_) => err,
                    other => PolystoreError::RuleFailure {
                        rule: rule_name,
                        message: other.to_string(),
                    },
                });
            }

            for subset in produced {
                if let Some(&node_id) = self.space.subset(subset).members().last() {
                    self.seed_rule_calls_for_node(node_id, subset);
                }
                // A new member can complete a pattern at any node that takes
                // this subset's set as an input, not just at `node_id`
                // itself (`spec.md` §3: "back-pointers to parent nodes ...
                // re-trigger their patterns").
                for ancestor in self.space.ancestors(subset) {
                    let ancestor_subset = self.space.subset_of_node(ancestor);
                    self.seed_rule_calls_for_node(ancestor, ancestor_subset);
                }
            }
        }

        let goal = self.goal.expect("Seeded state implies a goal subset");
        let satisfying = self.ensure_goal_trait(goal)?;
        let plan = extract(&mut self.space, satisfying, &self.cost_config)?;
        self.state = PlannerState::Done;
        log::debug!("planner: Running -> Done after {} iterations", self.iterations);
        Ok(plan)
    }

    /// Returns a subset of the goal's set already satisfying the required
    /// trait set, synthesizing a converter node (`spec.md` §4.2 "Convention
    /// insertion") if one doesn't already exist.
    ///
    /// Tries every subset registered under the goal's set, not just the
    /// handle the caller originally seeded: a rule may have produced a
    /// sibling in some other convention that a registered converter can
    /// reach even though the original (often still-`NONE`) subset can't
    /// (`spec.md` §8 scenario 5 picks its converter's source from whichever
    /// equivalent form is actually convertible).
    fn ensure_goal_trait(&mut self, subset: SubsetId) -> Result<SubsetId> {
        let required = self.required_traits.clone().expect("Seeded state implies required traits");
        let candidates = self.space.subsets_of_set(subset);

        for &candidate in &candidates {
            if self.trait_defs.satisfies(&self.space.subset(candidate).trait_set.clone(), &required) {
                return Ok(candidate);
            }
        }

        let row_type = self.space.row_type_of(subset);
        for &candidate in &candidates {
            let have = self.space.subset(candidate).trait_set.clone();
            let ctx = crate::trait_def::ConvertContext {
                row_type: &row_type,
                allow_infinite: true,
            };
            for slot in 0..required.len() {
                let (Some(have_manifestation), Some(want_manifestation)) = (have.get(slot), required.get(slot)) else {
                    continue;
                };
                if have_manifestation == want_manifestation {
                    continue;
                }
                if let Some(node) = self
                    .trait_defs
                    .convert(slot, &ctx, candidate, have_manifestation, want_manifestation)
                {
                    log::debug!(
                        "planner: inserting conversion {have_manifestation:?} -> {want_manifestation:?} on subset {candidate:?}"
                    );
                    let (converted, _) = self.space.transform_to(
                        candidate,
                        node.kind,
                        vec![candidate],
                        required.clone(),
                        row_type.clone(),
                    )?;
                    return Ok(converted);
                }
            }
        }
        Err(PolystoreError::NoImplementationFound)
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
