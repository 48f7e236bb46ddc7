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

//! A handful of concrete transformation/implementation rules, grounded on
//! `datafusion-optimizer`'s one-rule-per-file rules (`eliminate_project.rs`):
//! each rule here is a small `struct` implementing `Rule`, not a framework
//! of its own.

use crate::algebra::AlgebraKind;
use crate::rule::{Binding, Operand, Pattern, Rule, RuleContext};
use crate::trait_def::{none_convention, TraitManifestation, TraitSet};
use polystore_common::Result;
use polystore_expr::RowExpression;

/// `Filter(Filter(input, c1), c2) -> Filter(input, c1 AND c2)`. Grounded on
/// `datafusion-optimizer`'s filter-merging rules, which fold nested filters
/// into one conjunction rather than evaluating the predicate twice per row.
#[derive(Debug)]
pub struct CombineFilters {
    pattern: OnceCell<Pattern>,
}

impl Default for CombineFilters {
    fn default() -> Self {
        Self::new()
    }
}

impl CombineFilters {
    pub fn new() -> Self {
        Self { pattern: OnceCell::new() }
    }
}

impl Rule for CombineFilters {
    fn name(&self) -> &str {
        "combine_filters"
    }

    fn pattern(&self) -> &Pattern {
        self.pattern.get_or_init(|| {
            Pattern::new(Operand::exact("Filter").with_positional_children(vec![Operand::exact("Filter")]))
        })
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, binding: &Binding) -> Result<()> {
        let outer = ctx.space().node(binding[0]);
        let inner = ctx.space().node(binding[1]);
        let (outer_cond, inner_cond, inner_input, inner_trait_set, inner_row_type) = {
            let AlgebraKind::Filter { condition: outer_cond } = &outer.kind else {
                return Ok(());
            };
            let AlgebraKind::Filter { condition: inner_cond } = &inner.kind else {
                return Ok(());
            };
            (
                outer_cond.clone(),
                inner_cond.clone(),
                inner.inputs[0],
                inner.trait_set.clone(),
                inner.row_type.clone(),
            )
        };

        let combined = RowExpression::and(vec![outer_cond, inner_cond])?;
        ctx.transform_to(
            AlgebraKind::Filter { condition: combined },
            vec![inner_input],
            inner_trait_set,
            inner_row_type,
        )?;
        Ok(())
    }
}

/// `Filter(Project(input, exprs), cond) -> Project(Filter(input, cond'),
/// exprs)`, with `cond'` the filter condition rewritten in terms of
/// `input`'s columns. Grounded on `datafusion-optimizer`'s `PushDownFilter`
/// family (filter predicates are evaluated as early as possible, below any
/// projection that doesn't need to run first).
#[derive(Debug)]
pub struct PushFilterThroughProject {
    pattern: OnceCell<Pattern>,
}

impl Default for PushFilterThroughProject {
    fn default() -> Self {
        Self::new()
    }
}

impl PushFilterThroughProject {
    pub fn new() -> Self {
        Self { pattern: OnceCell::new() }
    }
}

impl Rule for PushFilterThroughProject {
    fn name(&self) -> &str {
        "push_filter_through_project"
    }

    fn pattern(&self) -> &Pattern {
        self.pattern
            .get_or_init(|| Pattern::new(Operand::exact("Filter").with_positional_children(vec![Operand::exact("Project")])))
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, binding: &Binding) -> Result<()> {
        let filter = ctx.space().node(binding[0]);
        let project = ctx.space().node(binding[1]);
        let (filter_condition, filter_row_type, project_exprs, project_input, project_trait_set) = {
            let AlgebraKind::Filter { condition } = &filter.kind else {
                return Ok(());
            };
            let AlgebraKind::Project { exprs } = &project.kind else {
                return Ok(());
            };
            (
                condition.clone(),
                filter.row_type.clone(),
                exprs.clone(),
                project.inputs[0],
                project.trait_set.clone(),
            )
        };

        let Some(pushed_condition) = substitute_input_refs(&filter_condition, &project_exprs) else {
            // The predicate references a computed (non-passthrough) output
            // column; this rule only handles the column-rename case.
            return Ok(());
        };

        let input_row_type = ctx.space().row_type_of(project_input);
        let (pushed_filter, _) = ctx.intern(
            AlgebraKind::Filter {
                condition: pushed_condition,
            },
            vec![project_input],
            project_trait_set.clone(),
            input_row_type,
        )?;

        ctx.transform_to(
            AlgebraKind::Project { exprs: project_exprs },
            vec![pushed_filter],
            project_trait_set,
            filter_row_type,
        )?;
        Ok(())
    }
}

/// Rewrites every `InputRef(i)` in `expr` to `mapping[i]`. Returns `None` if
/// `expr` references an output column that isn't a plain passthrough of one
/// of `input`'s own columns (e.g. `a + b`), since such a reference can't be
/// expressed purely in terms of the input schema.
fn substitute_input_refs(expr: &RowExpression, mapping: &[RowExpression]) -> Option<RowExpression> {
    match expr {
        RowExpression::InputRef(i, _) => mapping.get(*i).cloned(),
        RowExpression::Literal(..) | RowExpression::LocalRef(..) | RowExpression::DynamicParam(..) | RowExpression::CorrelVariable(..) => {
            Some(expr.clone())
        }
        RowExpression::FieldAccess {
            target,
            field_index,
            field_name,
            data_type,
        } => substitute_input_refs(target, mapping).map(|target| RowExpression::FieldAccess {
            target: Box::new(target),
            field_index: *field_index,
            field_name: field_name.clone(),
            data_type: data_type.clone(),
        }),
        RowExpression::Call {
            operator,
            operands,
            data_type,
        } => {
            let mut rewritten = Vec::with_capacity(operands.len());
            for operand in operands {
                rewritten.push(substitute_input_refs(operand, mapping)?);
            }
            Some(RowExpression::Call {
                operator: operator.clone(),
                operands: rewritten,
                data_type: data_type.clone(),
            })
        }
    }
}

/// An implementation rule: converts a logical `Scan` (convention `NONE`)
/// into the same `Scan` under a named physical convention. Exists so
/// end-to-end tests can exercise convention insertion without depending on
/// a real storage adapter.
#[derive(Debug)]
pub struct ScanToConvention {
    pub convention: TraitManifestation,
    pattern: OnceCell<Pattern>,
}

impl ScanToConvention {
    pub fn new(convention: TraitManifestation) -> Self {
        Self {
            convention,
            pattern: OnceCell::new(),
        }
    }
}

impl Rule for ScanToConvention {
    fn name(&self) -> &str {
        "scan_to_convention"
    }

    fn pattern(&self) -> &Pattern {
        self.pattern.get_or_init(|| Pattern::new(Operand::exact("Scan")))
    }

    fn is_implementation_rule(&self) -> bool {
        true
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, binding: &Binding) -> Result<()> {
        let node = ctx.space().node(binding[0]);
        let AlgebraKind::Scan { table } = &node.kind else {
            return Ok(());
        };
        let table = table.clone();
        let row_type = node.row_type.clone();
        let mut trait_set = TraitSet::new(vec![none_convention()]);
        trait_set.set(crate::trait_def::CONVENTION_SLOT, self.convention.clone());
        ctx.transform_to(AlgebraKind::Scan { table }, vec![], trait_set, row_type)?;
        Ok(())
    }
}

/// Minimal lazily-initialized cell, since `Pattern` construction borrows
/// nothing but is awkward to rebuild on every `pattern()` call and these
/// rules otherwise carry no other state worth a `RefCell`.
#[derive(Debug)]
struct OnceCell<T>(std::cell::OnceCell<T>);

impl<T> OnceCell<T> {
    fn new() -> Self {
        Self(std::cell::OnceCell::new())
    }

    fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
        self.0.get_or_init(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Space;
    use crate::trait_def::{none_convention, TraitSet};
    use polystore_common::{DataType, Field, RowType, ScalarValue};
    use polystore_expr::Operator;

    fn row_type() -> polystore_common::RowTypeRef {
        RowType::new(vec![
            Field {
                name: "a".into(),
                data_type: DataType::Int64 { nullable: false },
            },
            Field {
                name: "b".into(),
                data_type: DataType::Int64 { nullable: false },
            },
        ])
    }

    fn none_trait_set() -> TraitSet {
        TraitSet::new(vec![none_convention()])
    }

    fn gt_zero(column: usize) -> RowExpression {
        RowExpression::call(
            Operator::gt(),
            vec![
                RowExpression::InputRef(column, DataType::Int64 { nullable: false }),
                RowExpression::literal(ScalarValue::Int64(Some(0))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn combine_filters_merges_condition() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        // Two independent, non-foldable predicates over different columns
        // so constant folding can't collapse the conjunction away.
        let inner_cond = gt_zero(1);
        let (inner_filter, _) = space
            .intern_new(
                AlgebraKind::Filter { condition: inner_cond },
                vec![scan],
                none_trait_set(),
                row_type(),
            )
            .unwrap();
        let outer_cond = gt_zero(0);
        let (outer_filter, _) = space
            .intern_new(
                AlgebraKind::Filter { condition: outer_cond },
                vec![inner_filter],
                none_trait_set(),
                row_type(),
            )
            .unwrap();

        let rule = CombineFilters::new();
        let outer_node = space.subset(outer_filter).members()[0];
        let inner_node = space.subset(inner_filter).members()[0];
        let binding = vec![outer_node, inner_node];
        let root_subset = space.subset_of_node(outer_node);
        let expected_row_type = space.row_type_of(root_subset);
        let mut ctx = RuleContext::new(&mut space, root_subset, expected_row_type);
        rule.apply(&mut ctx, &binding).unwrap();
        let produced = ctx.take_produced();
        assert_eq!(produced.len(), 1);

        let combined_node = space.subset(produced[0]).members()[0];
        match &space.node(combined_node).kind {
            AlgebraKind::Filter { condition } => {
                assert_eq!(condition.operands().len(), 2);
            }
            _ => panic!("expected Filter"),
        }
    }

    #[test]
    fn scan_to_convention_produces_physical_sibling() {
        let mut space = Space::new();
        let (scan, _) = space
            .intern_new(AlgebraKind::Scan { table: "T".into() }, vec![], none_trait_set(), row_type())
            .unwrap();
        let rule = ScanToConvention::new(TraitManifestation::new("JDBC"));
        let scan_node = space.subset(scan).members()[0];
        let root_subset = space.subset_of_node(scan_node);
        let expected_row_type = space.row_type_of(root_subset);
        let mut ctx = RuleContext::new(&mut space, root_subset, expected_row_type);
        rule.apply(&mut ctx, &vec![scan_node]).unwrap();
        let produced = ctx.take_produced();
        assert_eq!(produced.len(), 1);
        assert_eq!(space.set_of(produced[0]), space.set_of(scan));
    }
}
