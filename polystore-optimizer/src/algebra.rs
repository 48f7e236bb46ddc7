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

//! The algebra IR (`spec.md` §3, §9 "Polymorphism over node kinds"): a
//! closed tagged sum type for the built-in relational kinds, plus a
//! registration table slot (`Custom`) for adapter-provided physical kinds.
//!
//! Each `AlgebraNode` carries its digest, trait set, and input handles as a
//! flat struct rather than per-kind structs implementing a shared trait —
//! `spec.md` §9 asks for a function table keyed by kind instead of visitor
//! double-dispatch, and a single struct with a kind-tagged payload is the
//! natural Rust shape for that.

use crate::space::SubsetId;
use crate::trait_def::{TraitManifestation, TraitSet};
use polystore_common::{Result, RowTypeRef, ScalarValue};
use polystore_expr::{simplify, PredicateContext, RowExpression, UnknownAs};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOperation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ModifyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModifyOperation::Insert => "INSERT",
            ModifyOperation::Update => "UPDATE",
            ModifyOperation::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: RowExpression,
    pub ascending: bool,
}

/// The kind-specific payload of a node. `Scan` and `Values` are the only
/// kinds with no input subsets; every other built-in kind's operand count
/// is fixed by its variant (`Join` always has exactly two).
#[derive(Debug, Clone, PartialEq)]
pub enum AlgebraKind {
    Scan {
        table: String,
    },
    Filter {
        condition: RowExpression,
    },
    Project {
        exprs: Vec<RowExpression>,
    },
    Join {
        condition: RowExpression,
        join_type: JoinType,
    },
    Aggregate {
        group_exprs: Vec<RowExpression>,
        agg_exprs: Vec<RowExpression>,
    },
    Sort {
        keys: Vec<SortKey>,
    },
    Union {
        all: bool,
    },
    Values {
        rows: Vec<Vec<ScalarValue>>,
    },
    Modify {
        operation: ModifyOperation,
        target: String,
    },
    /// Graph/document pattern match, the one kind a polystore's non-SQL
    /// collaborators (document, graph adapters) need that a pure relational
    /// algebra has no analogue for.
    Match {
        pattern: String,
    },
    /// A trait-conversion node synthesized by `TraitDef::convert`
    /// (`spec.md` §4.2): not produced by any rule pattern directly.
    Converter {
        from: TraitManifestation,
        to: TraitManifestation,
    },
    /// Escape hatch for adapter-registered physical kinds (`spec.md` §9:
    /// "a closed set of algebra kinds plus adapter-provided physical kinds
    /// via a registration table").
    Custom {
        name: String,
        payload: Vec<RowExpression>,
    },
}

impl AlgebraKind {
    pub fn name(&self) -> &str {
        match self {
            AlgebraKind::Scan { .. } => "Scan",
            AlgebraKind::Filter { .. } => "Filter",
            AlgebraKind::Project { .. } => "Project",
            AlgebraKind::Join { .. } => "Join",
            AlgebraKind::Aggregate { .. } => "Aggregate",
            AlgebraKind::Sort { .. } => "Sort",
            AlgebraKind::Union { .. } => "Union",
            AlgebraKind::Values { .. } => "Values",
            AlgebraKind::Modify { .. } => "Modify",
            AlgebraKind::Match { .. } => "Match",
            AlgebraKind::Converter { .. } => "Converter",
            AlgebraKind::Custom { name, .. } => name,
        }
    }

    /// The `RowExpression` operands this kind carries directly, used by the
    /// digest computation and by rule operand matching over expression
    /// shape. Does not include input subsets.
    pub fn expr_operands(&self) -> Vec<&RowExpression> {
        match self {
            AlgebraKind::Filter { condition } => vec![condition],
            AlgebraKind::Project { exprs } => exprs.iter().collect(),
            AlgebraKind::Join { condition, .. } => vec![condition],
            AlgebraKind::Aggregate { group_exprs, agg_exprs } => {
                group_exprs.iter().chain(agg_exprs.iter()).collect()
            }
            AlgebraKind::Sort { keys } => keys.iter().map(|k| &k.expr).collect(),
            AlgebraKind::Custom { payload, .. } => payload.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Rebuilds this kind with every `RowExpression` operand replaced by its
    /// simplified form, so two nodes whose predicates are merely syntactic
    /// variants of the same canonical expression hash identically
    /// (`spec.md` §8 scenario 4: "two independently-registered nodes whose
    /// predicates simplify to the same canonical form ... merge"). Digest
    /// computation must only ever see canonicalized kinds.
    pub fn canonicalize(&self) -> Result<AlgebraKind> {
        let mode = UnknownAs::Unknown;
        let ctx = PredicateContext::new();
        let simplify_one = |e: &RowExpression| simplify(e, mode, &ctx);

        Ok(match self {
            AlgebraKind::Filter { condition } => AlgebraKind::Filter {
                condition: simplify_one(condition)?,
            },
            AlgebraKind::Project { exprs } => AlgebraKind::Project {
                exprs: exprs.iter().map(simplify_one).collect::<Result<Vec<_>>>()?,
            },
            AlgebraKind::Join { condition, join_type } => AlgebraKind::Join {
                condition: simplify_one(condition)?,
                join_type: *join_type,
            },
            AlgebraKind::Aggregate { group_exprs, agg_exprs } => AlgebraKind::Aggregate {
                group_exprs: group_exprs.iter().map(simplify_one).collect::<Result<Vec<_>>>()?,
                agg_exprs: agg_exprs.iter().map(simplify_one).collect::<Result<Vec<_>>>()?,
            },
            AlgebraKind::Sort { keys } => AlgebraKind::Sort {
                keys: keys
                    .iter()
                    .map(|k| {
                        Ok(SortKey {
                            expr: simplify_one(&k.expr)?,
                            ascending: k.ascending,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
            AlgebraKind::Custom { name, payload } => AlgebraKind::Custom {
                name: name.clone(),
                payload: payload.iter().map(simplify_one).collect::<Result<Vec<_>>>()?,
            },
            other => other.clone(),
        })
    }
}

impl fmt::Display for AlgebraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgebraKind::Scan { table } => write!(f, "Scan[{table}]"),
            AlgebraKind::Filter { condition } => write!(f, "Filter[{condition}]"),
            AlgebraKind::Project { exprs } => {
                write!(f, "Project[{}]", exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))
            }
            AlgebraKind::Join { condition, join_type } => write!(f, "Join[{join_type} {condition}]"),
            AlgebraKind::Aggregate { group_exprs, agg_exprs } => write!(
                f,
                "Aggregate[group=({}), agg=({})]",
                group_exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "),
                agg_exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
            ),
            AlgebraKind::Sort { keys } => write!(
                f,
                "Sort[{}]",
                keys.iter()
                    .map(|k| format!("{} {}", k.expr, if k.ascending { "ASC" } else { "DESC" }))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            AlgebraKind::Union { all } => write!(f, "Union[all={all}]"),
            AlgebraKind::Values { rows } => write!(f, "Values[{} rows]", rows.len()),
            AlgebraKind::Modify { operation, target } => write!(f, "Modify[{operation} {target}]"),
            AlgebraKind::Match { pattern } => write!(f, "Match[{pattern}]"),
            AlgebraKind::Converter { from, to } => write!(f, "Converter[{from}->{to}]"),
            AlgebraKind::Custom { name, .. } => write!(f, "{name}"),
        }
    }
}

/// A single interned relational node. Carries its digest for
/// deduplication, its trait set, and its inputs by `Subset` handle — never
/// a concrete node (`spec.md` §3: "an ordered list of input handles").
#[derive(Debug, Clone)]
pub struct AlgebraNode {
    pub digest: String,
    pub kind: AlgebraKind,
    pub trait_set: TraitSet,
    pub inputs: Vec<SubsetId>,
    pub row_type: RowTypeRef,
}

impl fmt::Display for AlgebraNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}
