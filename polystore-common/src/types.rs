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

//! A small, self-contained type system: nullability is carried on
//! `DataType` itself (`DataType::nullable()`), mirroring how Calcite-derived
//! optimizers track three-valued-logic nullability directly on the type
//! rather than as a side table.

use std::fmt;
use std::sync::Arc;

/// Scalar data types a `RowExpression` can be typed with. Nullability is a
/// first-class bit on every variant rather than a wrapper, so
/// `DataType::Int64 { nullable: true }` and `Int64 { nullable: false }` are
/// distinct types that the simplifier's null-propagation rules key off of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean { nullable: bool },
    Int32 { nullable: bool },
    Int64 { nullable: bool },
    Float64 { nullable: bool },
    Utf8 { nullable: bool },
    Date32 { nullable: bool },
}

impl DataType {
    /// Whether a value of this type may be `NULL`.
    pub fn is_nullable(&self) -> bool {
        match self {
            DataType::Null => true,
            DataType::Boolean { nullable }
            | DataType::Int32 { nullable }
            | DataType::Int64 { nullable }
            | DataType::Float64 { nullable }
            | DataType::Utf8 { nullable }
            | DataType::Date32 { nullable } => *nullable,
        }
    }

    /// Return the same type with the requested nullability.
    pub fn with_nullable(&self, nullable: bool) -> DataType {
        match self {
            DataType::Null => DataType::Null,
            DataType::Boolean { .. } => DataType::Boolean { nullable },
            DataType::Int32 { .. } => DataType::Int32 { nullable },
            DataType::Int64 { .. } => DataType::Int64 { nullable },
            DataType::Float64 { .. } => DataType::Float64 { nullable },
            DataType::Utf8 { .. } => DataType::Utf8 { nullable },
            DataType::Date32 { .. } => DataType::Date32 { nullable },
        }
    }

    /// True for numeric types that total-order and widen per
    /// `simplify(..)`'s literal-comparison folding.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 { .. } | DataType::Int64 { .. } | DataType::Float64 { .. }
        )
    }

    /// Widening rank used by `isLosslessCast`: a cast from a lower rank to a
    /// higher rank of the same family never loses information.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Int32 { .. } => Some(0),
            DataType::Int64 { .. } => Some(1),
            DataType::Float64 { .. } => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, nullable) = match self {
            DataType::Null => ("NULL", true),
            DataType::Boolean { nullable } => ("BOOLEAN", *nullable),
            DataType::Int32 { nullable } => ("INT32", *nullable),
            DataType::Int64 { nullable } => ("INT64", *nullable),
            DataType::Float64 { nullable } => ("FLOAT64", *nullable),
            DataType::Utf8 { nullable } => ("UTF8", *nullable),
            DataType::Date32 { nullable } => ("DATE32", *nullable),
        };
        if nullable {
            write!(f, "{name}")
        } else {
            write!(f, "{name} NOT NULL")
        }
    }
}

/// One named, typed column of a `RowType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// The row type ("schema") of an `AlgebraNode`'s output, or the type of the
/// surrounding row a `RowExpression` is evaluated against. Cheap to clone:
/// shared via `Arc` the way `datafusion_common::DFSchemaRef` wraps a
/// `DFSchema`.
pub type RowTypeRef = Arc<RowType>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowType {
    fields: Vec<Field>,
}

impl RowType {
    pub fn new(fields: Vec<Field>) -> RowTypeRef {
        Arc::new(RowType { fields })
    }

    pub fn empty() -> RowTypeRef {
        Arc::new(RowType { fields: vec![] })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Two row types are compatible up to nullability/field-name
    /// harmonization per the `Set` invariant in `spec.md` §3: same arity,
    /// same base (non-nullable) data type per position.
    pub fn compatible_with(&self, other: &RowType) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|(a, b)| a.data_type.with_nullable(true) == b.data_type.with_nullable(true))
    }
}
