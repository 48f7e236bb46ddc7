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

//! `ScalarValue`: a typed constant, the payload of `RowExpression::Literal`.
//! Modeled on `datafusion_common::ScalarValue`'s pattern of one variant per
//! supported `DataType`, including an explicit null per type so that
//! `ScalarValue::Int64(None)` is distinguishable from `ScalarValue::Utf8(None)`.

use crate::types::DataType;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Utf8(Option<String>),
    Date32(Option<i32>),
    Null,
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        match self {
            ScalarValue::Boolean(v) => v.is_none(),
            ScalarValue::Int32(v) => v.is_none(),
            ScalarValue::Int64(v) => v.is_none(),
            ScalarValue::Float64(v) => v.is_none(),
            ScalarValue::Utf8(v) => v.is_none(),
            ScalarValue::Date32(v) => v.is_none(),
            ScalarValue::Null => true,
        }
    }

    /// The type this value would be given if embedded in a `Literal`.
    /// A concrete (non-null) value is typed non-nullable; the corresponding
    /// `null` of the same variant is typed nullable, and `ScalarValue::Null`
    /// is the untyped `DataType::Null`.
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Boolean(v) => DataType::Boolean {
                nullable: v.is_none(),
            },
            ScalarValue::Int32(v) => DataType::Int32 {
                nullable: v.is_none(),
            },
            ScalarValue::Int64(v) => DataType::Int64 {
                nullable: v.is_none(),
            },
            ScalarValue::Float64(v) => DataType::Float64 {
                nullable: v.is_none(),
            },
            ScalarValue::Utf8(v) => DataType::Utf8 {
                nullable: v.is_none(),
            },
            ScalarValue::Date32(v) => DataType::Date32 {
                nullable: v.is_none(),
            },
            ScalarValue::Null => DataType::Null,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => *v,
            _ => None,
        }
    }

    /// Total order over literal/literal comparisons used by the
    /// simplifier's comparison folding. Returns `None` when either side is
    /// null (callers handle null propagation separately) or the types are
    /// not comparable.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self, other) {
            (ScalarValue::Boolean(Some(a)), ScalarValue::Boolean(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Int32(Some(a)), ScalarValue::Int32(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Int64(Some(a)), ScalarValue::Int64(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Float64(Some(a)), ScalarValue::Float64(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Utf8(Some(a)), ScalarValue::Utf8(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Date32(Some(a)), ScalarValue::Date32(Some(b))) => a.partial_cmp(b),
            (ScalarValue::Int32(Some(a)), ScalarValue::Int64(Some(b))) => (*a as i64).partial_cmp(b),
            (ScalarValue::Int64(Some(a)), ScalarValue::Int32(Some(b))) => a.partial_cmp(&(*b as i64)),
            (ScalarValue::Int64(Some(a)), ScalarValue::Float64(Some(b))) => {
                (*a as f64).partial_cmp(b)
            }
            (ScalarValue::Float64(Some(a)), ScalarValue::Int64(Some(b))) => {
                a.partial_cmp(&(*b as f64))
            }
            _ => None,
        }
    }

    /// Null of the same "family" as `data_type`, used when null propagation
    /// needs to manufacture a typed null literal.
    pub fn null_of(data_type: &DataType) -> ScalarValue {
        match data_type {
            DataType::Null => ScalarValue::Null,
            DataType::Boolean { .. } => ScalarValue::Boolean(None),
            DataType::Int32 { .. } => ScalarValue::Int32(None),
            DataType::Int64 { .. } => ScalarValue::Int64(None),
            DataType::Float64 { .. } => ScalarValue::Float64(None),
            DataType::Utf8 { .. } => ScalarValue::Utf8(None),
            DataType::Date32 { .. } => ScalarValue::Date32(None),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Boolean(None)
            | ScalarValue::Int32(None)
            | ScalarValue::Int64(None)
            | ScalarValue::Float64(None)
            | ScalarValue::Utf8(None)
            | ScalarValue::Date32(None)
            | ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Boolean(Some(v)) => write!(f, "{v}"),
            ScalarValue::Int32(Some(v)) => write!(f, "{v}"),
            ScalarValue::Int64(Some(v)) => write!(f, "{v}"),
            ScalarValue::Float64(Some(v)) => write!(f, "{v}"),
            ScalarValue::Utf8(Some(v)) => write!(f, "'{v}'"),
            ScalarValue::Date32(Some(v)) => write!(f, "DATE'{v}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_detected_per_variant() {
        assert!(ScalarValue::Int64(None).is_null());
        assert!(!ScalarValue::Int64(Some(1)).is_null());
        assert!(ScalarValue::Null.is_null());
    }

    #[test]
    fn compare_cross_numeric_widening() {
        let a = ScalarValue::Int32(Some(1));
        let b = ScalarValue::Int64(Some(1));
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }

    #[test]
    fn compare_with_null_is_none() {
        assert_eq!(
            ScalarValue::Int64(Some(1)).compare(&ScalarValue::Int64(None)),
            None
        );
    }
}
