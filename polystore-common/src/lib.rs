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

//! Shared scalar values, row types and the error kind every other crate in
//! this workspace returns. Plays the role `datafusion-common` plays for
//! DataFusion: the one crate everything else depends on, with no
//! dependencies of its own back into the optimizer.

pub mod error;
pub mod scalar;
pub mod types;

pub use error::{BoundReason, PolystoreError, Result};
pub use scalar::ScalarValue;
pub use types::{DataType, Field, RowType, RowTypeRef};
