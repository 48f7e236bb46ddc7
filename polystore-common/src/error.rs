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

//! The single error type returned by every crate in this workspace, in the
//! style of `datafusion_common::DataFusionError`: one enum, one `Result`
//! alias, and a handful of `_err!` constructor macros so call sites read as
//! `return plan_err!("...")` instead of building variants by hand.

use std::fmt;

/// Why a planner run stopped without reaching a fixpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundReason {
    /// The caller-supplied iteration cap was reached.
    IterationLimit,
    /// The caller-supplied wall-clock deadline fired.
    Deadline,
}

impl fmt::Display for BoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundReason::IterationLimit => write!(f, "iteration limit reached"),
            BoundReason::Deadline => write!(f, "deadline reached"),
        }
    }
}

/// Error kinds shared across the row-expression simplifier and the
/// optimizer. See `spec.md` §7 for the propagation policy each variant
/// implements.
#[derive(Debug, thiserror::Error)]
pub enum PolystoreError {
    /// Malformed expression or node at entry: bad type inference, an
    /// operand-count mismatch, a negative index.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No member of the goal subset satisfies the required convention.
    #[error("no implementation found satisfying the required trait set")]
    NoImplementationFound,

    /// A rule produced a node whose row type differs from the node it
    /// replaced. Always fatal to the run.
    #[error("incompatible rewrite: {0}")]
    IncompatibleRewrite(String),

    /// A rule action raised while executing; the planner aborts the run.
    #[error("rule {rule} failed: {message}")]
    RuleFailure {
        /// Name of the rule whose action raised.
        rule: String,
        /// The underlying failure message.
        message: String,
    },

    /// Iteration limit or deadline reached. Not necessarily fatal — callers
    /// may still consume the best plan known so far.
    #[error("bound reached: {0}")]
    Bound(BoundReason),

    /// Cancellation was observed via the caller-supplied flag.
    #[error("planning run was cancelled")]
    Cancelled,

    /// A violated internal invariant. Should never surface from correct
    /// rule/trait-def authors; indicates a bug in this crate.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the workspace.
pub type Result<T, E = PolystoreError> = std::result::Result<T, E>;

/// Build a `PolystoreError::InvalidInput` and return it, `format!`-style.
#[macro_export]
macro_rules! invalid_input_err {
    ($($arg:tt)*) => {
        Err($crate::PolystoreError::InvalidInput(format!($($arg)*)))
    };
}

/// Build a `PolystoreError::Internal` and return it, `format!`-style.
#[macro_export]
macro_rules! internal_err {
    ($($arg:tt)*) => {
        Err($crate::PolystoreError::Internal(format!($($arg)*)))
    };
}

/// Build a `PolystoreError::IncompatibleRewrite` and return it, `format!`-style.
#[macro_export]
macro_rules! incompatible_rewrite_err {
    ($($arg:tt)*) => {
        Err($crate::PolystoreError::IncompatibleRewrite(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_reason_display() {
        assert_eq!(
            BoundReason::IterationLimit.to_string(),
            "iteration limit reached"
        );
        assert_eq!(BoundReason::Deadline.to_string(), "deadline reached");
    }

    #[test]
    fn invalid_input_macro_builds_expected_variant() {
        let err: Result<()> = invalid_input_err!("bad thing: {}", 42);
        match err {
            Err(PolystoreError::InvalidInput(msg)) => assert_eq!(msg, "bad thing: 42"),
            _ => panic!("expected InvalidInput"),
        }
    }
}
