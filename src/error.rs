// Copyright 2026 The plexec Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error kinds for the plan execution core.
//!
//! Mirrors the closed-enum-plus-context split the corpus uses elsewhere:
//! a small set of error *kinds* carried by one error type, rather than a
//! `Box<dyn Error>` grab bag. Plan and interface errors are not propagated
//! out of [`crate::executive::Executive::step`]; they are recorded on the
//! offending node and the step continues. Only [`ExecError::Invariant`] and
//! [`ExecError::Configuration`] ever escape `step()`/load calls.

use crate::node::NodeId;
use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("plan error on node {node:?}: {detail}")]
    Plan { node: NodeId, detail: PlanErrorKind },

    #[error("interface error for command on node {command:?}: {detail}")]
    Interface {
        command: NodeId,
        detail: InterfaceErrorKind,
    },

    /// Fatal: a queue-status/queue-membership mismatch, a release of an
    /// unheld mutex, or a transition from a state with no such outgoing
    /// edge. The macro-step in progress is abandoned.
    #[error("internal invariant violation: {0}")]
    Invariant(String),

    /// Malformed resource hierarchy file or plan tree; the load is
    /// rejected without mutating executive state.
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanErrorKind {
    #[error("precondition false on entry to Executing")]
    PreConditionFalse,
    #[error("invariant condition false while Executing")]
    InvariantFalse,
    #[error("mutex '{0}' already held by this node")]
    MutexAlreadyHeld(String),
    #[error("required expression value is Unknown")]
    ValueUnknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceErrorKind {
    #[error("invalid command handle returned by external interface")]
    InvalidHandle,
    #[error("unknown value returned where a typed value was required")]
    UnknownValue,
    #[error("command denied by resource arbiter")]
    ArbitrationDenied,
}
