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

//! Plan execution core: a quiescence-loop scheduler that drives a tree of
//! plan nodes through their lifecycle in response to condition changes,
//! dispatches commands/assignments/updates to an external interface, and
//! arbitrates shared resources (mutexes, hierarchical command budgets)
//! among concurrently eligible nodes.
//!
//! The crate is organized the way the corpus this was grounded on splits a
//! single logical subsystem into focused modules: [`expr`] is the
//! expression graph that drives scheduling, [`node`] is the per-vertex
//! state machine and its arena storage, [`mutex`] and [`resource`] are the
//! two shared-resource subsystems, and [`executive`] ties all of the above
//! into the actual scheduler.

pub mod config;
pub mod error;
pub mod executive;
pub mod expr;
pub mod interface;
pub mod listener;
pub mod mutex;
pub mod node;
pub mod resource;
pub mod value;

pub use error::{ExecError, ExecResult};
pub use executive::{Executive, NodeBodySpec, PlanNodeSpec, SharedExecutive};
pub use interface::{Command, ExternalInterface, Update};
pub use listener::{ExecListener, NodeTransition, NullListener};
pub use node::{NodeId, NodeState};
pub use value::Value;
