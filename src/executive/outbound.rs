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

//! The five outbound queues drained once per macro-step, in the fixed order
//! spec §4.5 step 4 gives: assignments to execute, assignments to retract,
//! commands, command aborts, updates.

use crate::node::NodeId;
use crate::value::Value;

#[derive(Default)]
pub struct OutboundQueues {
    pub assignments_execute: Vec<(String, Value)>,
    /// Never populated by this crate's current scheduling semantics (no
    /// transition in spec §4.4's table triggers a retraction), but kept as
    /// a real queue so the drain order in `flush_outbound` matches spec §6
    /// exactly if a future node kind needs it.
    pub assignments_retract: Vec<String>,
    pub commands_execute: Vec<NodeId>,
    pub commands_denied: Vec<NodeId>,
    pub commands_abort: Vec<NodeId>,
    pub updates_execute: Vec<NodeId>,
}

impl OutboundQueues {
    pub fn is_empty(&self) -> bool {
        self.assignments_execute.is_empty()
            && self.assignments_retract.is_empty()
            && self.commands_execute.is_empty()
            && self.commands_denied.is_empty()
            && self.commands_abort.is_empty()
            && self.updates_execute.is_empty()
    }
}
