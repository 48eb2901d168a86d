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

//! The single pluggable listener hook (spec §6): notified once per
//! micro-batch with every transition in that batch, and once per
//! macro-step with the cycle number.

use crate::node::{NodeId, NodeState};

#[derive(Debug, Clone, Copy)]
pub struct NodeTransition {
    pub node: NodeId,
    pub old_state: NodeState,
    pub new_state: NodeState,
}

pub trait ExecListener {
    fn on_transitions(&mut self, batch: &[NodeTransition]);
    fn on_step_complete(&mut self, cycle: u64);
}

/// Does nothing; the default when no listener is attached.
#[derive(Default)]
pub struct NullListener;

impl ExecListener for NullListener {
    fn on_transitions(&mut self, _batch: &[NodeTransition]) {}
    fn on_step_complete(&mut self, _cycle: u64) {}
}
