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

//! The narrow port the executive calls to dispatch effects (spec §6),
//! grounded on the `pgwire::pg_server::SessionManager`-style boundary in
//! `examples/PierreNowak-risingwave/src/frontend/src/session.rs`: a small
//! object trait the engine holds by reference and calls exactly once per
//! outbound entry, with all protocol/transport concerns left to the
//! implementor.

use crate::node::NodeId;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Command {
    pub node: NodeId,
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub node: NodeId,
    pub pairs: Vec<(String, Value)>,
}

pub trait ExternalInterface {
    fn execute_command(&mut self, cmd: &Command);
    fn report_command_arbitration_failure(&mut self, cmd: &Command);
    fn invoke_abort(&mut self, cmd: &Command);
    fn execute_update(&mut self, upd: &Update);
    fn execute_assignment(&mut self, dest: &str, value: &Value);
    fn retract_assignment(&mut self, dest: &str);
}
