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

//! The six end-to-end scenarios from spec.md §8, driven black-box against
//! [`plexec::Executive`] through a recording [`ExternalInterface`].

use plexec::{
    Command, ExecListener, ExecResult, Executive, ExternalInterface, NodeState, NodeTransition,
    PlanNodeSpec, Update, Value,
};
use plexec::config::ExecutiveConfig;
use plexec::node::{Condition, FailureType, NodeOutcome, ResourceValue};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Installs an `EnvFilter`-driven subscriber once per test binary, so a run
/// with `RUST_LOG=plexec=trace` shows every macro-step's transitions; a
/// clean run stays silent.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default, Clone)]
struct Recording {
    commands: Vec<Command>,
    denied: Vec<Command>,
    aborts: Vec<Command>,
    updates: Vec<Update>,
    assignments: Vec<(String, Value)>,
}

#[derive(Clone, Default)]
struct RecordingInterface(Arc<Mutex<Recording>>);

impl RecordingInterface {
    fn new() -> Self {
        RecordingInterface::default()
    }

    fn snapshot(&self) -> Recording {
        self.0.lock().unwrap().clone()
    }
}

impl ExternalInterface for RecordingInterface {
    fn execute_command(&mut self, cmd: &Command) {
        self.0.lock().unwrap().commands.push(cmd.clone());
    }
    fn report_command_arbitration_failure(&mut self, cmd: &Command) {
        self.0.lock().unwrap().denied.push(cmd.clone());
    }
    fn invoke_abort(&mut self, cmd: &Command) {
        self.0.lock().unwrap().aborts.push(cmd.clone());
    }
    fn execute_update(&mut self, upd: &Update) {
        self.0.lock().unwrap().updates.push(upd.clone());
    }
    fn execute_assignment(&mut self, dest: &str, value: &Value) {
        self.0.lock().unwrap().assignments.push((dest.to_owned(), value.clone()));
    }
    fn retract_assignment(&mut self, _dest: &str) {}
}

#[derive(Default, Clone)]
struct TransitionLog(Arc<Mutex<Vec<NodeTransition>>>);

impl ExecListener for TransitionLog {
    fn on_transitions(&mut self, batch: &[NodeTransition]) {
        self.0.lock().unwrap().extend_from_slice(batch);
    }
    fn on_step_complete(&mut self, _cycle: u64) {}
}

fn new_executive(iface: RecordingInterface) -> Executive {
    init_tracing();
    Executive::new(ExecutiveConfig::default(), Box::new(iface))
}

/// Scenario 1: a single command with no gating conditions dispatches in the
/// first step and finishes once its handle resolves.
#[test]
fn simple_command_dispatches_and_finishes() {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface.clone());

    let root = exec
        .add_plan(PlanNodeSpec::command("Ping", "Ping", vec![]))
        .unwrap();
    assert_eq!(exec.node_state(root), NodeState::Inactive);

    exec.step().unwrap();
    assert_eq!(iface.snapshot().commands.len(), 1);
    assert_eq!(iface.snapshot().commands[0].name, "Ping");

    exec.command_handle_return(root, plexec::node::CommandHandleState::Success);
    exec.run_to_quiescence().unwrap();
    assert_eq!(exec.node_state(root), NodeState::Finished);
}

/// Scenario 2: two commands contend for the same resource at different
/// priorities; the loser is denied within the same step that admits the
/// winner.
#[test]
fn resource_denial_resolves_in_one_step() {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface.clone());
    exec.load_resource_hierarchy("armA 1.0\n").unwrap();

    let n1 = exec
        .add_plan(
            PlanNodeSpec::command("C1", "DoA", vec![]).with_resource(ResourceValue::new("armA", 10)),
        )
        .unwrap();
    let n2 = exec
        .add_plan(
            PlanNodeSpec::command("C2", "DoB", vec![]).with_resource(ResourceValue::new("armA", 20)),
        )
        .unwrap();

    exec.step().unwrap();

    let snap = iface.snapshot();
    assert_eq!(snap.commands.len(), 1, "only the higher-priority command is dispatched");
    assert_eq!(snap.commands[0].name, "DoA");
    assert_eq!(snap.denied.len(), 1, "the loser is reported denied");
    assert_eq!(snap.denied[0].name, "DoB");

    assert_eq!(exec.node_state(n1), NodeState::Executing);
    assert_eq!(exec.node_state(n2), NodeState::IterationEnded);
    assert_eq!(exec.plan().get(n2).outcome(), Some(NodeOutcome::Failure));
    assert_eq!(exec.plan().get(n2).failure_type(), Some(FailureType::Denied));
}

/// Scenario 3: two commands share a mutex; the second stays in Waiting
/// until the first releases it, then moves to Executing on its own.
#[test]
fn mutex_contention_serializes_two_commands() {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface.clone());

    let n1 = exec
        .add_plan(PlanNodeSpec::command("N1", "Act", vec![]).with_mutex("M"))
        .unwrap();
    let n2 = exec
        .add_plan(PlanNodeSpec::command("N2", "Act", vec![]).with_mutex("M"))
        .unwrap();

    exec.step().unwrap();
    assert_eq!(exec.node_state(n1), NodeState::Executing);
    assert_eq!(exec.node_state(n2), NodeState::Waiting);
    assert_eq!(iface.snapshot().commands.len(), 1);

    exec.command_handle_return(n1, plexec::node::CommandHandleState::Success);
    exec.step().unwrap();

    assert_eq!(exec.node_state(n1), NodeState::Finished);
    assert_eq!(exec.node_state(n2), NodeState::Executing);
    assert_eq!(iface.snapshot().commands.len(), 2, "N2 dispatches once it holds M");
}

/// Scenario 4: a list node's child only becomes eligible after the parent
/// is Executing, and the parent only finishes once the child does.
#[test]
fn parent_propagation_gates_child_then_waits_on_it() {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface);
    let log = TransitionLog::default();
    exec.set_listener(Box::new(log.clone()));

    let child = PlanNodeSpec::empty("Child");
    let root = exec.add_plan(PlanNodeSpec::list("List", vec![child])).unwrap();
    let child_id = exec.plan().get(root).children()[0];

    assert_eq!(exec.node_state(root), NodeState::Inactive);

    for _ in 0..10 {
        if exec.node_state(root) == NodeState::Finished {
            break;
        }
        exec.step().unwrap();
    }

    assert_eq!(exec.node_state(root), NodeState::Finished);
    assert_eq!(exec.node_state(child_id), NodeState::Finished);

    let history = log.0.lock().unwrap();
    let child_first_waiting = history
        .iter()
        .position(|t| t.node == child_id && t.new_state == NodeState::Waiting)
        .expect("child reaches Waiting");
    let parent_first_executing = history
        .iter()
        .position(|t| t.node == root && t.new_state == NodeState::Executing)
        .expect("parent reaches Executing");
    assert!(
        parent_first_executing < child_first_waiting,
        "child must not become eligible before its parent is Executing"
    );
}

/// Scenario 5: a node with a repeat condition runs multiple iterations
/// before finishing.
#[test]
fn repeat_condition_drives_multiple_iterations() {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface.clone());

    exec.exprs_mut().variables.set("keep_going", Value::Bool(true));
    let repeat_expr = exec
        .exprs_mut()
        .alloc(plexec::expr::ExprKind::Variable("keep_going".to_string()));

    let root = exec
        .add_plan(
            PlanNodeSpec::command("Loop", "Step", vec![])
                .with_condition(Condition::Repeat, repeat_expr),
        )
        .unwrap();

    // First iteration: dispatches, then loops straight back around to a
    // second Executing within the same step once the command completes.
    exec.step().unwrap();
    assert_eq!(iface.snapshot().commands.len(), 1);
    exec.command_handle_return(root, plexec::node::CommandHandleState::Success);
    exec.step().unwrap();

    assert_eq!(exec.node_state(root), NodeState::Executing, "repeat condition starts it over");
    assert_eq!(exec.plan().get(root).iteration(), 1);
    assert_eq!(iface.snapshot().commands.len(), 2, "second iteration dispatched its own command");

    // Second iteration completes; clearing the repeat condition lets it
    // finish instead of looping a third time.
    exec.command_handle_return(root, plexec::node::CommandHandleState::Success);
    exec.assign_variable("keep_going", Value::Bool(false));
    exec.step().unwrap();

    assert_eq!(exec.node_state(root), NodeState::Finished);
    assert_eq!(iface.snapshot().commands.len(), 2, "no third iteration is dispatched");
}

/// Scenario 6: a consumable resource claimed through a parent in the
/// hierarchy blocks a sibling claiming a child resource directly.
#[test]
fn hierarchical_resource_blocks_through_parent_child_link() -> ExecResult<()> {
    let iface = RecordingInterface::new();
    let mut exec = new_executive(iface.clone());
    exec.load_resource_hierarchy("bus 2.0 1.0 armA 1.0 armB\n")?;

    let n1 = exec
        .add_plan(PlanNodeSpec::command("Bus", "MoveBus", vec![]).with_resource(ResourceValue::new("bus", 1)))?;
    exec.step()?;
    assert_eq!(exec.node_state(n1), NodeState::Executing);
    assert_eq!(iface.snapshot().commands.len(), 1);

    let n2 = exec
        .add_plan(PlanNodeSpec::command("Arm", "MoveArm", vec![]).with_resource(ResourceValue::new("armA", 1)))?;
    exec.step()?;

    assert_eq!(
        exec.node_state(n2),
        NodeState::IterationEnded,
        "armA is already fully reserved via bus's child weighting"
    );
    assert_eq!(iface.snapshot().denied.len(), 1);
    assert_eq!(iface.snapshot().denied[0].name, "MoveArm");
    Ok(())
}
