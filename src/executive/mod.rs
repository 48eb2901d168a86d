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

//! The scheduler (spec §4.5), grounded on the `TaskExecution`/`TaskManager`
//! split in `examples/PierreNowak-risingwave/rust/server/src/task/task.rs`:
//! one owner object holds the mutable shared state (here, the plan arena and
//! four queues) and a thin `SharedExecutive` wrapper exposes the one
//! thread-safe entry point external callbacks are allowed to use.

mod outbound;
mod plan_spec;

pub use plan_spec::{NodeBodySpec, PlanNodeSpec};

use crate::config::ExecutiveConfig;
use crate::error::{ExecError, ExecResult, InterfaceErrorKind, PlanErrorKind};
use crate::expr::ExprArena;
use crate::interface::{Command, ExternalInterface};
use crate::listener::{ExecListener, NodeTransition, NullListener};
use crate::mutex::MutexRegistry;
use crate::node::transition::{destination, outcome_for_transition, Destination};
use crate::node::{FailureType, NodeBody, NodeId, NodeOutcome, NodeState, PlanArena, QueueStatus};
use crate::resource::{CommandRequest, ResourceArbiter, ResourceHierarchy};
use outbound::OutboundQueues;
use std::collections::{HashMap, VecDeque};

/// Owns the plan arena, the expression graph, the mutex registry, the
/// resource arbiter and the four scheduling queues (spec §2, §4.5).
pub struct Executive {
    plan: PlanArena,
    exprs: ExprArena,
    mutexes: MutexRegistry,
    arbiter: ResourceArbiter,
    interface: Box<dyn ExternalInterface>,
    listener: Box<dyn ExecListener>,
    config: ExecutiveConfig,

    roots: Vec<NodeId>,
    libraries: HashMap<String, PlanNodeSpec>,

    candidate_queue: VecDeque<NodeId>,
    pending_queue: VecDeque<NodeId>,
    transition_queue: VecDeque<NodeId>,
    finished_roots_queue: VecDeque<NodeId>,
    outbound: OutboundQueues,

    cycle: u64,
    sequence_counter: u64,
    poisoned: bool,
}

impl Executive {
    pub fn new(config: ExecutiveConfig, interface: Box<dyn ExternalInterface>) -> Self {
        Executive {
            plan: PlanArena::new(),
            exprs: ExprArena::new(),
            mutexes: MutexRegistry::new(),
            arbiter: ResourceArbiter::empty(),
            interface,
            listener: Box::new(NullListener),
            config,
            roots: Vec::new(),
            libraries: HashMap::new(),
            candidate_queue: VecDeque::new(),
            pending_queue: VecDeque::new(),
            transition_queue: VecDeque::new(),
            finished_roots_queue: VecDeque::new(),
            outbound: OutboundQueues::default(),
            cycle: 0,
            sequence_counter: 0,
            poisoned: false,
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn ExecListener>) {
        self.listener = listener;
    }

    pub fn exprs_mut(&mut self) -> &mut ExprArena {
        &mut self.exprs
    }

    pub fn exprs(&self) -> &ExprArena {
        &self.exprs
    }

    pub fn plan(&self) -> &PlanArena {
        &self.plan
    }

    pub fn node_state(&self, id: NodeId) -> NodeState {
        self.plan.get(id).state()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// `true` once `step()` has returned a fatal [`ExecError::Invariant`];
    /// the executive remains readable for diagnostics but must not be
    /// stepped again (spec §7).
    pub fn poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn load_resource_hierarchy(&mut self, text: &str) -> ExecResult<()> {
        self.arbiter = ResourceArbiter::new(ResourceHierarchy::parse(text)?);
        Ok(())
    }

    pub fn add_library(&mut self, name: impl Into<String>, root: PlanNodeSpec) {
        self.libraries.insert(name.into(), root);
    }

    /// Builds `root` into the arena, activates it, and enqueues it as a
    /// candidate (spec §3 Lifecycle: "activated at birth").
    pub fn add_plan(&mut self, root: PlanNodeSpec) -> ExecResult<NodeId> {
        let id = self.build_node(root, None)?;
        self.roots.push(id);
        Ok(id)
    }

    fn build_node(&mut self, spec: PlanNodeSpec, parent: Option<NodeId>) -> ExecResult<NodeId> {
        let node_type = spec.node_type;
        let (body, child_specs) = spec.body.into_body_and_children(&self.libraries)?;
        let id = self.plan.insert(|id| {
            let mut node = crate::node::Node::new(id, spec.node_id.clone(), node_type, body, parent);
            for (cond, expr) in &spec.conditions {
                node.conditions_mut().set(*cond, *expr);
            }
            node.set_mutexes(spec.mutexes.clone());
            node
        });

        match self.plan.get(id).node_type() {
            crate::node::NodeType::List => {
                let mut children = Vec::with_capacity(child_specs.len());
                for child in child_specs {
                    children.push(self.build_node(child, Some(id))?);
                }
                if let NodeBody::List { children: slot } = self.plan.get_mut(id).body_mut() {
                    *slot = children;
                }
            }
            crate::node::NodeType::LibraryCall => {
                let child_spec = child_specs.into_iter().next().ok_or_else(|| {
                    ExecError::Configuration(format!("library call node {id} has no child"))
                })?;
                let child_id = self.build_node(child_spec, Some(id))?;
                if let NodeBody::LibraryCall(b) = self.plan.get_mut(id).body_mut() {
                    b.child = Some(child_id);
                }
            }
            _ => {}
        }

        self.activate_node_conditions(id);
        self.notify(id);
        Ok(id)
    }

    fn activate_node_conditions(&mut self, id: NodeId) {
        let present: Vec<_> = self.plan.get(id).conditions().present().collect();
        for (_, expr) in present {
            self.exprs.activate(expr);
            self.exprs.add_listener(expr, id);
        }
    }

    fn deactivate_node_conditions(&mut self, id: NodeId) {
        let present: Vec<_> = self.plan.get(id).conditions().present().collect();
        for (_, expr) in present {
            self.exprs.remove_listener(expr, id);
            self.exprs.deactivate(expr);
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Thread-safe-entry-point semantics live one layer up in
    /// [`SharedExecutive`]; this is the single-threaded core of it (spec §5).
    pub fn notify(&mut self, id: NodeId) {
        let qs = self.plan.get(id).queue_status();
        match qs {
            QueueStatus::None => {
                self.plan.get_mut(id).set_queue_status(QueueStatus::Candidate);
                self.candidate_queue.push_back(id);
            }
            QueueStatus::Transition => {
                self.plan.get_mut(id).set_queue_status(QueueStatus::TransitionCheck);
            }
            QueueStatus::Pending | QueueStatus::PendingTry => {
                self.plan.get_mut(id).set_queue_status(QueueStatus::PendingTryCheck);
            }
            QueueStatus::Candidate
            | QueueStatus::PendingCheck
            | QueueStatus::PendingTryCheck
            | QueueStatus::TransitionCheck
            | QueueStatus::Delete => {}
        }
    }

    /// Runs one macro-step to quiescence (spec §4.5). Returns
    /// `Err(ExecError::Invariant)` if a fatal invariant is violated, in
    /// which case the executive is left [`Executive::poisoned`].
    pub fn step(&mut self) -> ExecResult<()> {
        if self.poisoned {
            return Err(ExecError::Invariant("step() called on a poisoned executive".into()));
        }
        if !self.transition_queue.is_empty() {
            return self.poison(ExecError::Invariant(
                "transition queue non-empty at macro-step entry".into(),
            ));
        }

        loop {
            self.drain_candidates();

            if !self.pending_queue.is_empty() {
                if let Err(e) = self.run_pending_sweep() {
                    return self.poison(e);
                }
            }

            if self.transition_queue.is_empty() {
                break;
            }

            let mut batch = Vec::with_capacity(self.transition_queue.len());
            while let Some(id) = self.transition_queue.pop_front() {
                let old_state = self.plan.get(id).state();
                let requeue = self.plan.get(id).queue_status() == QueueStatus::TransitionCheck;
                self.plan.get_mut(id).set_queue_status(QueueStatus::None);
                let new_state = match self.apply_transition(id) {
                    Ok(s) => s,
                    Err(e) => return self.poison(e),
                };
                batch.push(NodeTransition {
                    node: id,
                    old_state,
                    new_state,
                });
                if requeue {
                    self.notify(id);
                }
            }
            tracing::trace!(batch_len = batch.len(), "published transition batch");
            self.listener.on_transitions(&batch);

            if !self.outbound.is_empty() || self.candidate_queue.is_empty() {
                break;
            }
        }

        self.cycle += 1;
        tracing::debug!(cycle = self.cycle, "macro-step complete, flushing outbound queues");
        self.flush_outbound();
        self.listener.on_step_complete(self.cycle);
        Ok(())
    }

    /// Calls `step()` repeatedly until a macro-step transitions nothing, or
    /// `max_cycles_per_call` is hit. A convenience for callers driving a
    /// plan with no real external interface latency (tests, offline tools);
    /// not part of the scheduling contract itself.
    pub fn run_to_quiescence(&mut self) -> ExecResult<u32> {
        let mut ran = 0u32;
        loop {
            self.step()?;
            ran += 1;
            if self.candidate_queue.is_empty()
                && self.pending_queue.is_empty()
                && self.transition_queue.is_empty()
            {
                break;
            }
            if let Some(max) = self.config.max_cycles_per_call {
                if ran >= max {
                    tracing::warn!(ran, "run_to_quiescence hit max_cycles_per_call");
                    break;
                }
            }
        }
        Ok(ran)
    }

    fn poison(&mut self, err: ExecError) -> ExecResult<()> {
        tracing::error!(error = %err, "fatal invariant violation, poisoning executive");
        self.poisoned = true;
        Err(err)
    }

    fn drain_candidates(&mut self) {
        while let Some(id) = self.candidate_queue.pop_front() {
            self.plan.get_mut(id).set_queue_status(QueueStatus::None);
            let dest = destination(self.plan.get(id), &self.exprs, &self.plan);
            match dest {
                Destination::Stay => {}
                Destination::Direct(to) => self.accept_direct(id, to),
                Destination::NeedsResources(to) => {
                    self.plan.get_mut(id).set_next_state(Some(to));
                    self.plan.get_mut(id).set_queue_status(QueueStatus::PendingTry);
                    self.pending_queue.push_back(id);
                }
            }
        }
    }

    fn accept_direct(&mut self, id: NodeId, to: NodeState) {
        self.plan.get_mut(id).set_next_state(Some(to));
        self.plan.get_mut(id).set_queue_status(QueueStatus::Transition);
        self.transition_queue.push_back(id);
    }

    /// Re-checks every pending node's destination, attempts mutex
    /// acquisition for those still headed to Executing, then arbitrates the
    /// remainder that also carry command resource requests in one batch
    /// (spec §4.5's "resource arbitration sub-procedure"). A node denied by
    /// the arbiter is finalized to IterationEnded with outcome `denied`
    /// immediately rather than re-parked, matching spec.md §8 scenario 2's
    /// literal one-`step()` result; see DESIGN.md.
    fn run_pending_sweep(&mut self) -> ExecResult<()> {
        let drained: Vec<NodeId> = self.pending_queue.drain(..).collect();
        let mut admitted_with_resources: Vec<NodeId> = Vec::new();

        for id in drained {
            let dest = destination(self.plan.get(id), &self.exprs, &self.plan);
            match dest {
                Destination::Stay => {
                    self.plan.get_mut(id).set_queue_status(QueueStatus::None);
                }
                Destination::Direct(to) => self.accept_direct(id, to),
                Destination::NeedsResources(to) => match self.try_acquire_node_mutexes(id) {
                    Ok(true) => {
                        self.plan.get_mut(id).set_next_state(Some(to));
                        if self.plan.get(id).resource_requests().is_empty() {
                            self.plan.get_mut(id).set_queue_status(QueueStatus::Transition);
                            self.transition_queue.push_back(id);
                        } else {
                            self.plan.get_mut(id).set_queue_status(QueueStatus::Pending);
                            admitted_with_resources.push(id);
                        }
                    }
                    Ok(false) => {
                        self.plan.get_mut(id).set_queue_status(QueueStatus::None);
                    }
                    Err(ExecError::Plan { detail, .. }) => {
                        self.fail_node_with_plan_error(id, detail)?;
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        if admitted_with_resources.is_empty() {
            return Ok(());
        }

        let sequences: Vec<u64> = admitted_with_resources.iter().map(|_| self.next_sequence()).collect();
        let plan = &self.plan;
        let requests: Vec<CommandRequest> = admitted_with_resources
            .iter()
            .zip(&sequences)
            .map(|(&id, &sequence)| CommandRequest {
                command: id,
                resources: plan.get(id).resource_requests(),
                sequence,
            })
            .collect();
        let outcome = self.arbiter.arbitrate(&requests);

        for id in outcome.accepted {
            self.plan.get_mut(id).set_queue_status(QueueStatus::Transition);
            self.transition_queue.push_back(id);
        }
        for id in outcome.rejected {
            tracing::warn!(node = %id, "command denied by resource arbiter");
            self.deny_command(id)?;
        }
        Ok(())
    }

    /// Attempts to acquire every mutex `id` declares, rolling back any it
    /// already grabbed this attempt if one is unavailable. Supplemented
    /// behavior (spec.md never wires mutexes into the Waiting->Executing
    /// guard explicitly); see DESIGN.md and spec.md §8 scenario 3.
    ///
    /// `Ok(true)`: every mutex acquired. `Ok(false)`: ordinary contention,
    /// the node drops back to the candidate queue for a future sweep.
    /// `Err`: a plan error (spec §7) — acquiring a mutex this node already
    /// holds — that the caller must record on the node rather than discard.
    fn try_acquire_node_mutexes(&mut self, id: NodeId) -> ExecResult<bool> {
        let names = self.plan.get(id).mutexes().to_vec();
        let mut acquired: Vec<String> = Vec::new();
        for name in &names {
            match self.mutexes.ensure(name).acquire(id) {
                Ok(true) => acquired.push(name.clone()),
                Ok(false) => {
                    let waiters = self.mutexes.get(name).map(|m| m.waiters().len()).unwrap_or(0);
                    if waiters > self.config.mutex_waiter_warn_threshold {
                        tracing::warn!(mutex = %name, waiters, "mutex waiter queue past soft limit");
                    }
                    for held in &acquired {
                        self.release_named_mutex(held, id)?;
                    }
                    return Ok(false);
                }
                Err(e) => {
                    for held in &acquired {
                        self.release_named_mutex(held, id)?;
                    }
                    return Err(e);
                }
            }
        }
        Ok(true)
    }

    /// Releases `name` if `holder` currently holds it. A release of an
    /// unheld mutex is a fatal invariant violation (spec §7) that must
    /// abort the macro-step in progress rather than be silently dropped,
    /// so the `Result` is propagated through every caller up to `step()`.
    fn release_named_mutex(&mut self, name: &str, holder: NodeId) -> ExecResult<()> {
        let mut to_notify = Vec::new();
        if let Some(m) = self.mutexes.get_mut(name) {
            if m.holder() == Some(holder) {
                m.release(&mut |w| to_notify.push(w))?;
            }
        }
        for w in to_notify {
            self.notify(w);
        }
        Ok(())
    }

    fn release_node_mutexes(&mut self, id: NodeId) -> ExecResult<()> {
        let names = self.plan.get(id).mutexes().to_vec();
        for name in names {
            self.release_named_mutex(&name, id)?;
        }
        Ok(())
    }

    /// Finalizes `id` to IterationEnded with a plan-error outcome instead of
    /// aborting the macro-step (spec §7: plan errors are "reported back
    /// through the node's outcome/failure-type channels").
    fn fail_node_with_plan_error(&mut self, id: NodeId, detail: PlanErrorKind) -> ExecResult<()> {
        let err = ExecError::Plan { node: id, detail };
        tracing::warn!(error = %err, "plan error, failing node");
        self.release_node_mutexes(id)?;
        self.plan.get_mut(id).set_outcome(NodeOutcome::Failure);
        self.plan.get_mut(id).set_failure_type(FailureType::PlanError);
        self.plan.get_mut(id).set_next_state(Some(NodeState::IterationEnded));
        self.plan.get_mut(id).set_queue_status(QueueStatus::Transition);
        self.transition_queue.push_back(id);
        Ok(())
    }

    /// Marks `id` denied and parks it on the outbound queue; the interface
    /// is told about the denial during `flush_outbound`, alongside command
    /// dispatch, so every `ExternalInterface` call happens exactly once per
    /// outbound-queue entry (spec §4.6) rather than synchronously mid-sweep.
    fn deny_command(&mut self, id: NodeId) -> ExecResult<()> {
        self.release_node_mutexes(id)?;
        if let NodeBody::Command(c) = self.plan.get_mut(id).body_mut() {
            c.handle = crate::node::CommandHandleState::Denied;
        }
        self.plan.get_mut(id).set_next_state(Some(NodeState::IterationEnded));
        self.plan.get_mut(id).set_queue_status(QueueStatus::Transition);
        self.transition_queue.push_back(id);
        self.outbound.commands_denied.push(id);
        Ok(())
    }

    /// Applies the accepted `next_state` for `id`, runs the transition's
    /// side effects (spec §4.4's table), and cascades notification to its
    /// parent and children so list/library-call aggregation conditions get
    /// re-checked. Structural parent/child notification supplements the
    /// expression graph, which has no direct edge for "parent's state"; see
    /// DESIGN.md.
    fn apply_transition(&mut self, id: NodeId) -> ExecResult<NodeState> {
        let from = self.plan.get(id).state();
        let to = self.plan.get(id).next_state().ok_or_else(|| {
            ExecError::Invariant(format!("node {id} on transition queue with no next_state"))
        })?;
        self.plan.get_mut(id).set_next_state(None);

        if let Some((outcome, failure)) = outcome_for_transition(self.plan.get(id), &self.exprs, &self.plan, from, to)
        {
            self.plan.get_mut(id).set_outcome(outcome);
            if let Some(f) = failure {
                self.plan.get_mut(id).set_failure_type(f);
            }
        }

        self.plan.get_mut(id).set_state(to);
        tracing::trace!(node = %id, ?from, ?to, "node transition");

        match (from, to) {
            (NodeState::Inactive, NodeState::Waiting) => {}
            (NodeState::Waiting, NodeState::Executing) => self.issue_body(id),
            (NodeState::Executing, NodeState::Failing) => self.begin_failing(id),
            (NodeState::IterationEnded, NodeState::Waiting) => self.reset_for_new_iteration(id),
            (NodeState::IterationEnded, NodeState::Finished) => {
                self.deactivate_node_conditions(id);
                self.release_node_mutexes(id)?;
                if self.plan.get(id).parent().is_none() {
                    self.plan.get_mut(id).set_queue_status(QueueStatus::Delete);
                    self.finished_roots_queue.push_back(id);
                }
            }
            (NodeState::Finished, NodeState::Inactive) => self.activate_node_conditions(id),
            _ => {}
        }

        if from == NodeState::Executing && to != NodeState::Executing {
            self.arbiter.release(id);
            self.release_node_mutexes(id)?;
        }

        if let Some(parent) = self.plan.get(id).parent() {
            self.notify(parent);
        }
        self.notify_children(id);
        // A node just accepted onto a new state may already satisfy its next
        // destination (e.g. default start/pre conditions needing no actual
        // expression change to become true) - re-candidate it so the same
        // step's quiescence loop picks that up instead of stalling forever.
        self.notify(id);

        Ok(to)
    }

    fn notify_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.plan.get(id).body() {
            NodeBody::List { children } => children.clone(),
            NodeBody::LibraryCall(b) => b.child.into_iter().collect(),
            _ => Vec::new(),
        };
        for child in children {
            self.notify(child);
        }
    }

    fn issue_body(&mut self, id: NodeId) {
        match self.plan.get_mut(id).body_mut() {
            NodeBody::Command(_) => self.outbound.commands_execute.push(id),
            NodeBody::Assignment(a) => {
                let value_expr = a.value_expr;
                a.issued = true;
                let destination = a.destination.clone();
                let value = self.exprs.value(value_expr).unwrap_or(crate::value::Value::Bool(false));
                self.outbound.assignments_execute.push((destination, value));
            }
            NodeBody::Update(u) => {
                u.issued = true;
                self.outbound.updates_execute.push(id);
            }
            NodeBody::List { .. } | NodeBody::LibraryCall(_) | NodeBody::Empty => {}
        }
    }

    fn begin_failing(&mut self, id: NodeId) {
        if let NodeBody::Command(c) = self.plan.get_mut(id).body_mut() {
            if !c.handle.is_terminal() {
                c.abort_requested = true;
                self.outbound.commands_abort.push(id);
            }
        }
    }

    fn reset_for_new_iteration(&mut self, id: NodeId) {
        self.plan.get_mut(id).bump_iteration();
        self.plan.get_mut(id).clear_outcome();
        match self.plan.get_mut(id).body_mut() {
            NodeBody::Command(c) => {
                c.handle = crate::node::CommandHandleState::NotSent;
                c.abort_requested = false;
                c.abort_acknowledged = false;
                c.return_value = None;
            }
            NodeBody::Assignment(a) => a.issued = false,
            NodeBody::Update(u) => u.issued = false,
            NodeBody::List { .. } | NodeBody::LibraryCall(_) | NodeBody::Empty => {}
        }
    }

    fn flush_outbound(&mut self) {
        for (dest, value) in self.outbound.assignments_execute.drain(..) {
            self.interface.execute_assignment(&dest, &value);
        }
        for dest in self.outbound.assignments_retract.drain(..) {
            self.interface.retract_assignment(&dest);
        }
        for id in self.outbound.commands_execute.drain(..) {
            let cmd = match self.plan.get(id).body() {
                NodeBody::Command(c) => Command {
                    node: id,
                    name: c.name.clone(),
                    args: c.args.clone(),
                },
                _ => continue,
            };
            if let NodeBody::Command(c) = self.plan.get_mut(id).body_mut() {
                c.handle = crate::node::CommandHandleState::SentToSystem;
            }
            self.interface.execute_command(&cmd);
        }
        for id in self.outbound.commands_denied.drain(..) {
            let cmd = match self.plan.get(id).body() {
                NodeBody::Command(c) => Command {
                    node: id,
                    name: c.name.clone(),
                    args: c.args.clone(),
                },
                _ => continue,
            };
            self.interface.report_command_arbitration_failure(&cmd);
        }
        for id in self.outbound.commands_abort.drain(..) {
            let cmd = match self.plan.get(id).body() {
                NodeBody::Command(c) => Command {
                    node: id,
                    name: c.name.clone(),
                    args: c.args.clone(),
                },
                _ => continue,
            };
            self.interface.invoke_abort(&cmd);
        }
        for id in self.outbound.updates_execute.drain(..) {
            if let NodeBody::Update(u) = self.plan.get(id).body() {
                self.interface.execute_update(&crate::interface::Update {
                    node: id,
                    pairs: u.pairs.clone(),
                });
            }
        }
    }

    /// External commands call back through here to deliver a command's
    /// terminal/intermediate handle (spec §6 `commandHandleReturn`).
    pub fn command_handle_return(&mut self, node: NodeId, handle: crate::node::CommandHandleState) {
        if let NodeBody::Command(c) = self.plan.get_mut(node).body_mut() {
            c.handle = handle;
            if handle == crate::node::CommandHandleState::Denied && !c.abort_acknowledged {
                c.abort_acknowledged = true;
            }
        }
        if handle == crate::node::CommandHandleState::InterfaceError {
            let err = ExecError::Interface {
                command: node,
                detail: InterfaceErrorKind::InvalidHandle,
            };
            tracing::warn!(error = %err, "interface returned an invalid command handle");
        }
        self.notify(node);
    }

    /// Spec §6 `commandReturn`: delivers a value result alongside the
    /// handle.
    pub fn command_return(&mut self, node: NodeId, value: crate::value::Value) {
        if let NodeBody::Command(c) = self.plan.get_mut(node).body_mut() {
            c.return_value = Some(value);
        }
        self.notify(node);
    }

    /// Spec §6 `commandAbortAcknowledge`.
    pub fn command_abort_acknowledge(&mut self, node: NodeId, _ok: bool) {
        if let NodeBody::Command(c) = self.plan.get_mut(node).body_mut() {
            c.abort_acknowledged = true;
        }
        self.notify(node);
    }

    pub fn assign_variable(&mut self, name: &str, value: crate::value::Value) {
        let mut ready = Vec::new();
        self.exprs.assign_variable(name, value, &mut |n| ready.push(n));
        for n in ready {
            self.notify(n);
        }
    }

    pub fn retract_variable(&mut self, name: &str) {
        let mut ready = Vec::new();
        self.exprs.retract_variable(name, &mut |n| ready.push(n));
        for n in ready {
            self.notify(n);
        }
    }

    pub fn update_lookup(&mut self, name: &str, args: &[crate::value::Value], value: crate::value::Value) {
        let mut ready = Vec::new();
        self.exprs.update_lookup(name, args, value, &mut |n| ready.push(n));
        for n in ready {
            self.notify(n);
        }
    }

    /// Spec §9's `deleteFinishedPlans`: reclaims every root currently on the
    /// finished-roots queue, recursively freeing its subtree's arena slots.
    /// Never called implicitly by `step()`.
    pub fn delete_finished_plans(&mut self) {
        while let Some(root) = self.finished_roots_queue.pop_front() {
            self.roots.retain(|r| *r != root);
            self.delete_subtree(root);
        }
    }

    fn delete_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.plan.get(id).body() {
            NodeBody::List { children } => children.clone(),
            NodeBody::LibraryCall(b) => b.child.into_iter().collect(),
            _ => Vec::new(),
        };
        for child in children {
            self.delete_subtree(child);
        }
        self.plan.remove(id);
    }
}

/// Thread-safe entry point for external callbacks (spec §5): they enqueue
/// against the candidate queue from another thread, but the actual
/// condition re-evaluation only ever runs on the thread calling `step()`.
pub struct SharedExecutive(std::sync::Arc<parking_lot::Mutex<Executive>>);

impl SharedExecutive {
    pub fn new(executive: Executive) -> Self {
        SharedExecutive(std::sync::Arc::new(parking_lot::Mutex::new(executive)))
    }

    pub fn notify_node(&self, id: NodeId) {
        self.0.lock().notify(id);
    }

    pub fn step(&self) -> ExecResult<()> {
        self.0.lock().step()
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, Executive> {
        self.0.lock()
    }
}

impl Clone for SharedExecutive {
    fn clone(&self) -> Self {
        SharedExecutive(self.0.clone())
    }
}
