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

//! One vertex in a plan tree (spec §3, §4.4), grounded on the node-type
//! catalog in `examples/PierreNowak-risingwave/src/frontend/src/optimizer/plan_node/mod.rs`:
//! a tagged variant per node kind rather than an inheritance hierarchy, with
//! the condition slots held in a fixed-size `SmallVec`-backed struct the
//! way that file keeps per-node property bags compact.

mod arena;
pub mod transition;

pub use arena::{NodeId, PlanArena};

use crate::expr::ExprId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    List,
    Command,
    Assignment,
    Update,
    LibraryCall,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Inactive,
    Waiting,
    Executing,
    IterationEnded,
    Finished,
    Failing,
    FinishingUp,
    Iterating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    None,
    Candidate,
    Pending,
    PendingTry,
    PendingCheck,
    PendingTryCheck,
    Transition,
    TransitionCheck,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Start,
    Repeat,
    Pre,
    Post,
    Invariant,
    End,
    Exit,
    Skip,
}

pub const ALL_CONDITIONS: [Condition; 8] = [
    Condition::Start,
    Condition::Repeat,
    Condition::Pre,
    Condition::Post,
    Condition::Invariant,
    Condition::End,
    Condition::Exit,
    Condition::Skip,
];

/// Up to eight named condition expressions; absent ones fall back to the
/// constants spec §4.4 defines (`End` is the exception — see
/// `transition::default_end`).
#[derive(Default)]
pub struct Conditions {
    slots: [Option<ExprId>; 8],
}

impl Conditions {
    fn index(cond: Condition) -> usize {
        match cond {
            Condition::Start => 0,
            Condition::Repeat => 1,
            Condition::Pre => 2,
            Condition::Post => 3,
            Condition::Invariant => 4,
            Condition::End => 5,
            Condition::Exit => 6,
            Condition::Skip => 7,
        }
    }

    pub fn set(&mut self, cond: Condition, expr: ExprId) {
        self.slots[Self::index(cond)] = Some(expr);
    }

    pub fn get(&self, cond: Condition) -> Option<ExprId> {
        self.slots[Self::index(cond)]
    }

    pub fn present(&self) -> impl Iterator<Item = (Condition, ExprId)> + '_ {
        ALL_CONDITIONS
            .iter()
            .copied()
            .filter_map(move |c| self.get(c).map(|e| (c, e)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceValue {
    pub name: String,
    pub priority: i32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub release_on_termination: bool,
}

impl ResourceValue {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        ResourceValue {
            name: name.into(),
            priority,
            lower_bound: 1.0,
            upper_bound: 1.0,
            release_on_termination: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    Failure,
    Skipped,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    PreConditionFailed,
    PostConditionFailed,
    InvariantFailed,
    ParentFailed,
    ExitCondition,
    Denied,
    /// A command's external interface returned an invalid handle (spec §7);
    /// recorded when `CommandHandleState::InterfaceError` resolves a node.
    InterfaceError,
    /// A plan error surfaced through a node's outcome channel rather than
    /// aborting the macro-step (spec §7), e.g. re-acquiring a mutex this
    /// node already holds.
    PlanError,
}

/// External command handle state, updated by `commandHandleReturn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandleState {
    NotSent,
    SentToSystem,
    ReceivedBySystem,
    Success,
    Failed,
    Denied,
    InterfaceError,
}

impl CommandHandleState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandHandleState::Success
                | CommandHandleState::Failed
                | CommandHandleState::Denied
                | CommandHandleState::InterfaceError
        )
    }
}

pub struct CommandBody {
    pub name: String,
    pub args: Vec<crate::value::Value>,
    pub resources: Vec<ResourceValue>,
    pub handle: CommandHandleState,
    pub abort_requested: bool,
    pub abort_acknowledged: bool,
    pub return_value: Option<crate::value::Value>,
}

pub struct AssignmentBody {
    pub destination: String,
    pub value_expr: ExprId,
    pub issued: bool,
}

pub struct UpdateBody {
    pub pairs: Vec<(String, crate::value::Value)>,
    pub issued: bool,
}

pub struct LibraryCallBody {
    pub child: Option<NodeId>,
}

pub enum NodeBody {
    List { children: Vec<NodeId> },
    Command(CommandBody),
    Assignment(AssignmentBody),
    Update(UpdateBody),
    LibraryCall(LibraryCallBody),
    Empty,
}

pub struct Node {
    id: NodeId,
    node_id_name: String,
    node_type: NodeType,
    state: NodeState,
    next_state: Option<NodeState>,
    queue_status: QueueStatus,
    conditions: Conditions,
    body: NodeBody,
    parent: Option<NodeId>,
    outcome: Option<NodeOutcome>,
    failure_type: Option<FailureType>,
    /// How many times this node has gone Waiting -> ... -> IterationEnded,
    /// for the repeat loop (spec §8 scenario 5).
    iteration: u32,
    /// Named mutexes this node must hold for the duration of Executing
    /// (scenario 3); not part of the distilled data model, supplemented from
    /// `original_source/src/exec/Mutex.cc`'s `UsingMutex` concept since the
    /// plan-node grammar that would declare these is out of scope.
    mutexes: Vec<String>,
}

impl Node {
    pub fn new(
        id: NodeId,
        node_id_name: String,
        node_type: NodeType,
        body: NodeBody,
        parent: Option<NodeId>,
    ) -> Self {
        Node {
            id,
            node_id_name,
            node_type,
            state: NodeState::Inactive,
            next_state: None,
            queue_status: QueueStatus::None,
            conditions: Conditions::default(),
            body,
            parent,
            outcome: None,
            failure_type: None,
            iteration: 0,
            mutexes: Vec::new(),
        }
    }

    pub fn mutexes(&self) -> &[String] {
        &self.mutexes
    }

    pub fn set_mutexes(&mut self, mutexes: Vec<String>) {
        self.mutexes = mutexes;
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_id_name(&self) -> &str {
        &self.node_id_name
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub fn next_state(&self) -> Option<NodeState> {
        self.next_state
    }

    pub fn set_next_state(&mut self, next: Option<NodeState>) {
        self.next_state = next;
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue_status
    }

    pub fn set_queue_status(&mut self, qs: QueueStatus) {
        self.queue_status = qs;
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn outcome(&self) -> Option<NodeOutcome> {
        self.outcome
    }

    pub fn set_outcome(&mut self, outcome: NodeOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn failure_type(&self) -> Option<FailureType> {
        self.failure_type
    }

    pub fn set_failure_type(&mut self, failure: FailureType) {
        self.failure_type = Some(failure);
    }

    pub fn clear_outcome(&mut self) {
        self.outcome = None;
        self.failure_type = None;
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn bump_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn resource_requests(&self) -> &[ResourceValue] {
        match &self.body {
            NodeBody::Command(c) => &c.resources,
            _ => &[],
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::List { children } => children,
            _ => &[],
        }
    }
}
