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

//! Per-state destination functions (spec §4.4). These are pure: they read
//! conditions and child states and report what the node *would* do, with no
//! side effects. [`crate::executive::Executive`] applies the side effects
//! (activating conditions, issuing bodies, aborting commands, releasing
//! mutexes) only once a destination has been accepted onto the transition
//! queue.

use super::{Condition, Node, NodeBody, NodeState, PlanArena};
use crate::expr::ExprArena;

/// What a node's destination function reports for the current conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// No outgoing transition is currently enabled.
    Stay,
    /// Transition is enabled and needs no resource check.
    Direct(NodeState),
    /// Transition is enabled but gated on command resource availability;
    /// the node must go through the pending queue (spec §4.5).
    NeedsResources(NodeState),
}

/// Evaluate one of a node's up-to-eight conditions, applying spec §4.4's
/// default-when-absent table. `End` is the one condition whose default
/// depends on the node's type/body rather than being a fixed constant.
pub fn condition_value<'a>(node: &'a Node, arena: &'a ExprArena, plan: &'a PlanArena) -> ConditionReader<'a> {
    ConditionReader { node, arena, plan }
}

pub struct ConditionReader<'a> {
    node: &'a Node,
    arena: &'a ExprArena,
    plan: &'a PlanArena,
}

impl<'a> ConditionReader<'a> {
    pub fn get(&self, cond: Condition) -> Option<bool> {
        if let Some(expr) = self.node.conditions().get(cond) {
            return self.arena.value(expr).and_then(|v| v.as_bool());
        }
        match cond {
            Condition::Start => Some(true),
            Condition::Repeat => Some(false),
            Condition::Pre => Some(true),
            Condition::Post => Some(true),
            Condition::Invariant => Some(true),
            Condition::Exit => Some(false),
            Condition::Skip => Some(false),
            Condition::End => self.default_end(),
        }
    }

    fn default_end(&self) -> Option<bool> {
        match self.node.body() {
            NodeBody::Empty => Some(true),
            NodeBody::List { .. } => Some(all_children_terminal(self.node, self.plan)),
            NodeBody::LibraryCall(body) => Some(match body.child {
                Some(child) => self
                    .plan
                    .try_get(child)
                    .map(|c| c.state() == NodeState::Finished)
                    .unwrap_or(false),
                None => true,
            }),
            NodeBody::Command(c) => Some(c.handle.is_terminal()),
            NodeBody::Assignment(a) => Some(a.issued),
            NodeBody::Update(u) => Some(u.issued),
        }
    }
}

fn all_children_terminal(node: &Node, plan: &PlanArena) -> bool {
    node.children()
        .iter()
        .all(|c| plan.try_get(*c).map(|n| n.state() == NodeState::Finished).unwrap_or(true))
}

pub fn parent_is_executing(node: &Node, plan: &PlanArena) -> bool {
    match node.parent() {
        None => true,
        Some(p) => plan.try_get(p).map(|n| n.state() == NodeState::Executing).unwrap_or(false),
    }
}

fn parent_left_executing(node: &Node, plan: &PlanArena) -> bool {
    match node.parent() {
        None => false,
        Some(p) => plan
            .try_get(p)
            .map(|n| n.state() != NodeState::Executing)
            .unwrap_or(true),
    }
}

/// Compute the destination for `node` given its current conditions. Pure;
/// call sites are responsible for applying side effects once accepted.
pub fn destination(node: &Node, arena: &ExprArena, plan: &PlanArena) -> Destination {
    let cond = condition_value(node, arena, plan);
    match node.state() {
        NodeState::Inactive => {
            if parent_is_executing(node, plan) && cond.get(Condition::Skip) != Some(true) {
                Destination::Direct(NodeState::Waiting)
            } else {
                Destination::Stay
            }
        }
        NodeState::Waiting => {
            if cond.get(Condition::Skip) == Some(true) || cond.get(Condition::Exit) == Some(true) {
                return Destination::Direct(NodeState::IterationEnded);
            }
            match (cond.get(Condition::Start), cond.get(Condition::Pre)) {
                (Some(true), Some(true)) => {
                    if node.resource_requests().is_empty() && node.mutexes().is_empty() {
                        Destination::Direct(NodeState::Executing)
                    } else {
                        Destination::NeedsResources(NodeState::Executing)
                    }
                }
                (Some(true), Some(false)) => Destination::Direct(NodeState::IterationEnded),
                _ => Destination::Stay,
            }
        }
        NodeState::Executing => {
            if cond.get(Condition::Invariant) == Some(false) || cond.get(Condition::Exit) == Some(true) {
                return Destination::Direct(NodeState::Failing);
            }
            match (cond.get(Condition::End), cond.get(Condition::Post)) {
                (Some(true), Some(true)) => Destination::Direct(NodeState::IterationEnded),
                (Some(true), Some(false)) => Destination::Direct(NodeState::IterationEnded),
                _ => Destination::Stay,
            }
        }
        NodeState::Failing => {
            let abort_done = match node.body() {
                NodeBody::Command(c) => !c.abort_requested || c.abort_acknowledged,
                _ => true,
            };
            if abort_done {
                Destination::Direct(NodeState::FinishingUp)
            } else {
                Destination::Stay
            }
        }
        NodeState::FinishingUp => Destination::Direct(NodeState::IterationEnded),
        NodeState::IterationEnded => {
            let exit = cond.get(Condition::Exit) == Some(true);
            match cond.get(Condition::Repeat) {
                Some(true) if !exit => Destination::Direct(NodeState::Waiting),
                Some(false) => Destination::Direct(NodeState::Finished),
                _ if exit => Destination::Direct(NodeState::Finished),
                _ => Destination::Stay,
            }
        }
        NodeState::Finished => {
            if node.parent().is_some() && parent_left_executing(node, plan) {
                Destination::Direct(NodeState::Inactive)
            } else {
                Destination::Stay
            }
        }
        NodeState::Iterating => Destination::Stay,
    }
}

/// What outcome/failure-type a just-accepted transition should record,
/// independent of the side effects the executive performs. Returns `None`
/// when the transition carries no outcome change.
pub fn outcome_for_transition(
    node: &Node,
    arena: &ExprArena,
    plan: &PlanArena,
    from: NodeState,
    to: NodeState,
) -> Option<(super::NodeOutcome, Option<super::FailureType>)> {
    use super::{FailureType, NodeOutcome};
    let cond = condition_value(node, arena, plan);
    match (from, to) {
        (NodeState::Waiting, NodeState::IterationEnded) => {
            if node.failure_type() == Some(FailureType::PlanError) {
                return Some((NodeOutcome::Failure, Some(FailureType::PlanError)));
            }
            if let NodeBody::Command(c) = node.body() {
                if c.handle == super::CommandHandleState::Denied {
                    return Some((NodeOutcome::Failure, Some(FailureType::Denied)));
                }
                if c.handle == super::CommandHandleState::InterfaceError {
                    return Some((NodeOutcome::Failure, Some(FailureType::InterfaceError)));
                }
            }
            if cond.get(Condition::Skip) == Some(true) {
                Some((NodeOutcome::Skipped, None))
            } else if cond.get(Condition::Exit) == Some(true) {
                Some((NodeOutcome::Interrupted, None))
            } else {
                Some((NodeOutcome::Failure, Some(FailureType::PreConditionFailed)))
            }
        }
        (NodeState::Executing, NodeState::Failing) => {
            if cond.get(Condition::Invariant) == Some(false) {
                Some((NodeOutcome::Failure, Some(FailureType::InvariantFailed)))
            } else {
                Some((NodeOutcome::Interrupted, Some(FailureType::ExitCondition)))
            }
        }
        (NodeState::Executing, NodeState::IterationEnded) => {
            if cond.get(Condition::Post) == Some(true) {
                Some((NodeOutcome::Success, None))
            } else {
                Some((NodeOutcome::Failure, Some(FailureType::PostConditionFailed)))
            }
        }
        _ => None,
    }
}
