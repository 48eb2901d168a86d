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

//! Builder types for handing the executive an already-typed plan tree
//! (spec §6 `addPlan`/`addLibrary`): the plan-XML parser and symbol table
//! are explicitly out of scope (spec.md §1), so callers construct this tree
//! directly, the way a parser living outside this crate would.

use crate::error::{ExecError, ExecResult};
use crate::expr::ExprId;
use crate::node::{Condition, NodeBody, NodeType, ResourceValue};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Clone)]
pub struct PlanNodeSpec {
    pub node_id: String,
    pub node_type: NodeType,
    pub conditions: Vec<(Condition, ExprId)>,
    pub mutexes: Vec<String>,
    pub body: NodeBodySpec,
}

impl PlanNodeSpec {
    pub fn empty(node_id: impl Into<String>) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::Empty,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::Empty,
        }
    }

    pub fn command(node_id: impl Into<String>, name: impl Into<String>, args: Vec<Value>) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::Command,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::Command {
                name: name.into(),
                args,
                resources: Vec::new(),
            },
        }
    }

    pub fn list(node_id: impl Into<String>, children: Vec<PlanNodeSpec>) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::List,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::List(children),
        }
    }

    pub fn assignment(node_id: impl Into<String>, destination: impl Into<String>, value_expr: ExprId) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::Assignment,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::Assignment {
                destination: destination.into(),
                value_expr,
            },
        }
    }

    pub fn update(node_id: impl Into<String>, pairs: Vec<(String, Value)>) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::Update,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::Update { pairs },
        }
    }

    pub fn library_call(node_id: impl Into<String>, library_name: impl Into<String>) -> Self {
        PlanNodeSpec {
            node_id: node_id.into(),
            node_type: NodeType::LibraryCall,
            conditions: Vec::new(),
            mutexes: Vec::new(),
            body: NodeBodySpec::LibraryCall {
                library_name: library_name.into(),
            },
        }
    }

    pub fn with_condition(mut self, cond: Condition, expr: ExprId) -> Self {
        self.conditions.push((cond, expr));
        self
    }

    pub fn with_mutex(mut self, name: impl Into<String>) -> Self {
        self.mutexes.push(name.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceValue) -> Self {
        if let NodeBodySpec::Command { resources, .. } = &mut self.body {
            resources.push(resource);
        }
        self
    }
}

#[derive(Clone)]
pub enum NodeBodySpec {
    List(Vec<PlanNodeSpec>),
    Command {
        name: String,
        args: Vec<Value>,
        resources: Vec<ResourceValue>,
    },
    Assignment {
        destination: String,
        value_expr: ExprId,
    },
    Update {
        pairs: Vec<(String, Value)>,
    },
    LibraryCall {
        library_name: String,
    },
    Empty,
}

impl NodeBodySpec {
    /// Splits a spec body into the arena-ready [`NodeBody`] plus any child
    /// specs that still need building (List's children, a library call's
    /// resolved root). Library resolution happens here, at add time, rather
    /// than deferred to "library-call expansion time" as spec §6 phrases it
    /// — a simplification recorded in DESIGN.md.
    pub(super) fn into_body_and_children(
        self,
        libraries: &HashMap<String, PlanNodeSpec>,
    ) -> ExecResult<(NodeBody, Vec<PlanNodeSpec>)> {
        match self {
            NodeBodySpec::List(children) => Ok((NodeBody::List { children: Vec::new() }, children)),
            NodeBodySpec::Command { name, args, resources } => Ok((
                NodeBody::Command(crate::node::CommandBody {
                    name,
                    args,
                    resources,
                    handle: crate::node::CommandHandleState::NotSent,
                    abort_requested: false,
                    abort_acknowledged: false,
                    return_value: None,
                }),
                Vec::new(),
            )),
            NodeBodySpec::Assignment { destination, value_expr } => Ok((
                NodeBody::Assignment(crate::node::AssignmentBody {
                    destination,
                    value_expr,
                    issued: false,
                }),
                Vec::new(),
            )),
            NodeBodySpec::Update { pairs } => {
                Ok((NodeBody::Update(crate::node::UpdateBody { pairs, issued: false }), Vec::new()))
            }
            NodeBodySpec::LibraryCall { library_name } => {
                let root = libraries.get(&library_name).cloned().ok_or_else(|| {
                    ExecError::Configuration(format!("unknown library '{library_name}'"))
                })?;
                Ok((NodeBody::LibraryCall(crate::node::LibraryCallBody { child: None }), vec![root]))
            }
            NodeBodySpec::Empty => Ok((NodeBody::Empty, Vec::new())),
        }
    }
}
