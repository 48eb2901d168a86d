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

//! The expression graph (spec §4.1).
//!
//! Expressions are owned by an [`ExprArena`], never by the nodes that read
//! them; nodes hold non-owning [`ExprId`] handles, matching the "avoid
//! owning cycles" guidance for the parent/child/listener graph. Activation
//! is reference counted so a subexpression shared by several conditions
//! becomes live only once and stays live until its last dependent leaves.
//!
//! Listener notification never claims a value actually changed — only that
//! a recomputation might produce a different one. Callers (nodes, or
//! composite expressions propagating to their own listeners) must re-read
//! [`ExprArena::value`] and decide for themselves whether anything changed.

mod store;

pub use store::{StateCache, VariableStore};

use crate::node::NodeId;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) u32);

/// A value an expression currently holds, or the deliberate "Unknown" the
/// core treats as distinct from any concrete value.
pub type ExprValue = Option<crate::value::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listener {
    Node(NodeId),
    Expr(ExprId),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(crate::value::Value),
    /// Reads/writes go through the arena's [`VariableStore`] keyed by name.
    Variable(String),
    Not(ExprId),
    And(SmallVec<[ExprId; 4]>),
    Or(SmallVec<[ExprId; 4]>),
    /// External query identified by `(name, args)`, resolved through the
    /// arena's [`StateCache`].
    Lookup {
        name: String,
        args: SmallVec<[ExprId; 2]>,
    },
    ArrayElement {
        array: ExprId,
        index: ExprId,
    },
}

struct ExprNode {
    kind: ExprKind,
    active_count: u32,
    listeners: Vec<Listener>,
}

/// Owns every expression in the plan, plus the variable store and lookup
/// cache that leaf expressions read from.
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    pub variables: VariableStore,
    pub lookups: StateCache,
    /// Reverse index: for `Variable`/`Lookup` leaves, which `ExprId`s read
    /// them, so an external mutation can find what to notify.
    var_readers: HashMap<String, Vec<ExprId>>,
    lookup_readers: HashMap<(String, Vec<crate::value::Value>), Vec<ExprId>>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena {
            nodes: Vec::new(),
            variables: VariableStore::new(),
            lookups: StateCache::new(),
            var_readers: HashMap::new(),
            lookup_readers: HashMap::new(),
        }
    }

    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode {
            kind,
            active_count: 0,
            listeners: Vec::new(),
        });
        id
    }

    fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    fn get_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Reference-counted activation. The first activation subscribes this
    /// expression to its operands (and registers leaves with the variable
    /// store / lookup cache); later activations just bump the count.
    pub fn activate(&mut self, id: ExprId) {
        let was_inactive = self.get(id).active_count == 0;
        self.get_mut(id).active_count += 1;
        if !was_inactive {
            return;
        }
        let children = self.operand_ids(id);
        for child in &children {
            self.activate(*child);
            self.get_mut(*child).listeners.push(Listener::Expr(id));
        }
        match self.get(id).kind.clone() {
            ExprKind::Variable(name) => {
                self.var_readers.entry(name.clone()).or_default().push(id);
                self.variables.ensure(&name);
            }
            ExprKind::Lookup { name, args } => {
                let arg_values: Vec<_> = args
                    .iter()
                    .map(|a| self.value(*a).unwrap_or(crate::value::Value::Bool(false)))
                    .collect();
                self.lookup_readers
                    .entry((name.clone(), arg_values.clone()))
                    .or_default()
                    .push(id);
                self.lookups.ensure(name, arg_values);
            }
            _ => {}
        }
    }

    /// Reference-counted deactivation; on the last deactivation, unwinds
    /// subscriptions symmetrically with `activate`.
    pub fn deactivate(&mut self, id: ExprId) {
        let count = &mut self.get_mut(id).active_count;
        debug_assert!(*count > 0, "deactivate: expression was never activated");
        *count = count.saturating_sub(1);
        if self.get(id).active_count > 0 {
            return;
        }
        let children = self.operand_ids(id);
        for child in &children {
            self.get_mut(*child)
                .listeners
                .retain(|l| *l != Listener::Expr(id));
            self.deactivate(*child);
        }
        match self.get(id).kind.clone() {
            ExprKind::Variable(name) => {
                if let Some(v) = self.var_readers.get_mut(&name) {
                    v.retain(|e| *e != id);
                }
            }
            ExprKind::Lookup { name, args } => {
                let arg_values: Vec<_> = args
                    .iter()
                    .map(|a| self.value(*a).unwrap_or(crate::value::Value::Bool(false)))
                    .collect();
                if let Some(v) = self.lookup_readers.get_mut(&(name, arg_values)) {
                    v.retain(|e| *e != id);
                }
            }
            _ => {}
        }
    }

    fn operand_ids(&self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        match &self.get(id).kind {
            ExprKind::Constant(_) | ExprKind::Variable(_) => SmallVec::new(),
            ExprKind::Not(a) => SmallVec::from_slice(&[*a]),
            ExprKind::And(items) | ExprKind::Or(items) => items.clone(),
            ExprKind::Lookup { args, .. } => args.iter().copied().collect(),
            ExprKind::ArrayElement { array, index } => SmallVec::from_slice(&[*array, *index]),
        }
    }

    /// Evaluate the current value, `None` meaning Unknown. Side-effect free.
    pub fn value(&self, id: ExprId) -> ExprValue {
        use crate::value::Value;
        match &self.get(id).kind {
            ExprKind::Constant(v) => Some(v.clone()),
            ExprKind::Variable(name) => self.variables.get(name),
            ExprKind::Not(a) => self.value(*a).and_then(|v| v.as_bool()).map(|b| Value::Bool(!b)),
            ExprKind::And(items) => {
                let mut result = true;
                for item in items {
                    match self.value(*item).and_then(|v| v.as_bool()) {
                        Some(false) => return Some(Value::Bool(false)),
                        Some(true) => {}
                        None => result = false,
                    }
                }
                if result { Some(Value::Bool(true)) } else { None }
            }
            ExprKind::Or(items) => {
                let mut all_false = true;
                for item in items {
                    match self.value(*item).and_then(|v| v.as_bool()) {
                        Some(true) => return Some(Value::Bool(true)),
                        Some(false) => {}
                        None => all_false = false,
                    }
                }
                if all_false { Some(Value::Bool(false)) } else { None }
            }
            ExprKind::Lookup { name, args } => {
                let arg_values: Vec<_> = args
                    .iter()
                    .map(|a| self.value(*a).unwrap_or(Value::Bool(false)))
                    .collect();
                self.lookups.get(name, &arg_values)
            }
            ExprKind::ArrayElement { array, index } => {
                let idx = self.value(*index).and_then(|v| v.as_real())? as usize;
                match self.value(*array)? {
                    Value::Array(items) => items.get(idx).cloned(),
                    _ => None,
                }
            }
        }
    }

    pub fn add_listener(&mut self, id: ExprId, node: NodeId) {
        let l = Listener::Node(node);
        if !self.get(id).listeners.contains(&l) {
            self.get_mut(id).listeners.push(l);
        }
    }

    pub fn remove_listener(&mut self, id: ExprId, node: NodeId) {
        self.get_mut(id).listeners.retain(|l| *l != Listener::Node(node));
    }

    /// Notify every listener transitively reachable from `id`'s direct
    /// listener list, invoking `on_node` for each node reached. Composite
    /// expressions are walked (never treated as terminal) since a leaf
    /// change must propagate up through `And`/`Or`/`Not`/`ArrayElement`.
    fn propagate(&self, id: ExprId, on_node: &mut dyn FnMut(NodeId)) {
        for listener in self.get(id).listeners.clone() {
            match listener {
                Listener::Node(n) => on_node(n),
                Listener::Expr(parent) => self.propagate(parent, on_node),
            }
        }
    }

    /// Write a variable and notify everything downstream of it.
    pub fn assign_variable(
        &mut self,
        name: &str,
        value: crate::value::Value,
        on_node: &mut dyn FnMut(NodeId),
    ) {
        self.variables.set(name, value);
        if let Some(readers) = self.var_readers.get(name).cloned() {
            for r in readers {
                self.propagate(r, on_node);
            }
        }
    }

    pub fn retract_variable(&mut self, name: &str, on_node: &mut dyn FnMut(NodeId)) {
        self.variables.clear(name);
        if let Some(readers) = self.var_readers.get(name).cloned() {
            for r in readers {
                self.propagate(r, on_node);
            }
        }
    }

    /// Deliver a lookup update (spec §6) and notify dependents.
    pub fn update_lookup(
        &mut self,
        name: &str,
        args: &[crate::value::Value],
        value: crate::value::Value,
        on_node: &mut dyn FnMut(NodeId),
    ) {
        self.lookups.set(name, args, value);
        let key = (name.to_owned(), args.to_vec());
        if let Some(readers) = self.lookup_readers.get(&key).cloned() {
            for r in readers {
                self.propagate(r, on_node);
            }
        }
    }
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn activate_deactivate_round_trip_closes_subscriptions() {
        let mut arena = ExprArena::new();
        let v = arena.alloc(ExprKind::Variable("x".into()));
        let not_v = arena.alloc(ExprKind::Not(v));

        arena.activate(not_v);
        arena.activate(not_v);
        assert_eq!(arena.get(v).active_count, 1);

        arena.deactivate(not_v);
        assert_eq!(arena.get(v).active_count, 1, "still refcounted once");
        arena.deactivate(not_v);
        assert_eq!(arena.get(v).active_count, 0);
        assert!(arena.get(v).listeners.is_empty());
    }

    #[test]
    fn and_is_unknown_until_all_known_true() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Variable("a".into()));
        let b = arena.alloc(ExprKind::Variable("b".into()));
        let both = arena.alloc(ExprKind::And(SmallVec::from_slice(&[a, b])));
        arena.activate(both);

        assert_eq!(arena.value(both), None);
        let mut noop = |_: NodeId| {};
        arena.assign_variable("a", Value::Bool(true), &mut noop);
        assert_eq!(arena.value(both), None);
        arena.assign_variable("b", Value::Bool(true), &mut noop);
        assert_eq!(arena.value(both), Some(Value::Bool(true)));
    }

    #[test]
    fn and_short_circuits_on_known_false() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Constant(Value::Bool(false)));
        let b = arena.alloc(ExprKind::Variable("b".into()));
        let both = arena.alloc(ExprKind::And(SmallVec::from_slice(&[a, b])));
        assert_eq!(arena.value(both), Some(Value::Bool(false)));
    }
}
