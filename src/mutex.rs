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

//! Named single-holder resources (spec §4.2), grounded on
//! `examples/original_source/src/exec/Mutex.cc`: `acquire` either takes the
//! mutex or joins the FIFO waiter set; `release` clears the holder and
//! re-marks every waiter as a candidate without granting anyone the mutex
//! implicitly — the next `step()` decides who (if anyone) gets it.

use crate::error::{ExecError, PlanErrorKind};
use crate::node::NodeId;
use std::collections::HashMap;

pub struct Mutex {
    name: String,
    holder: Option<NodeId>,
    /// Insertion-ordered waiter set; a node appears at most once.
    waiters: Vec<NodeId>,
}

impl Mutex {
    fn new(name: impl Into<String>) -> Self {
        Mutex {
            name: name.into(),
            holder: None,
            waiters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> Option<NodeId> {
        self.holder
    }

    pub fn waiters(&self) -> &[NodeId] {
        &self.waiters
    }

    /// `true` if `node` now holds the mutex. Acquiring a mutex one already
    /// holds is a plan error (spec §4.2 failure semantics), not a no-op.
    pub fn acquire(&mut self, node: NodeId) -> Result<bool, ExecError> {
        if self.holder == Some(node) {
            return Err(ExecError::Plan {
                node,
                detail: PlanErrorKind::MutexAlreadyHeld(self.name.clone()),
            });
        }
        if self.holder.is_some() {
            if !self.waiters.contains(&node) {
                self.waiters.push(node);
            }
            return Ok(false);
        }
        self.holder = Some(node);
        self.waiters.retain(|w| *w != node);
        Ok(true)
    }

    /// Clears the holder and invokes `on_waiter` once per waiter, in FIFO
    /// order, so the caller can re-mark each as a scheduler candidate.
    /// Releasing an unheld mutex is a fatal internal error (spec §4.2).
    pub fn release(&mut self, on_waiter: &mut dyn FnMut(NodeId)) -> Result<(), ExecError> {
        if self.holder.take().is_none() {
            return Err(ExecError::Invariant(format!(
                "release of unheld mutex '{}'",
                self.name
            )));
        }
        for waiter in &self.waiters {
            on_waiter(*waiter);
        }
        Ok(())
    }

    /// Drop a node from the waiter list without granting it the mutex
    /// (used when a waiting node leaves Waiting/Executing for other
    /// reasons, e.g. an ancestor failing it).
    pub fn remove_waiter(&mut self, node: NodeId) {
        self.waiters.retain(|w| *w != node);
    }
}

/// Process-wide registry of named mutexes (spec §4.2): `ensure` returns the
/// existing mutex or creates one. Mutexes are never destroyed mid-run.
#[derive(Default)]
pub struct MutexRegistry {
    mutexes: HashMap<String, Mutex>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, name: &str) -> &mut Mutex {
        self.mutexes
            .entry(name.to_owned())
            .or_insert_with(|| Mutex::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&Mutex> {
        self.mutexes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Mutex> {
        self.mutexes.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn nid(i: u32) -> NodeId {
        NodeId::for_test(i)
    }

    #[test]
    fn acquire_release_with_no_waiters_leaves_both_empty() {
        let mut m = Mutex::new("M");
        assert!(m.acquire(nid(1)).unwrap());
        assert_eq!(m.holder(), Some(nid(1)));
        m.release(&mut |_| panic!("no waiters expected")).unwrap();
        assert_eq!(m.holder(), None);
        assert!(m.waiters().is_empty());
    }

    #[test]
    fn second_acquirer_waits_fifo() {
        let mut m = Mutex::new("M");
        assert!(m.acquire(nid(1)).unwrap());
        assert!(!m.acquire(nid(2)).unwrap());
        assert!(!m.acquire(nid(3)).unwrap());
        assert_eq!(m.waiters(), &[nid(2), nid(3)]);

        let mut notified = Vec::new();
        m.release(&mut |n| notified.push(n)).unwrap();
        assert_eq!(notified, vec![nid(2), nid(3)]);
        assert_eq!(m.holder(), None, "release never implicitly grants");
    }

    #[test]
    fn acquiring_held_mutex_again_is_a_plan_error() {
        let mut m = Mutex::new("M");
        m.acquire(nid(1)).unwrap();
        let err = m.acquire(nid(1)).unwrap_err();
        assert!(matches!(
            err,
            ExecError::Plan {
                detail: PlanErrorKind::MutexAlreadyHeld(_),
                ..
            }
        ));
    }

    #[test]
    fn releasing_unheld_mutex_is_fatal() {
        let mut m = Mutex::new("M");
        let err = m.release(&mut |_| {}).unwrap_err();
        assert!(matches!(err, ExecError::Invariant(_)));
    }

    #[test]
    fn registry_ensure_is_idempotent() {
        let mut reg = MutexRegistry::new();
        reg.ensure("armA").acquire(nid(1)).unwrap();
        assert_eq!(reg.get("armA").unwrap().holder(), Some(nid(1)));
        assert!(reg.ensure("armA").holder().is_some());
    }
}
