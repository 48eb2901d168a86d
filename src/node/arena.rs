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

//! Index-based storage for the node tree (spec Design Notes §9): parent and
//! child links are indices into this arena, not owning references, so the
//! inherently cyclic parent/child/sibling graph never needs `Rc`/`Weak`.
//! A stale [`NodeId`] (one whose slot has since been reclaimed and reused
//! for an unrelated node) is caught by a generation counter rather than
//! silently aliasing the wrong node.

use super::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[cfg(test)]
    pub fn for_test(index: u32) -> Self {
        NodeId {
            index,
            generation: 0,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

enum Slot {
    Occupied { node: Node, generation: u32 },
    Vacant { next_free: Option<u32>, generation: u32 },
}

/// Owns every [`Node`] in every plan and library the executive has been
/// given. Reclaiming a finished root frees its whole subtree's slots back
/// onto the free list.
pub struct PlanArena {
    slots: Vec<Slot>,
    free_head: Option<u32>,
}

impl PlanArena {
    pub fn new() -> Self {
        PlanArena {
            slots: Vec::new(),
            free_head: None,
        }
    }

    pub fn insert(&mut self, build: impl FnOnce(NodeId) -> Node) -> NodeId {
        if let Some(index) = self.free_head {
            let generation = match &self.slots[index as usize] {
                Slot::Vacant { generation, .. } => *generation,
                Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
            };
            let id = NodeId { index, generation };
            let node = build(id);
            let next_free = match &self.slots[index as usize] {
                Slot::Vacant { next_free, .. } => *next_free,
                Slot::Occupied { .. } => unreachable!(),
            };
            self.free_head = next_free;
            self.slots[index as usize] = Slot::Occupied { node, generation };
            id
        } else {
            let index = self.slots.len() as u32;
            let id = NodeId {
                index,
                generation: 0,
            };
            let node = build(id);
            self.slots.push(Slot::Occupied {
                node,
                generation: 0,
            });
            id
        }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        match &self.slots[id.index as usize] {
            Slot::Occupied { node, generation } if *generation == id.generation => node,
            _ => panic!("dangling NodeId {id}"),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id.index as usize] {
            Slot::Occupied { node, generation } if *generation == id.generation => node,
            _ => panic!("dangling NodeId {id}"),
        }
    }

    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        match &self.slots[id.index as usize] {
            Slot::Occupied { node, generation } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    /// Reclaim the slot for reuse, bumping its generation so any lingering
    /// `NodeId` referencing it is detected as dangling rather than aliased.
    pub fn remove(&mut self, id: NodeId) {
        let generation = match &self.slots[id.index as usize] {
            Slot::Occupied { generation, .. } if *generation == id.generation => *generation,
            _ => panic!("remove of dangling NodeId {id}"),
        };
        self.slots[id.index as usize] = Slot::Vacant {
            next_free: self.free_head,
            generation: generation + 1,
        };
        self.free_head = Some(id.index);
    }
}

impl Default for PlanArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeBody, NodeType};

    fn empty_node(id: NodeId) -> Node {
        Node::new(id, "n".into(), NodeType::Empty, NodeBody::Empty, None)
    }

    #[test]
    fn remove_then_insert_detects_stale_id() {
        let mut arena = PlanArena::new();
        let a = arena.insert(empty_node);
        arena.remove(a);
        let _b = arena.insert(empty_node);
        assert!(arena.try_get(a).is_none(), "stale id must not alias reused slot");
    }
}
