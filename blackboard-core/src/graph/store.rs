//! Node Arena
//!
//! Nodes live in a dense vector of slots. A freed slot bumps its generation
//! before reuse, which is what keeps stale [`NodeId`]s from aliasing.

use super::node::{Node, NodeId};
use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Dense storage for graph nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node, reusing a freed slot when there is one.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// Take a node out and retire its id.
    pub fn remove(&mut self, id: NodeId) -> Result<Node> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .ok_or(GraphError::UnknownNode(id))?;
        let node = slot.node.take().ok_or(GraphError::UnknownNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        self.live -= 1;
        Ok(node)
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Look up a live node for mutation.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no node is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    fn trigger() -> Node {
        Node::new(NodeKind::TriggerInput, &[], None)
    }

    #[test]
    fn insert_and_remove() {
        let mut store = NodeStore::new();
        let a = store.insert(trigger());
        let b = store.insert(trigger());
        assert_eq!(store.len(), 2);

        store.remove(a).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(a).is_err());
        assert!(store.get(b).is_ok());
    }

    #[test]
    fn reused_slot_rejects_stale_id() {
        let mut store = NodeStore::new();
        let a = store.insert(trigger());
        store.remove(a).unwrap();

        let b = store.insert(trigger());
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(store.get(a).unwrap_err(), GraphError::UnknownNode(a));
        assert!(store.remove(a).is_err());
        assert!(store.contains(b));
    }

    #[test]
    fn iter_skips_free_slots() {
        let mut store = NodeStore::new();
        let a = store.insert(trigger());
        let b = store.insert(trigger());
        let c = store.insert(trigger());
        store.remove(b).unwrap();

        let ids: Vec<_> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }
}
