//! Pending Sets
//!
//! A pending set is a worklist of nodes ordered by depth with no duplicates.
//! Both propagation passes drain one: the Update pass to recompute depths
//! after structural edits, the Eval pass to recompute values after data
//! edits. Popping the lowest depth first is what makes a node see all of its
//! parents settled before it runs.
//!
//! Nodes at the same depth come out in id order, so passes are
//! deterministic.

use std::collections::{BTreeSet, HashMap};

use super::node::NodeId;

/// Depth-ordered, duplicate-free worklist.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    order: BTreeSet<(u32, NodeId)>,
    members: HashMap<NodeId, u32>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node keyed at `depth`. Returns false if it was already pending.
    pub fn insert(&mut self, node: NodeId, depth: u32) -> bool {
        if self.members.contains_key(&node) {
            return false;
        }
        self.members.insert(node, depth);
        self.order.insert((depth, node));
        true
    }

    /// Remove and return the node with the lowest depth.
    pub fn pop_lowest(&mut self) -> Option<(u32, NodeId)> {
        let entry = self.order.pop_first()?;
        self.members.remove(&entry.1);
        Some(entry)
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        match self.members.remove(&node) {
            Some(depth) => {
                self.order.remove(&(depth, node));
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Re-key every pending node, used after depths moved under it.
    pub fn rekey(&mut self, mut depth_of: impl FnMut(NodeId) -> Option<u32>) {
        let nodes: Vec<NodeId> = self.members.keys().copied().collect();
        self.clear();
        for node in nodes {
            if let Some(depth) = depth_of(node) {
                self.insert(node, depth);
            }
        }
    }

    /// Pending nodes in pop order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> NodeId {
        NodeId::new(index, 0)
    }

    #[test]
    fn pops_in_depth_order() {
        let mut set = PendingSet::new();
        set.insert(id(0), 3);
        set.insert(id(1), 1);
        set.insert(id(2), 2);

        assert_eq!(set.pop_lowest(), Some((1, id(1))));
        assert_eq!(set.pop_lowest(), Some((2, id(2))));
        assert_eq!(set.pop_lowest(), Some((3, id(0))));
        assert_eq!(set.pop_lowest(), None);
    }

    #[test]
    fn ignores_duplicates() {
        let mut set = PendingSet::new();
        assert!(set.insert(id(5), 1));
        assert!(!set.insert(id(5), 0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.pop_lowest(), Some((1, id(5))));
    }

    #[test]
    fn ties_break_by_id() {
        let mut set = PendingSet::new();
        set.insert(id(9), 0);
        set.insert(id(2), 0);
        set.insert(id(4), 0);
        let order: Vec<_> = std::iter::from_fn(|| set.pop_lowest()).map(|(_, n)| n).collect();
        assert_eq!(order, vec![id(2), id(4), id(9)]);
    }

    #[test]
    fn remove_and_reinsert() {
        let mut set = PendingSet::new();
        set.insert(id(1), 4);
        assert!(set.remove(id(1)));
        assert!(!set.remove(id(1)));
        assert!(set.is_empty());
        assert!(set.insert(id(1), 2));
        assert_eq!(set.pop_lowest(), Some((2, id(1))));
    }

    #[test]
    fn rekey_moves_nodes_and_drops_missing() {
        let mut set = PendingSet::new();
        set.insert(id(1), 0);
        set.insert(id(2), 5);
        set.insert(id(3), 1);

        set.rekey(|node| match node.index() {
            1 => Some(7),
            2 => Some(0),
            _ => None,
        });

        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(0, id(2)), (7, id(1))]);
    }
}
