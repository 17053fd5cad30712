//! Dependency Graph
//!
//! Parent/child linkage over the node arena, with cycle rejection and depth
//! bookkeeping.
//!
//! # Depth
//!
//! A node's depth is `0` without parents, otherwise one more than the
//! deepest parent. Structural edits do not fix depths on the spot; they pend
//! the edited node in the Update set and [`DependencyGraph::drain_update`]
//! settles everything, lowest depth first, pushing changes down to children.
//!
//! # Cycles
//!
//! Every edge insertion first walks the would-be child's descendants. If the
//! would-be parent is among them the edit is rejected before anything is
//! touched.

use std::collections::HashSet;

use super::node::{Node, NodeId, NodeKind};
use super::pending::PendingSet;
use super::store::NodeStore;
use crate::error::{GraphError, Result};

/// The dependency graph and its Update worklist.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) store: NodeStore,
    pub(crate) update: PendingSet,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.store.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.store.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.store.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.store.iter()
    }

    pub fn depth(&self, id: NodeId) -> Result<u32> {
        Ok(self.store.get(id)?.depth())
    }

    /// Nodes waiting for depth recomputation.
    pub fn pending_update(&self) -> &PendingSet {
        &self.update
    }

    /// Add a node with the given ordered parents.
    ///
    /// Parents must be live data nodes, and only derived kinds may have
    /// parents. A new node has no children, so it cannot close a cycle.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if !node.parents().is_empty() && !node.kind().is_derived() {
            return Err(GraphError::UnexpectedParents(node.kind().label().to_string()));
        }
        for &parent in node.parents() {
            self.check_data_parent(parent)?;
        }

        let parents: Vec<NodeId> = node.parents().to_vec();
        let depth = self.depth_from(&parents)?;
        let id = self.store.insert(node);
        self.store.get_mut(id)?.set_depth(depth);
        for parent in parents {
            self.store.get_mut(parent)?.add_child(id);
        }
        if !self.update.is_empty() {
            // Parent depths may still be stale; let the next drain confirm.
            self.update.insert(id, depth);
        }
        Ok(id)
    }

    /// Unlink and remove a node. Fails if anything still depends on it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node> {
        let node = self.store.get(id)?;
        if !node.children().is_empty() {
            return Err(GraphError::DanglingChild {
                node: id,
                children: node.children().len(),
            });
        }
        if let Some(members) = node.members() {
            if !members.is_empty() {
                return Err(GraphError::DanglingChild {
                    node: id,
                    children: members.len(),
                });
            }
        }

        self.detach_scope(id)?;
        let node = self.store.remove(id)?;
        for &parent in node.parents() {
            if let Ok(parent) = self.store.get_mut(parent) {
                parent.remove_child(id);
            }
        }
        self.update.remove(id);
        Ok(node)
    }

    /// Make `child` depend on `parent`.
    ///
    /// Returns `Ok(false)` if the link already existed.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        self.check_data_parent(parent)?;
        let child_node = self.store.get(child)?;
        if !child_node.kind().is_derived() {
            return Err(GraphError::WrongKind {
                node: child,
                expected: "a derived node",
            });
        }
        if child_node.parents().contains(&parent) {
            return Ok(false);
        }
        if self.would_cycle(parent, child)? {
            return Err(GraphError::GraphCycle { parent, child });
        }

        self.store.get_mut(parent)?.add_child(child);
        let child_node = self.store.get_mut(child)?;
        child_node.parents_mut().push(parent);
        let depth = child_node.depth();
        self.update.insert(child, depth);
        Ok(true)
    }

    /// Drop every link from `parent` to `child`.
    ///
    /// Returns `Ok(false)` if there was no such link.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        self.store.get(parent)?;
        let child_node = self.store.get_mut(child)?;
        if !child_node.parents().contains(&parent) {
            return Ok(false);
        }
        child_node.parents_mut().retain(|p| *p != parent);
        let depth = child_node.depth();
        self.store.get_mut(parent)?.remove_child(child);
        self.update.insert(child, depth);
        Ok(true)
    }

    /// Replace a node's ordered parent list in one step.
    pub fn set_parents(&mut self, id: NodeId, parents: &[NodeId]) -> Result<()> {
        let node = self.store.get(id)?;
        if !node.kind().is_derived() && !parents.is_empty() {
            return Err(GraphError::WrongKind {
                node: id,
                expected: "a derived node",
            });
        }
        for &parent in parents {
            self.check_data_parent(parent)?;
            if self.would_cycle(parent, id)? {
                return Err(GraphError::GraphCycle { parent, child: id });
            }
        }

        let old: Vec<NodeId> = self.store.get(id)?.parents().to_vec();
        for parent in old.iter().filter(|p| !parents.contains(p)) {
            self.store.get_mut(*parent)?.remove_child(id);
        }
        for &parent in parents {
            self.store.get_mut(parent)?.add_child(id);
        }
        let node = self.store.get_mut(id)?;
        let list = node.parents_mut();
        list.clear();
        list.extend_from_slice(parents);
        let depth = node.depth();
        self.update.insert(id, depth);
        Ok(())
    }

    /// Whether `to` can be reached from `from` by following child links.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> Result<bool> {
        if from == to {
            return Ok(true);
        }
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            for &child in self.store.get(id)?.children() {
                if child == to {
                    return Ok(true);
                }
                if visited.insert(child) {
                    stack.push(child);
                }
            }
        }
        Ok(false)
    }

    /// An edge `parent -> child` closes a cycle when `parent` already
    /// depends on `child`.
    fn would_cycle(&self, parent: NodeId, child: NodeId) -> Result<bool> {
        self.reaches(child, parent)
    }

    fn check_data_parent(&self, parent: NodeId) -> Result<()> {
        if self.store.get(parent)?.kind().is_data() {
            Ok(())
        } else {
            Err(GraphError::WrongKind {
                node: parent,
                expected: "a data node",
            })
        }
    }

    fn depth_from(&self, parents: &[NodeId]) -> Result<u32> {
        let mut depth = None;
        for &parent in parents {
            let d = self.store.get(parent)?.depth();
            depth = Some(depth.map_or(d, |m: u32| m.max(d)));
        }
        Ok(depth.map_or(0, |m| m + 1))
    }

    /// Recompute depths for every node pending in the Update set.
    ///
    /// Calls `on_touch(node, depth)` for each node processed, with its
    /// recomputed depth. Returns how many depths changed.
    pub fn drain_update(&mut self, mut on_touch: impl FnMut(NodeId, u32)) -> usize {
        let mut changed = 0;
        while let Some((_, id)) = self.update.pop_lowest() {
            let Ok(node) = self.store.get(id) else {
                continue;
            };
            let parents: Vec<NodeId> = node.parents().to_vec();
            let stored = node.depth();
            let Ok(depth) = self.depth_from(&parents) else {
                continue;
            };
            on_touch(id, depth);
            if depth == stored {
                continue;
            }
            changed += 1;

            let children: Vec<NodeId> = match self.store.get_mut(id) {
                Ok(node) => {
                    node.set_depth(depth);
                    node.children().iter().copied().collect()
                }
                Err(_) => continue,
            };
            for child in children {
                if let Ok(child_node) = self.store.get(child) {
                    self.update.insert(child, child_node.depth());
                }
            }
        }
        changed
    }

    /// Check every node's depth against its parents.
    ///
    /// Only meaningful once the Update set has drained.
    pub fn depths_consistent(&self) -> bool {
        self.store.iter().all(|(_, node)| {
            self.depth_from(node.parents())
                .map(|d| d == node.depth())
                .unwrap_or(false)
        })
    }

    pub(crate) fn new_namespace(&mut self) -> NodeId {
        self.store.insert(Node::new(
            NodeKind::Namespace {
                members: Default::default(),
            },
            &[],
            None,
        ))
    }
}
