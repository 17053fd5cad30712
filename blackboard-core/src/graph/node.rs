//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::reactive::{TriggerRule, ValueRule};
use crate::types::{DataType, FunctionGroup, Value};

/// Identifier for a node in the dependency graph.
///
/// Ids are arena slots plus a generation counter, so an id held after its
/// node was removed never resolves to a node created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A value set from outside the graph. Has no parents.
    Input { data_type: DataType },

    /// A literal. Has no parents and only changes through folding.
    Constant,

    /// A value computed from its parents.
    Formula {
        data_type: DataType,
        rule: Arc<dyn ValueRule>,
    },

    /// A trigger provoked from outside the graph. Has no parents.
    TriggerInput,

    /// A trigger that fires based on its parents.
    Trigger { rule: Arc<dyn TriggerRule> },

    /// A scope owning named members. Never evaluates.
    Namespace { members: BTreeMap<String, NodeId> },

    /// A named collection of overloads. Never evaluates.
    FunctionGroup(Arc<FunctionGroup>),
}

impl NodeKind {
    /// Whether nodes of this kind may have data parents.
    pub fn is_derived(&self) -> bool {
        matches!(self, NodeKind::Formula { .. } | NodeKind::Trigger { .. })
    }

    /// Whether nodes of this kind take part in evaluation at all.
    pub fn is_data(&self) -> bool {
        !matches!(self, NodeKind::Namespace { .. } | NodeKind::FunctionGroup(_))
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, NodeKind::TriggerInput | NodeKind::Trigger { .. })
    }

    /// Short label used in logs.
    pub fn label(&self) -> &str {
        match self {
            NodeKind::Input { .. } => "input",
            NodeKind::Constant => "constant",
            NodeKind::Formula { rule, .. } => rule.name(),
            NodeKind::TriggerInput => "trigger input",
            NodeKind::Trigger { rule } => rule.name(),
            NodeKind::Namespace { .. } => "namespace",
            NodeKind::FunctionGroup(_) => "function group",
        }
    }
}

/// A change applied to an input or constant at the start of its next
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Staged {
    Value(Value),
    Provoke,
}

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,

    /// Ordered data parents. Order matters for evaluation arguments and the
    /// same parent may appear more than once.
    parents: SmallVec<[NodeId; 2]>,

    /// Nodes that read from this node.
    children: IndexSet<NodeId>,

    /// Longest path from a parentless node.
    depth: u32,

    value: Option<Value>,
    provoked: bool,
    pub(crate) staged: Option<Staged>,

    /// Last pass in which the value changed or the trigger fired. 0 = never.
    changed_in: u64,

    name: Option<String>,
    scope: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parents: &[NodeId], value: Option<Value>) -> Self {
        Self {
            kind,
            parents: SmallVec::from_slice(parents),
            children: IndexSet::new(),
            depth: 0,
            value,
            provoked: false,
            staged: None,
            changed_in: 0,
            name: None,
            scope: None,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The data type this node produces, if it is a data node.
    pub fn data_type(&self) -> Option<DataType> {
        match &self.kind {
            NodeKind::Input { data_type } | NodeKind::Formula { data_type, .. } => Some(*data_type),
            NodeKind::Constant => self.value.as_ref().map(Value::data_type),
            NodeKind::TriggerInput | NodeKind::Trigger { .. } => Some(DataType::Trigger),
            NodeKind::Namespace { .. } | NodeKind::FunctionGroup(_) => None,
        }
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub(crate) fn parents_mut(&mut self) -> &mut SmallVec<[NodeId; 2]> {
        &mut self.parents
    }

    pub fn children(&self) -> &IndexSet<NodeId> {
        &self.children
    }

    /// Register a dependent. Returns false if it was already present.
    pub(crate) fn add_child(&mut self, child: NodeId) -> bool {
        self.children.insert(child)
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) -> bool {
        self.children.shift_remove(&child)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub(crate) fn set_value(&mut self, value: Value, pass: u64) {
        self.value = Some(value);
        self.changed_in = pass;
    }

    pub fn is_provoked(&self) -> bool {
        self.provoked
    }

    pub(crate) fn provoke(&mut self, pass: u64) {
        self.provoked = true;
        self.changed_in = pass;
    }

    pub(crate) fn reset(&mut self) {
        self.provoked = false;
    }

    /// Whether the value changed or the trigger fired during `pass`.
    pub fn fired_in(&self, pass: u64) -> bool {
        pass != 0 && self.changed_in == pass
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn scope(&self) -> Option<NodeId> {
        self.scope
    }

    pub(crate) fn set_identity(&mut self, name: Option<String>, scope: Option<NodeId>) {
        self.name = name;
        self.scope = scope;
    }

    /// Members of a namespace node.
    pub fn members(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Namespace { members } => Some(members),
            _ => None,
        }
    }

    pub(crate) fn members_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Namespace { members } => Some(members),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_node_reports_declared_type() {
        let node = Node::new(NodeKind::Input { data_type: DataType::Int }, &[], None);
        assert_eq!(node.data_type(), Some(DataType::Int));
        assert!(node.value().is_none());
        assert!(!node.kind().is_derived());
    }

    #[test]
    fn constant_type_follows_value() {
        let node = Node::new(NodeKind::Constant, &[], Some(Value::Text("x".into())));
        assert_eq!(node.data_type(), Some(DataType::Text));
    }

    #[test]
    fn containers_have_no_data_type() {
        let ns = Node::new(NodeKind::Namespace { members: BTreeMap::new() }, &[], None);
        assert_eq!(ns.data_type(), None);
        assert!(!ns.kind().is_data());
        assert!(ns.members().is_some());
    }

    #[test]
    fn children_are_a_set_in_insertion_order() {
        let mut node = Node::new(NodeKind::TriggerInput, &[], None);
        let a = NodeId::new(3, 0);
        let b = NodeId::new(1, 0);

        assert!(node.add_child(a));
        assert!(node.add_child(b));
        assert!(!node.add_child(a));
        assert_eq!(node.children().iter().copied().collect::<Vec<_>>(), vec![a, b]);

        assert!(node.remove_child(a));
        assert!(!node.remove_child(a));
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn provoke_and_reset() {
        let mut node = Node::new(NodeKind::TriggerInput, &[], None);
        assert!(!node.fired_in(1));

        node.provoke(1);
        assert!(node.is_provoked());
        assert!(node.fired_in(1));
        assert!(!node.fired_in(2));

        node.reset();
        assert!(!node.is_provoked());
    }

    #[test]
    fn generations_distinguish_ids() {
        assert_ne!(NodeId::new(0, 0), NodeId::new(0, 1));
        assert_eq!(NodeId::new(4, 2).to_string(), "#4");
    }
}
