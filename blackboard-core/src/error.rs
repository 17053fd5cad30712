//! Error types for graph construction and editing.
//!
//! Every error is reported to the caller of the mutating operation that
//! caused it. Evaluation itself never fails; see [`crate::reactive::ValueRule`].

use thiserror::Error;

use crate::graph::NodeId;
use crate::types::DataType;

/// Result type alias using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building or editing a graph.
///
/// A failed operation never leaves a partial edit behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The requested edge would make `parent` depend on itself.
    #[error("adding {child} as a child of {parent} would create a cycle")]
    GraphCycle { parent: NodeId, child: NodeId },

    /// The scope already holds a member with this name.
    #[error("name '{name}' is already taken in scope {scope}")]
    DuplicateName { scope: NodeId, name: String },

    /// Not a valid identifier or dotted path.
    #[error("invalid name: '{0}'")]
    InvalidName(String),

    /// No definition in the group accepts these argument types.
    #[error("no overload of '{name}' matches ({})", format_types(.args))]
    NoOverloadMatch { name: String, args: Vec<DataType> },

    /// The cast registry has no conversion between the two types.
    #[error("no conversion from {from} to {to}")]
    NoCastPath { from: DataType, to: DataType },

    /// A conversion exists but the source node cannot feed it.
    #[error("node {node} cannot be converted to {to}")]
    CastRejected { node: NodeId, to: DataType },

    /// Removing a node that still has children or members.
    #[error("node {node} still has {children} dependent node(s)")]
    DanglingChild { node: NodeId, children: usize },

    /// Only derived nodes may be created with parents.
    #[error("a {0} node cannot have parents")]
    UnexpectedParents(String),

    /// The id is stale or was never issued by this engine.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Namespace lookup failed.
    #[error("'{0}' not found")]
    NotFound(String),

    /// The operation does not apply to this kind of node.
    #[error("node {node} is not {expected}")]
    WrongKind { node: NodeId, expected: &'static str },

    /// A value of the wrong type was supplied for a node.
    #[error("node {node} holds {expected}, got {found}")]
    TypeMismatch {
        node: NodeId,
        expected: DataType,
        found: DataType,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn format_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
