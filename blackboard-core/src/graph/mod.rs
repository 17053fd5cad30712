//! Dependency Graph
//!
//! This module implements the node graph that every Blackboard expression
//! compiles into.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes hold a value, a trigger state, or (for namespaces and function
//!   groups) nothing at all
//! - Edges run from parent to child: if C reads A, then A is a parent of C
//!
//! Nodes carry a *depth*, the length of the longest path from a parentless
//! node. Both propagation passes process nodes in ascending depth, which is
//! what guarantees that a node only runs after all of its parents settled.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena addressed by generation-checked ids rather than
//!    behind shared pointers, so parent/child links are plain index lists and
//!    cycle detection is a walk over indices.
//!
//! 2. Parents are an ordered list (they are evaluation arguments) while
//!    children are a set.
//!
//! 3. Structural edits only pend work. Depths are repaired by draining the
//!    Update set, never in the middle of an edit.

mod dag;
mod namespace;
mod node;
mod pending;
mod store;

pub use dag::DependencyGraph;
pub use namespace::{is_valid_name, split_path};
pub use node::{Node, NodeId, NodeKind};
pub(crate) use node::Staged;
pub use pending::PendingSet;
pub use store::NodeStore;
