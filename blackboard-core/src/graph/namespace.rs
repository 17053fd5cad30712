//! Namespaces
//!
//! Named nodes live inside a namespace node, which keeps its members sorted
//! by name. A node's scope is a separate link from its data parents: it never
//! becomes an evaluation argument and does not count toward depth. It follows
//! the same discipline though. Every check runs before any link is created,
//! and a namespace can never end up inside itself.

use super::dag::DependencyGraph;
use super::node::NodeId;
use crate::error::{GraphError, Result};

/// Whether `name` is a valid member name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a dotted path into validated segments.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().all(|s| is_valid_name(s)) {
        Ok(segments)
    } else {
        Err(GraphError::InvalidName(path.to_string()))
    }
}

impl DependencyGraph {
    /// Validate placing `node` (or a node about to be created, if `None`)
    /// into `scope` under `name`.
    pub fn check_scope(&self, node: Option<NodeId>, scope: NodeId, name: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(GraphError::InvalidName(name.to_string()));
        }
        let members = self
            .node(scope)?
            .members()
            .ok_or(GraphError::WrongKind {
                node: scope,
                expected: "a namespace",
            })?;
        if let Some(existing) = members.get(name) {
            if Some(*existing) != node {
                return Err(GraphError::DuplicateName {
                    scope,
                    name: name.to_string(),
                });
            }
        }
        if let Some(node) = node {
            self.node(node)?;
            if self.encloses(node, scope)? {
                return Err(GraphError::GraphCycle {
                    parent: scope,
                    child: node,
                });
            }
        }
        Ok(())
    }

    /// Name `node` and move it into `scope`.
    pub fn set_scope(&mut self, node: NodeId, scope: NodeId, name: &str) -> Result<()> {
        self.check_scope(Some(node), scope, name)?;
        self.detach_scope(node)?;
        if let Some(members) = self.node_mut(scope)?.members_mut() {
            members.insert(name.to_string(), node);
        }
        self.node_mut(node)?
            .set_identity(Some(name.to_string()), Some(scope));
        Ok(())
    }

    /// Remove `node` from its scope, if it has one.
    pub(crate) fn detach_scope(&mut self, node: NodeId) -> Result<()> {
        let (name, scope) = {
            let n = self.node(node)?;
            match (n.name(), n.scope()) {
                (Some(name), Some(scope)) => (name.to_string(), scope),
                _ => return Ok(()),
            }
        };
        if let Ok(scope_node) = self.node_mut(scope) {
            if let Some(members) = scope_node.members_mut() {
                members.remove(&name);
            }
        }
        self.node_mut(node)?.set_identity(None, None);
        Ok(())
    }

    /// Whether `outer` is `inner` or one of its enclosing scopes.
    pub fn encloses(&self, outer: NodeId, inner: NodeId) -> Result<bool> {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return Ok(true);
            }
            current = self.node(id)?.scope();
        }
        Ok(false)
    }

    /// Resolve a dotted path starting at `scope`.
    pub fn lookup_from(&self, scope: NodeId, path: &str) -> Result<NodeId> {
        let mut current = scope;
        for segment in split_path(path)? {
            current = self
                .node(current)?
                .members()
                .and_then(|members| members.get(segment))
                .copied()
                .ok_or_else(|| GraphError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    /// Dotted path of a named node, outermost scope first. The root scope
    /// is unnamed and contributes nothing.
    pub fn path_of(&self, node: NodeId) -> Result<Option<String>> {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            if let Some(name) = n.name() {
                segments.push(name.to_string());
            }
            current = n.scope();
        }
        if segments.is_empty() {
            return Ok(None);
        }
        segments.reverse();
        Ok(Some(segments.join(".")))
    }
}
