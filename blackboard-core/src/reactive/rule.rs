//! Node Rules
//!
//! Derived nodes delegate their recompute step to a rule object. The engine
//! owns ordering, change detection and propagation; a rule only maps the
//! current state of the node's parents to a result.
//!
//! Rules must not fail. A rule that cannot produce a value returns `None`,
//! which the engine treats as "no change" for this pass.

use std::fmt::Debug;

use crate::types::Value;

/// The state of one parent as seen by a rule, in parent order.
#[derive(Debug, Clone, Copy)]
pub struct Arg<'a> {
    /// The parent's value. Always `None` for triggers, and for value nodes
    /// that have not been given a value yet.
    pub value: Option<&'a Value>,

    /// Whether the parent changed (value node) or fired (trigger) in the
    /// current pass.
    pub fired: bool,

    /// Whether the parent is a trigger.
    pub is_trigger: bool,
}

impl<'a> Arg<'a> {
    /// A value parent that has no value yet. Formulas skip evaluation while
    /// any of their parents is missing.
    pub fn is_missing(&self) -> bool {
        !self.is_trigger && self.value.is_none()
    }
}

/// Computes the value of a formula node.
pub trait ValueRule: Send + Sync + Debug {
    /// Name used in logs and node descriptions.
    fn name(&self) -> &str;

    /// Compute the node's value from its parents.
    ///
    /// `current` is the value the node holds now, for rules that accumulate.
    /// Only called when no value parent is missing.
    fn compute(&self, args: &[Arg<'_>], current: Option<&Value>) -> Option<Value>;
}

/// Decides whether a trigger node fires.
pub trait TriggerRule: Send + Sync + Debug {
    /// Name used in logs and node descriptions.
    fn name(&self) -> &str;

    fn fires(&self, args: &[Arg<'_>]) -> bool;
}
