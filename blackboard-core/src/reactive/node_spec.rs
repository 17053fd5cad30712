//! Node Specs
//!
//! A [`NodeSpec`] describes a node before it exists: its kind and, for
//! inputs and constants, the value it starts with.

use std::sync::Arc;

use super::rule::{TriggerRule, ValueRule};
use crate::graph::NodeKind;
use crate::types::{DataType, Value};

/// Blueprint passed to [`crate::Engine::create_node`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: NodeKind,
    initial: Option<Value>,
}

impl NodeSpec {
    /// An unset input of the given type.
    pub fn input(data_type: DataType) -> Self {
        Self {
            kind: NodeKind::Input { data_type },
            initial: None,
        }
    }

    /// An input starting at `value`.
    pub fn input_with(value: Value) -> Self {
        Self {
            kind: NodeKind::Input {
                data_type: value.data_type(),
            },
            initial: Some(value),
        }
    }

    pub fn constant(value: Value) -> Self {
        Self {
            kind: NodeKind::Constant,
            initial: Some(value),
        }
    }

    /// A formula producing `data_type`. Its first value is computed when the
    /// node is created.
    pub fn formula(data_type: DataType, rule: Arc<dyn ValueRule>) -> Self {
        Self {
            kind: NodeKind::Formula { data_type, rule },
            initial: None,
        }
    }

    pub fn trigger_input() -> Self {
        Self {
            kind: NodeKind::TriggerInput,
            initial: None,
        }
    }

    pub fn trigger(rule: Arc<dyn TriggerRule>) -> Self {
        Self {
            kind: NodeKind::Trigger { rule },
            initial: None,
        }
    }

    /// Seed a value. For formulas this is the value held until the first
    /// successful recompute.
    pub fn with_value(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    pub(crate) fn into_parts(self) -> (NodeKind, Option<Value>) {
        (self.kind, self.initial)
    }
}
