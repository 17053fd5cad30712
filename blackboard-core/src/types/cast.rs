//! Cast Registry
//!
//! Conversions between data types, keyed by `(source, destination)`. A rule
//! with an implicit weight may be inserted automatically when a call needs
//! the destination type; the weight is its distance in overload scoring.
//! A rule without one is explicit-only and applies only when the conversion
//! is requested by name.
//!
//! A type always matches itself at distance 0 without any rule.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::value::FloatingPoint;
use super::{DataType, Value};
use crate::builtins::Changed;
use crate::reactive::{Arg, NodeSpec, ValueRule};

/// How a conversion node computes its output.
#[derive(Clone, Copy)]
pub enum Conversion {
    /// A formula applying `map` to its single parent.
    Map {
        name: &'static str,
        map: fn(&Value) -> Value,
    },
    /// A trigger firing whenever its single parent changes.
    OnChange,
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Map { name, .. } => f.debug_tuple("Map").field(name).finish(),
            Conversion::OnChange => f.write_str("OnChange"),
        }
    }
}

/// A registered conversion.
#[derive(Debug, Clone, Copy)]
pub struct CastRule {
    /// Distance when used implicitly. `None` for explicit-only rules.
    pub implicit_weight: Option<u32>,
    pub conversion: Conversion,
}

impl CastRule {
    /// Describe the conversion node this rule builds for destination `to`.
    pub fn node_spec(&self, to: DataType) -> NodeSpec {
        match self.conversion {
            Conversion::Map { name, map } => NodeSpec::formula(to, Arc::new(Convert { name, map })),
            Conversion::OnChange => NodeSpec::trigger(Arc::new(Changed)),
        }
    }
}

/// Formula behind a [`Conversion::Map`] node.
#[derive(Clone, Copy)]
struct Convert {
    name: &'static str,
    map: fn(&Value) -> Value,
}

impl fmt::Debug for Convert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convert").field("name", &self.name).finish()
    }
}

impl ValueRule for Convert {
    fn name(&self) -> &str {
        self.name
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        args.first().and_then(|arg| arg.value).map(self.map)
    }
}

/// The cast graph between data types.
#[derive(Debug, Clone, Default)]
pub struct CastRegistry {
    rules: HashMap<(DataType, DataType), CastRule>,
}

impl CastRegistry {
    /// A registry with no conversions at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard Blackboard cast graph.
    pub fn standard() -> Self {
        use DataType::*;

        let mut registry = Self::new();
        registry.register_implicit(Bool, Int, 1, map("bool_to_int", bool_to_int));
        registry.register_implicit(Int, Double, 1, map("int_to_double", int_to_double));
        registry.register_implicit(Bool, Double, 2, map("bool_to_double", bool_to_double));

        registry.register_explicit(Double, Int, map("double_to_int", double_to_int));
        registry.register_explicit(Int, Bool, map("int_to_bool", int_to_bool));
        registry.register_explicit(Double, Bool, map("double_to_bool", double_to_bool));
        registry.register_explicit(Text, Int, map("text_to_int", text_to_int));
        registry.register_explicit(Text, Double, map("text_to_double", text_to_double));
        for source in [Bool, Int, Double] {
            registry.register_explicit(source, Text, map("to_text", to_text));
        }
        for source in [Bool, Int, Double, Text] {
            registry.register_explicit(source, Trigger, Conversion::OnChange);
        }
        registry
    }

    pub fn register_implicit(
        &mut self,
        from: DataType,
        to: DataType,
        weight: u32,
        conversion: Conversion,
    ) {
        self.rules.insert(
            (from, to),
            CastRule {
                implicit_weight: Some(weight),
                conversion,
            },
        );
    }

    pub fn register_explicit(&mut self, from: DataType, to: DataType, conversion: Conversion) {
        self.rules.insert(
            (from, to),
            CastRule {
                implicit_weight: None,
                conversion,
            },
        );
    }

    pub fn rule(&self, from: DataType, to: DataType) -> Option<&CastRule> {
        self.rules.get(&(from, to))
    }

    /// Distance of an implicit conversion, 0 for identity.
    pub fn match_implicit(&self, from: DataType, to: DataType) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        self.rule(from, to).and_then(|rule| rule.implicit_weight)
    }

    /// Whether `from` converts to `to` when asked for explicitly.
    pub fn allows_explicit(&self, from: DataType, to: DataType) -> bool {
        from == to || self.rule(from, to).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn map(name: &'static str, map: fn(&Value) -> Value) -> Conversion {
    Conversion::Map { name, map }
}

fn bool_to_int(v: &Value) -> Value {
    Value::Int(v.as_bool().map_or(0, i64::from))
}

fn int_to_double(v: &Value) -> Value {
    Value::Double(v.as_int().map_or(0.0, |i| i as f64))
}

fn bool_to_double(v: &Value) -> Value {
    Value::Double(if v.as_bool().unwrap_or(false) { 1.0 } else { 0.0 })
}

fn double_to_int(v: &Value) -> Value {
    Value::Int(v.as_double().map_or(0, |d| d.truncate_to_int()))
}

fn int_to_bool(v: &Value) -> Value {
    Value::Bool(v.as_int().is_some_and(|i| i != 0))
}

fn double_to_bool(v: &Value) -> Value {
    Value::Bool(v.as_double().is_some_and(|d| d.is_number() && d != 0.0))
}

fn to_text(v: &Value) -> Value {
    Value::Text(v.to_string())
}

fn text_to_int(v: &Value) -> Value {
    Value::Int(v.as_text().and_then(|s| s.trim().parse().ok()).unwrap_or(0))
}

fn text_to_double(v: &Value) -> Value {
    Value::Double(v.as_text().and_then(|s| s.trim().parse().ok()).unwrap_or(0.0))
}
