//! Type Layer
//!
//! The catalogue of data kinds, the cast graph between them, and function
//! overload resolution. None of this runs during evaluation: the front end
//! consults it while building nodes, to decide which definition a call
//! means and which conversion nodes to insert in front of its arguments.

mod cast;
mod function;
mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cast::{CastRegistry, CastRule, Conversion};
pub use function::{Behavior, FunctionDef, FunctionGroup, Resolution};
pub use value::{Additive, Bitwise, Comparable, FloatingPoint, Multiplicative, Value};

/// A kind of value or trigger a node can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    Double,
    Text,
    Trigger,
}

impl DataType {
    /// Every type in the catalogue.
    pub const ALL: [DataType; 5] = [
        DataType::Bool,
        DataType::Int,
        DataType::Double,
        DataType::Text,
        DataType::Trigger,
    ];

    pub fn is_trigger(&self) -> bool {
        matches!(self, DataType::Trigger)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "Bool",
            DataType::Int => "Int",
            DataType::Double => "Double",
            DataType::Text => "Text",
            DataType::Trigger => "Trigger",
        };
        f.write_str(name)
    }
}
