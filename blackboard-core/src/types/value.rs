//! Runtime Values
//!
//! Value nodes hold one [`Value`]. The set of data kinds is closed; the
//! arithmetic and comparison capabilities that leaf behaviors rely on are
//! expressed as small traits over the primitive payloads.
//!
//! # Equality
//!
//! Change detection compares values with `==`. Doubles compare by bit
//! pattern, so a node that keeps producing `NaN` is not considered changed on
//! every pass, while `0.0` and `-0.0` are distinct values.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;

/// A value held by a value node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl Value {
    /// The data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Double(_) => DataType::Double,
            Value::Text(_) => DataType::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

// ----------------------------------------------------------------------------
// Capabilities
// ----------------------------------------------------------------------------

/// Addition and subtraction.
pub trait Additive {
    fn plus(&self, rhs: &Self) -> Self;
    fn minus(&self, rhs: &Self) -> Self;
}

/// Multiplication and division. Division by zero yields zero.
pub trait Multiplicative {
    fn times(&self, rhs: &Self) -> Self;
    fn divide(&self, rhs: &Self) -> Self;
}

/// Total ordering between two payloads of the same kind.
pub trait Comparable {
    fn compare(&self, rhs: &Self) -> Ordering;
}

/// Logical/bitwise combination.
pub trait Bitwise {
    fn bit_and(&self, rhs: &Self) -> Self;
    fn bit_or(&self, rhs: &Self) -> Self;
    fn bit_xor(&self, rhs: &Self) -> Self;
}

/// Operations specific to floating point payloads.
pub trait FloatingPoint {
    /// Truncate toward zero. `NaN` maps to 0, infinities saturate.
    fn truncate_to_int(&self) -> i64;

    /// False for `NaN`.
    fn is_number(&self) -> bool;
}

impl Additive for i64 {
    fn plus(&self, rhs: &Self) -> Self {
        self.wrapping_add(*rhs)
    }

    fn minus(&self, rhs: &Self) -> Self {
        self.wrapping_sub(*rhs)
    }
}

impl Multiplicative for i64 {
    fn times(&self, rhs: &Self) -> Self {
        self.wrapping_mul(*rhs)
    }

    fn divide(&self, rhs: &Self) -> Self {
        if *rhs == 0 {
            0
        } else {
            self.wrapping_div(*rhs)
        }
    }
}

impl Comparable for i64 {
    fn compare(&self, rhs: &Self) -> Ordering {
        self.cmp(rhs)
    }
}

impl Bitwise for i64 {
    fn bit_and(&self, rhs: &Self) -> Self {
        self & rhs
    }

    fn bit_or(&self, rhs: &Self) -> Self {
        self | rhs
    }

    fn bit_xor(&self, rhs: &Self) -> Self {
        self ^ rhs
    }
}

impl Additive for f64 {
    fn plus(&self, rhs: &Self) -> Self {
        self + rhs
    }

    fn minus(&self, rhs: &Self) -> Self {
        self - rhs
    }
}

impl Multiplicative for f64 {
    fn times(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn divide(&self, rhs: &Self) -> Self {
        if *rhs == 0.0 {
            0.0
        } else {
            self / rhs
        }
    }
}

impl Comparable for f64 {
    fn compare(&self, rhs: &Self) -> Ordering {
        self.total_cmp(rhs)
    }
}

impl FloatingPoint for f64 {
    fn truncate_to_int(&self) -> i64 {
        // `as` saturates and maps NaN to 0.
        self.trunc() as i64
    }

    fn is_number(&self) -> bool {
        !self.is_nan()
    }
}

impl Comparable for bool {
    fn compare(&self, rhs: &Self) -> Ordering {
        self.cmp(rhs)
    }
}

impl Bitwise for bool {
    fn bit_and(&self, rhs: &Self) -> Self {
        *self && *rhs
    }

    fn bit_or(&self, rhs: &Self) -> Self {
        *self || *rhs
    }

    fn bit_xor(&self, rhs: &Self) -> Self {
        *self != *rhs
    }
}

impl Comparable for String {
    fn compare(&self, rhs: &Self) -> Ordering {
        self.cmp(rhs)
    }
}

impl Comparable for Value {
    /// Payloads of the same kind compare naturally. Mixed kinds order by
    /// data type so that sorting stays total.
    fn compare(&self, rhs: &Self) -> Ordering {
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => a.compare(b),
            (Value::Int(a), Value::Int(b)) => a.compare(b),
            (Value::Double(a), Value::Double(b)) => a.compare(b),
            (Value::Text(a), Value::Text(b)) => a.compare(b),
            (a, b) => a.data_type().cmp(&b.data_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_compare_by_bits() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(1.5), Value::Double(1.5));
    }

    #[test]
    fn mixed_kinds_are_never_equal() {
        assert_ne!(Value::Int(1), Value::Double(1.0));
        assert_ne!(Value::Bool(true), Value::Int(1));
    }

    #[test]
    fn division_by_zero_falls_back_to_zero() {
        assert_eq!(7i64.divide(&0), 0);
        assert_eq!(7.0f64.divide(&0.0), 0.0);
        assert_eq!(i64::MIN.divide(&-1), i64::MIN);
    }

    #[test]
    fn truncation_saturates() {
        assert_eq!(f64::NAN.truncate_to_int(), 0);
        assert_eq!(f64::INFINITY.truncate_to_int(), i64::MAX);
        assert_eq!((-2.7f64).truncate_to_int(), -2);
    }
}
