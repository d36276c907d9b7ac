//! Row and Value types for MyDB
//!
//! This module defines how data values are represented in memory and on disk.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A row: column name to value, in schema column order once validated
pub type Row = IndexMap<String, Value>;

/// Shared NULL for lookups that fall back to NULL by reference
pub static NULL: Value = Value::Null;

/// A value in the database
///
/// Serialized untagged so the snapshot file holds plain JSON scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit)
    Float(f64),
    /// Text value
    Text(String),
}

// Floats compare by bit pattern so values can be used as index keys.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
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
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => float_bits(*v).hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

/// -0.0 and 0.0 must land in the same index bucket.
fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integers, integer-valued floats and integer-valued strings
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Integers, floats and numeric strings, always as a finite f64
    ///
    /// NaN and infinities are rejected since the JSON snapshot cannot hold them.
    pub fn to_float(&self) -> Option<f64> {
        let f = match self {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        f.is_finite().then_some(f)
    }

    /// Booleans and the strings true/1/yes, false/0/no in any case
    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Text(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Any value rendered as text, booleans as `True`/`False`
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            other => other.to_string(),
        }
    }

    /// Compare two values for WHERE clauses, joins and ORDER BY
    ///
    /// Returns `None` when the values are not order-comparable. NULL only
    /// compares equal to NULL.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,

            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),

            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),

            _ => None,
        }
    }

    /// SQL-level equality (numeric types compare across Integer/Float)
    pub fn sql_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{:.1}", n)
            }
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_comparison() {
        assert_eq!(
            Value::Integer(1).compare(&Value::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::Integer(1).compare(&Value::Text("1".into())), None);
        assert_eq!(Value::Null.compare(&Value::Integer(0)), None);
        assert!(Value::Null.sql_eq(&Value::Null));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::Text(" 42 ".into()).to_integer(), Some(42));
        assert_eq!(Value::Float(3.0).to_integer(), Some(3));
        assert_eq!(Value::Float(3.5).to_integer(), None);
        assert_eq!(Value::Boolean(true).to_integer(), None);
        assert_eq!(Value::Integer(2).to_float(), Some(2.0));
        assert_eq!(Value::Text("YES".into()).to_boolean(), Some(true));
        assert_eq!(Value::Text("0".into()).to_boolean(), Some(false));
        assert_eq!(Value::Integer(1).to_boolean(), None);
        assert_eq!(Value::Float(2.0).to_text(), "2.0");
        assert_eq!(Value::Float(2.5).to_text(), "2.5");
        assert_eq!(Value::Boolean(true).to_text(), "True");
        assert_eq!(Value::Boolean(false).to_text(), "False");
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        assert_eq!(Value::Text("inf".into()).to_float(), None);
        assert_eq!(Value::Text("-Infinity".into()).to_float(), None);
        assert_eq!(Value::Text("NaN".into()).to_float(), None);
        assert_eq!(Value::Float(f64::INFINITY).to_float(), None);
        assert_eq!(Value::Float(f64::NAN).to_float(), None);
        assert_eq!(Value::Text("1e3".into()).to_float(), Some(1000.0));
    }

    #[test]
    fn test_hashable_as_key() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        assert!(set.contains(&Value::Float(-0.0)));
        set.insert(Value::Text("a".into()));
        assert!(!set.contains(&Value::Integer(0)));
    }

    #[test]
    fn test_json_shape() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Integer(1));
        row.insert("score".to_string(), Value::Float(2.0));
        row.insert("name".to_string(), Value::Null);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"score":2.0,"name":null}"#);

        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
