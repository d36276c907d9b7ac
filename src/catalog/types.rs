//! Data types for MyDB
//!
//! This module defines the column types supported by the database and the
//! conversion applied when a value is stored into a column of that type.

use crate::error::{Error, Result};
use crate::storage::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Character string with an optional max length (in chars)
    Varchar(Option<usize>),
    /// Boolean
    Boolean,
}

impl DataType {
    /// Parse a type name as written in CREATE TABLE (case-insensitive)
    pub fn from_name(name: &str, length: Option<usize>) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "INTEGER" | "INT" => Some(DataType::Integer),
            "FLOAT" => Some(DataType::Float),
            "VARCHAR" => Some(DataType::Varchar(length)),
            "BOOLEAN" | "BOOL" => Some(DataType::Boolean),
            _ => None,
        }
    }

    /// Max length for VARCHAR columns
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::Varchar(n) => *n,
            _ => None,
        }
    }

    /// Convert a non-null value into this type
    ///
    /// `column` is only used to build the error.
    pub fn coerce(&self, column: &str, value: &Value) -> Result<Value> {
        let converted = match self {
            DataType::Integer => value.to_integer().map(Value::Integer),
            DataType::Float => value.to_float().map(Value::Float),
            DataType::Boolean => value.to_boolean().map(Value::Boolean),
            DataType::Varchar(max) => {
                let text = value.to_text();
                if let Some(max) = max {
                    if text.chars().count() > *max {
                        return Err(Error::LengthExceeded {
                            column: column.to_string(),
                            value: text,
                            max: *max,
                        });
                    }
                }
                Some(Value::Text(text))
            }
        };

        converted.ok_or_else(|| Error::TypeMismatch {
            column: column.to_string(),
            value: value.to_string(),
            expected: self.to_string(),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}
