//! Schema definitions for MyDB
//!
//! This module defines table schemas and column metadata, and validates rows
//! against them.

use super::types::DataType;
use crate::error::{Error, Result};
use crate::storage::{Row, Value};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Is this column nullable?
    pub nullable: bool,
}

impl Column {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Max length, VARCHAR only
    pub fn max_length(&self) -> Option<usize> {
        self.data_type.max_length()
    }

    /// Validate and convert a single value for this column
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            if self.nullable {
                return Ok(Value::Null);
            }
            return Err(Error::NotNullViolation(self.name.clone()));
        }
        self.data_type.coerce(&self.name, value)
    }
}

/// Table schema - defines the structure of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Ordered list of columns
    pub columns: Vec<Column>,
    /// Primary key column, if any
    pub primary_key: Option<String>,
    /// Columns carrying a UNIQUE constraint
    pub unique_constraints: IndexSet<String>,
    /// Columns that must be indexed (primary key first)
    pub indexes: IndexSet<String>,
}

impl TableSchema {
    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get column names in schema order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True if the column is the primary key or has a UNIQUE constraint
    pub fn is_unique(&self, column: &str) -> bool {
        self.primary_key.as_deref() == Some(column) || self.unique_constraints.contains(column)
    }

    /// Validate a row and return it in canonical form
    ///
    /// The result holds exactly one entry per schema column, in schema order,
    /// each converted to the column type. Missing nullable columns become NULL.
    pub fn validate_row(&self, row: &Row) -> Result<Row> {
        let mut validated = Row::with_capacity(self.columns.len());

        for column in &self.columns {
            let value = match row.get(&column.name) {
                Some(value) => column.coerce(value)?,
                None if column.nullable => Value::Null,
                None => return Err(Error::MissingColumn(column.name.clone())),
            };
            validated.insert(column.name.clone(), value);
        }

        if let Some(extra) = row.keys().find(|key| !self.has_column(key)) {
            return Err(Error::UnknownColumn(extra.clone()));
        }

        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> TableSchema {
        TableSchema {
            name: "users".to_string(),
            columns: vec![
                Column::new("id", DataType::Integer).nullable(false),
                Column::new("name", DataType::Varchar(Some(100))).nullable(false),
                Column::new("email", DataType::Varchar(Some(255))),
            ],
            primary_key: Some("id".to_string()),
            unique_constraints: IndexSet::from(["email".to_string()]),
            indexes: IndexSet::from(["id".to_string(), "email".to_string()]),
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_schema_lookup() {
        let schema = users_schema();

        assert_eq!(schema.column_count(), 3);
        assert!(schema.has_column("id"));
        assert!(!schema.has_column("unknown"));
        assert!(schema.is_unique("id"));
        assert!(schema.is_unique("email"));
        assert!(!schema.is_unique("name"));
        assert_eq!(schema.get_column("name").unwrap().max_length(), Some(100));
    }

    #[test]
    fn test_validate_row_canonical_order() {
        let schema = users_schema();
        let input = row(&[("name", "Alice".into()), ("id", "5".into())]);

        let validated = schema.validate_row(&input).unwrap();
        let keys: Vec<&str> = validated.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "email"]);
        assert_eq!(validated["id"], Value::Integer(5));
        assert_eq!(validated["email"], Value::Null);
    }

    #[test]
    fn test_validate_row_errors() {
        let schema = users_schema();

        let missing = row(&[("id", Value::Integer(1))]);
        assert!(matches!(
            schema.validate_row(&missing),
            Err(Error::MissingColumn(c)) if c == "name"
        ));

        let extra = row(&[
            ("id", Value::Integer(1)),
            ("name", "Bob".into()),
            ("age", Value::Integer(3)),
        ]);
        assert!(matches!(
            schema.validate_row(&extra),
            Err(Error::UnknownColumn(c)) if c == "age"
        ));

        let null = row(&[("id", Value::Integer(1)), ("name", Value::Null)]);
        assert!(matches!(
            schema.validate_row(&null),
            Err(Error::NotNullViolation(c)) if c == "name"
        ));

        let bad_type = row(&[("id", "abc".into()), ("name", "Bob".into())]);
        assert!(matches!(
            schema.validate_row(&bad_type),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
