//! System Catalog for MyDB
//!
//! This module manages the schema of every table.

use super::schema::{Column, TableSchema};
use crate::error::{Error, Result};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// System Catalog - table name to schema
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: HashMap<String, TableSchema>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new table schema
    ///
    /// The primary key and every unique column are recorded as indexed.
    pub fn create_table_schema(
        &mut self,
        name: &str,
        columns: Vec<Column>,
        primary_key: Option<String>,
        unique_constraints: Vec<String>,
    ) -> Result<TableSchema> {
        if self.schemas.contains_key(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }

        let mut seen = IndexSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    column: column.name.clone(),
                    table: name.to_string(),
                });
            }
        }

        for key in primary_key.iter().chain(unique_constraints.iter()) {
            if !seen.contains(key.as_str()) {
                return Err(Error::UnknownColumn(key.clone()));
            }
        }

        let unique_constraints: IndexSet<String> = unique_constraints.into_iter().collect();
        let indexes: IndexSet<String> = primary_key
            .iter()
            .chain(unique_constraints.iter())
            .cloned()
            .collect();

        let schema = TableSchema {
            name: name.to_string(),
            columns,
            primary_key,
            unique_constraints,
            indexes,
        };

        self.schemas.insert(name.to_string(), schema.clone());
        Ok(schema)
    }

    /// Get a table schema by name
    pub fn get_schema(&self, name: &str) -> Option<&TableSchema> {
        self.schemas.get(name)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Remove a table schema
    pub fn drop_schema(&mut self, name: &str) -> Result<TableSchema> {
        self.schemas
            .remove(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// List all table names, sorted
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn table_info(&self, name: &str) -> Result<String> {
        let schema = self
            .get_schema(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;

        let mut info = format!("Table: {}\n", schema.name);
        info.push_str("Columns:\n");

        for col in &schema.columns {
            let mut flags = Vec::new();
            if schema.primary_key.as_deref() == Some(col.name.as_str()) {
                flags.push("PRIMARY KEY");
            }
            if !col.nullable {
                flags.push("NOT NULL");
            }
            if schema.unique_constraints.contains(&col.name) {
                flags.push("UNIQUE");
            }

            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!("  {} {}{}\n", col.name, col.data_type, flags_str));
        }

        if !schema.indexes.is_empty() {
            info.push_str("Indexes:\n");
            for column in &schema.indexes {
                info.push_str(&format!("  {}_{} ({}) UNIQUE\n", schema.name, column, column));
            }
        }

        Ok(info)
    }

    /// Save catalog to disk as a JSON list of schemas
    pub fn save_to_disk(&self, path: &Path) -> Result<()> {
        let schemas: Vec<&TableSchema> = self
            .list_tables()
            .iter()
            .filter_map(|name| self.schemas.get(name))
            .collect();

        let json = serde_json::to_string_pretty(&schemas)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), tables = schemas.len(), "catalog saved");
        Ok(())
    }

    /// Load catalog from disk
    pub fn load_from_disk(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let schemas: Vec<TableSchema> = serde_json::from_str(&json)?;

        let mut catalog = Self::new();
        for schema in schemas {
            if catalog.schemas.contains_key(&schema.name) {
                return Err(Error::CorruptSnapshot(format!(
                    "table '{}' is defined twice in {}",
                    schema.name,
                    path.display()
                )));
            }
            catalog.schemas.insert(schema.name.clone(), schema);
        }
        Ok(catalog)
    }
}
