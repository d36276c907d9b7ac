//! Secondary indexes for MyDB
//!
//! Each index maps the values of one column to the positions of the rows that
//! hold them. Indexes are derived state: they can always be rebuilt from the
//! rows of the table.

use super::value::{Row, Value, NULL};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A hash index over one column of one table
#[derive(Debug, Clone)]
pub struct Index {
    /// Table this index belongs to
    pub table: String,
    /// Indexed column
    pub column: String,
    /// Is this a unique index?
    pub unique: bool,
    /// Value to ordered row positions
    entries: HashMap<Value, Vec<usize>>,
}

impl Index {
    /// Create an empty index
    pub fn new(table: impl Into<String>, column: impl Into<String>, unique: bool) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            unique,
            entries: HashMap::new(),
        }
    }

    /// Add a position for a value. NULL is never indexed.
    pub fn add(&mut self, value: &Value, position: usize) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        let positions = self.entries.entry(value.clone()).or_default();
        if self.unique && !positions.is_empty() {
            return Err(Error::UniqueViolation {
                table: self.table.clone(),
                column: self.column.clone(),
                value: value.to_string(),
            });
        }
        positions.push(position);
        Ok(())
    }

    /// Remove a position for a value, dropping the bucket once empty
    pub fn remove(&mut self, value: &Value, position: usize) {
        if let Some(positions) = self.entries.get_mut(value) {
            positions.retain(|&p| p != position);
            if positions.is_empty() {
                self.entries.remove(value);
            }
        }
    }

    /// Positions holding the value, in row order
    pub fn lookup(&self, value: &Value) -> &[usize] {
        self.entries.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct indexed values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index holds no values
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// All indexes, grouped by table
#[derive(Debug, Default)]
pub struct IndexSet {
    tables: HashMap<String, IndexMap<String, Index>>,
}

impl IndexSet {
    /// Create an empty index set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index on (table, column)
    pub fn create_index(&mut self, table: &str, column: &str, unique: bool) -> Result<()> {
        let indexes = self.tables.entry(table.to_string()).or_default();
        if indexes.contains_key(column) {
            return Err(Error::DuplicateIndex {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        indexes.insert(column.to_string(), Index::new(table, column, unique));
        debug!(table, column, unique, "index created");
        Ok(())
    }

    /// Check if (table, column) is indexed
    pub fn has_index(&self, table: &str, column: &str) -> bool {
        self.get(table, column).is_some()
    }

    /// Get the index on (table, column)
    pub fn get(&self, table: &str, column: &str) -> Option<&Index> {
        self.tables.get(table).and_then(|indexes| indexes.get(column))
    }

    fn get_mut(&mut self, table: &str, column: &str) -> Result<&mut Index> {
        self.tables
            .get_mut(table)
            .and_then(|indexes| indexes.get_mut(column))
            .ok_or_else(|| Error::IndexNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    /// Add a position to the index on (table, column)
    pub fn add(&mut self, table: &str, column: &str, value: &Value, position: usize) -> Result<()> {
        self.get_mut(table, column)?.add(value, position)
    }

    /// Remove a position from the index on (table, column)
    pub fn remove(
        &mut self,
        table: &str,
        column: &str,
        value: &Value,
        position: usize,
    ) -> Result<()> {
        self.get_mut(table, column)?.remove(value, position);
        Ok(())
    }

    /// Positions holding the value. Empty when there is no such index.
    pub fn lookup(&self, table: &str, column: &str, value: &Value) -> Vec<usize> {
        self.get(table, column)
            .map(|index| index.lookup(value).to_vec())
            .unwrap_or_default()
    }

    /// Add one row at `position` to every index of the table
    pub fn add_row(&mut self, table: &str, row: &Row, position: usize) -> Result<()> {
        if let Some(indexes) = self.tables.get_mut(table) {
            for index in indexes.values_mut() {
                let value = row.get(&index.column).unwrap_or(&NULL);
                index.add(value, position)?;
            }
        }
        Ok(())
    }

    /// Clear and recompute every index of the table from `rows`
    pub fn rebuild(&mut self, table: &str, rows: &[Row]) -> Result<()> {
        if let Some(indexes) = self.tables.get_mut(table) {
            for index in indexes.values_mut() {
                index.clear();
                for (position, row) in rows.iter().enumerate() {
                    let value = row.get(&index.column).unwrap_or(&NULL);
                    index.add(value, position)?;
                }
            }
            debug!(table, rows = rows.len(), "indexes rebuilt");
        }
        Ok(())
    }

    /// Check the unique indexes of the table against a candidate row sequence
    /// without touching any index
    pub fn check_unique(&self, table: &str, rows: &[Row]) -> Result<()> {
        let Some(indexes) = self.tables.get(table) else {
            return Ok(());
        };

        for index in indexes.values().filter(|index| index.unique) {
            let mut seen = HashSet::new();
            for row in rows {
                let Some(value) = row.get(&index.column) else {
                    continue;
                };
                if !value.is_null() && !seen.insert(value) {
                    return Err(Error::UniqueViolation {
                        table: table.to_string(),
                        column: index.column.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every index of the table, in creation order
    pub fn table_indexes(&self, table: &str) -> impl Iterator<Item = &Index> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|indexes| indexes.values())
    }

    /// Drop every index of the table
    pub fn drop_table_indexes(&mut self, table: &str) {
        self.tables.remove(table);
    }
}
