//! Row storage for MyDB
//!
//! Rows are kept in memory as an ordered sequence per table. When a data file
//! is configured, every mutation rewrites the whole snapshot (a JSON object
//! mapping table name to its array of rows). A failed write rolls the
//! in-memory mutation back before the error is returned.

use super::value::Row;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// In-memory row store with an optional JSON snapshot on disk
#[derive(Debug, Default)]
pub struct RowStore {
    /// Table name to rows, in creation order
    tables: IndexMap<String, Vec<Row>>,
    /// Snapshot file, if persistence is enabled
    data_file: Option<PathBuf>,
}

impl RowStore {
    /// Create a store that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `data_file`, loading the snapshot if it exists
    pub fn open(data_file: impl Into<PathBuf>) -> Result<Self> {
        let data_file = data_file.into();
        let tables = if data_file.exists() {
            let tables = Self::load_snapshot(&data_file)?;
            info!(
                path = %data_file.display(),
                tables = tables.len(),
                "loaded data snapshot"
            );
            tables
        } else {
            IndexMap::new()
        };

        Ok(Self {
            tables,
            data_file: Some(data_file),
        })
    }

    fn load_snapshot(path: &Path) -> Result<IndexMap<String, Vec<Row>>> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| {
            Error::CorruptSnapshot(format!("{}: {}", path.display(), e))
        })
    }

    /// Snapshot file, if any
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// Write the full snapshot. No-op without a data file.
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.tables)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Create an empty table
    pub fn create_table(&mut self, table: &str) -> Result<()> {
        if self.tables.contains_key(table) {
            return Err(Error::DuplicateTable(table.to_string()));
        }

        self.tables.insert(table.to_string(), Vec::new());
        if let Err(e) = self.persist() {
            warn!(table, error = %e, "snapshot write failed, rolling back create");
            self.tables.shift_remove(table);
            return Err(e);
        }
        Ok(())
    }

    /// Drop a table and all its rows
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        let (position, _, rows) = self
            .tables
            .shift_remove_full(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;

        if let Err(e) = self.persist() {
            warn!(table, error = %e, "snapshot write failed, rolling back drop");
            self.tables.shift_insert(position, table.to_string(), rows);
            return Err(e);
        }
        Ok(())
    }

    /// Append a row and return its position
    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<usize> {
        let rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        rows.push(row);
        let position = rows.len() - 1;

        if let Err(e) = self.persist() {
            warn!(table, error = %e, "snapshot write failed, rolling back insert");
            if let Some(rows) = self.tables.get_mut(table) {
                rows.pop();
            }
            return Err(e);
        }
        Ok(position)
    }

    /// Copy of every row of the table
    pub fn get_all_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.rows(table).map(<[Row]>::to_vec)
    }

    /// Borrow the rows of the table
    pub fn rows(&self, table: &str) -> Result<&[Row]> {
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    /// Replace the whole row sequence of the table
    pub fn update_rows(&mut self, table: &str, rows: Vec<Row>) -> Result<()> {
        let slot = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        let previous = std::mem::replace(slot, rows);

        if let Err(e) = self.persist() {
            warn!(table, error = %e, "snapshot write failed, rolling back update");
            if let Some(slot) = self.tables.get_mut(table) {
                *slot = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Table names in creation order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Number of rows in the table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.rows(table).map(<[Row]>::len)
    }
}
