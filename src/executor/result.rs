//! Query results and the response envelope
//!
//! [`QueryResult`] is what the engine returns for a successful command.
//! [`Response`] is the uniform `{ success, message, data?, columns? }`
//! envelope handed to front ends; every error is folded into it.

use crate::error::Result;
use crate::storage::Row;
use serde::{Deserialize, Serialize};

/// Result of a successfully executed command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names, for SELECT
    pub columns: Option<Vec<String>>,
    /// Result rows, for SELECT
    pub rows: Option<Vec<Row>>,
    /// Number of rows inserted, updated, deleted or returned
    pub affected_rows: usize,
    /// Human-readable summary
    pub message: String,
}

impl QueryResult {
    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            columns: None,
            rows: None,
            affected_rows: 0,
            message: message.into(),
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            ..Self::with_message(message)
        }
    }

    /// Create a result carrying rows
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self {
            columns: Some(columns),
            rows: Some(rows),
            affected_rows: count,
            message: format!("Found {} row(s)", count),
        }
    }
}

/// Uniform response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Did the command succeed?
    pub success: bool,
    /// Summary on success, error text on failure
    pub message: String,
    /// Result rows; absent means there is nothing to display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    /// Column names of `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl Response {
    /// Failed response with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            columns: None,
        }
    }
}

impl From<QueryResult> for Response {
    fn from(result: QueryResult) -> Self {
        Self {
            success: true,
            message: result.message,
            data: result.rows,
            columns: result.columns,
        }
    }
}

impl From<Result<QueryResult>> for Response {
    fn from(result: Result<QueryResult>) -> Self {
        match result {
            Ok(result) => result.into(),
            Err(e) => Response::error(e.to_string()),
        }
    }
}
