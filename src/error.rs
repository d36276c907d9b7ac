//! Error types for MyDB
//!
//! This module defines all error types used throughout the database engine.

use thiserror::Error;

/// The main error type for MyDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    // ========== Parser Errors ==========
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    // ========== Catalog Errors ==========
    #[error("Table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn { column: String, table: String },

    #[error("Index already exists on {table}.{column}")]
    DuplicateIndex { table: String, column: String },

    #[error("No index on {table}.{column}")]
    IndexNotFound { table: String, column: String },

    // ========== Validation Errors ==========
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Cannot convert '{value}' to {expected} for column '{column}'")]
    TypeMismatch {
        column: String,
        value: String,
        expected: String,
    },

    #[error("Value '{value}' exceeds max length {max} for column '{column}'")]
    LengthExceeded {
        column: String,
        value: String,
        max: usize,
    },

    #[error("Column '{0}' cannot be NULL")]
    NotNullViolation(String),

    #[error("Expected {expected} values, got {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    // ========== Constraint Errors ==========
    #[error("Duplicate primary key value: {value}")]
    DuplicateKey { table: String, value: String },

    #[error("Duplicate value '{value}' violates unique constraint on {table}.{column}")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },

    // ========== Storage Errors ==========
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors that name a table that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownTable(_))
    }
}

/// Result type alias for MyDB operations
pub type Result<T> = std::result::Result<T, Error>;
