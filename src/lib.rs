//! MyDB - A minimal relational database engine written in Rust
//!
//! This library provides the core components for a small SQL database:
//! - SQL parsing (lexer, parser, command AST)
//! - Schema catalog with column types and constraints
//! - Row store with JSON snapshot persistence and hash indexes
//! - Command execution with a uniform response envelope
//! - TCP server

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod server;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
