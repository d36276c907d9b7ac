//! Catalog module
//!
//! This module contains the schema catalog, table schemas, and data types.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::Catalog;
pub use schema::{Column, TableSchema};
pub use types::DataType;
