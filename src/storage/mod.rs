//! Storage module
//!
//! This module contains the storage components:
//! - Values and rows
//! - Row store with JSON snapshot persistence
//! - Hash indexes over row positions

pub mod index;
pub mod store;
pub mod value;

pub use index::{Index, IndexSet};
pub use store::RowStore;
pub use value::{Row, Value, NULL};
