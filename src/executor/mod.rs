//! Query execution module
//!
//! This module contains the execution engine and the result types it
//! hands back to front ends.

pub mod executor;
pub mod result;

pub use executor::ExecutionEngine;
pub use result::{QueryResult, Response};
