//! ml-db - Storage capability for the migration ledger
//!
//! This crate provides the `Database` trait the ledger is written against
//! and a DuckDB implementation of it.

pub mod duckdb;
pub mod error;
pub mod sql_utils;
pub mod traits;
pub mod value;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{ColumnSpec, ColumnType, Database, IndexSpec};
pub use value::{Row, Value};
