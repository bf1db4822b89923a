//! Database capability trait definition

use crate::error::DbResult;
use crate::value::{Row, Value};
use std::fmt;

/// Logical column types understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Column definition used by `create_table` and `add_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    /// Rendered as `NOT NULL`
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Index definition used by `add_index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// A unique index over `columns` of `table`.
    pub fn unique(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: true,
        }
    }
}

/// Storage capability the migration ledger is written against.
///
/// Every call blocks until the backend answers. Implementations must be
/// Send + Sync so one backend can be shared by the whole process.
pub trait Database: Send + Sync {
    /// Run a parameterized query and return all rows
    fn exec_query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Run a parameterized statement, returns affected rows
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize>;

    /// Create a table with the given columns
    fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> DbResult<()>;

    /// Drop a table
    fn drop_table(&self, table: &str) -> DbResult<()>;

    /// Check if a table exists
    fn has_table(&self, table: &str) -> DbResult<bool>;

    /// Column names of a table, in ordinal order
    fn get_columns(&self, table: &str) -> DbResult<Vec<String>>;

    /// Add a column to an existing table
    fn add_column(&self, table: &str, column: &ColumnSpec) -> DbResult<()>;

    /// Rename a column of an existing table
    fn rename_column(&self, table: &str, from: &str, to: &str) -> DbResult<()>;

    /// Drop a column from a table
    fn drop_column(&self, table: &str, column: &str) -> DbResult<()>;

    /// Create a named index
    fn add_index(&self, name: &str, index: &IndexSpec) -> DbResult<()>;

    /// Drop a named index
    fn drop_index(&self, name: &str) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
