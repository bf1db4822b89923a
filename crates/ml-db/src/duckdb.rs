//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql_utils::{quote_ident, quote_qualified, split_qualified_name};
use crate::traits::{ColumnSpec, ColumnType, Database, IndexSpec};
use crate::value::{Row, Value};
use chrono::{DateTime, NaiveDateTime};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute a parameterless DDL statement
    fn run_ddl(&self, sql: &str) -> DbResult<()> {
        log::debug!("duckdb ddl: {sql}");
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(|e| classify(e, sql))
    }
}

impl Database for DuckDbBackend {
    fn exec_query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| classify(e, sql))?;

        // Column metadata is only reliable once the statement has run, so
        // collect raw values first and read the names afterwards.
        let raw_rows: Vec<Vec<DuckValue>> = stmt
            .query_map(params_from_iter(to_duck_params(params)), |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, DuckValue>(i))
                    .collect::<duckdb::Result<Vec<_>>>()
            })
            .map_err(|e| classify(e, sql))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify(e, sql))?;

        let column_names: Vec<String> = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map_or("?".to_string(), |v| v.to_string())
            })
            .collect();

        raw_rows
            .into_iter()
            .map(|values| {
                let cells = column_names
                    .iter()
                    .cloned()
                    .zip(values)
                    .map(|(name, value)| from_duck(value).map(|v| (name, v)))
                    .collect::<DbResult<Vec<_>>>()?;
                Ok(Row::new(cells))
            })
            .collect()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, params_from_iter(to_duck_params(params)))
            .map_err(|e| classify(e, sql))
    }

    fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> DbResult<()> {
        let defs = columns
            .iter()
            .map(column_definition)
            .collect::<Vec<_>>()
            .join(", ");
        self.run_ddl(&format!(
            "CREATE TABLE {} ({})",
            quote_qualified(table),
            defs
        ))
    }

    fn drop_table(&self, table: &str) -> DbResult<()> {
        self.run_ddl(&format!("DROP TABLE {}", quote_qualified(table)))
    }

    fn has_table(&self, table: &str) -> DbResult<bool> {
        let (schema, name) = split_qualified_name(table);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, name],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count > 0)
    }

    fn get_columns(&self, table: &str) -> DbResult<Vec<String>> {
        let (schema, name) = split_qualified_name(table);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        let columns: Vec<String> = stmt
            .query_map(duckdb::params![schema, name], |row| row.get::<_, String>(0))
            .map_err(|e| DbError::ExecutionError(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        if columns.is_empty() {
            return Err(DbError::TableNotFound(table.to_string()));
        }
        Ok(columns)
    }

    fn add_column(&self, table: &str, column: &ColumnSpec) -> DbResult<()> {
        self.run_ddl(&format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_qualified(table),
            column_definition(column)
        ))
    }

    fn rename_column(&self, table: &str, from: &str, to: &str) -> DbResult<()> {
        self.run_ddl(&format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_qualified(table),
            quote_ident(from),
            quote_ident(to)
        ))
    }

    fn drop_column(&self, table: &str, column: &str) -> DbResult<()> {
        self.run_ddl(&format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_qualified(table),
            quote_ident(column)
        ))
    }

    fn add_index(&self, name: &str, index: &IndexSpec) -> DbResult<()> {
        let columns = index
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let unique = if index.unique { "UNIQUE " } else { "" };
        self.run_ddl(&format!(
            "CREATE {unique}INDEX {} ON {} ({columns})",
            quote_ident(name),
            quote_qualified(&index.table)
        ))
    }

    fn drop_index(&self, name: &str) -> DbResult<()> {
        self.run_ddl(&format!("DROP INDEX {}", quote_qualified(name)))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Classify a driver error, attaching the statement to generic failures.
fn classify(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{msg}: {sql}")),
        other => other,
    }
}

fn column_definition(column: &ColumnSpec) -> String {
    let sql_type = match column.column_type {
        ColumnType::Text => "VARCHAR",
        ColumnType::Integer => "BIGINT",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Timestamp => "TIMESTAMP",
    };
    let not_null = if column.required { " NOT NULL" } else { "" };
    format!("{} {sql_type}{not_null}", quote_ident(&column.name))
}

fn to_duck_params(params: &[Value]) -> Vec<DuckValue> {
    params.iter().map(to_duck).collect()
}

fn to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(n) => DuckValue::BigInt(*n),
        Value::Float(x) => DuckValue::Double(*x),
        Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Timestamp(ts) => {
            DuckValue::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
    }
}

fn from_duck(value: DuckValue) -> DbResult<Value> {
    let converted = match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::Int(n.into()),
        DuckValue::SmallInt(n) => Value::Int(n.into()),
        DuckValue::Int(n) => Value::Int(n.into()),
        DuckValue::BigInt(n) => Value::Int(n),
        DuckValue::UTinyInt(n) => Value::Int(n.into()),
        DuckValue::USmallInt(n) => Value::Int(n.into()),
        DuckValue::UInt(n) => Value::Int(n.into()),
        DuckValue::UBigInt(n) => Value::Int(
            i64::try_from(n).map_err(|e| DbError::DecodeError(format!("{n}: {e}")))?,
        ),
        DuckValue::Float(x) => Value::Float(x.into()),
        DuckValue::Double(x) => Value::Float(x),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::Text(s),
        DuckValue::Timestamp(unit, raw) => Value::Timestamp(timestamp_from_raw(unit, raw)?),
        other => {
            return Err(DbError::DecodeError(format!(
                "unsupported DuckDB value: {other:?}"
            )))
        }
    };
    Ok(converted)
}

fn timestamp_from_raw(unit: TimeUnit, raw: i64) -> DbResult<NaiveDateTime> {
    let micros = match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    };
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DbError::DecodeError(format!("timestamp out of range: {raw}")))
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
