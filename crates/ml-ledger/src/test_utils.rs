//! Shared test utilities for ml-ledger

use crate::ledger::{Direction, LegacyRow};
use chrono::{NaiveDate, NaiveDateTime};
use ml_db::{ColumnSpec, Database, DbError, DbResult, DuckDbBackend, IndexSpec, Row, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Calls that change the shape of the database
const SCHEMA_OPS: &[&str] = &[
    "create_table",
    "drop_table",
    "add_column",
    "rename_column",
    "drop_column",
    "add_index",
    "drop_index",
];

/// Timestamp `minute` minutes into 2020-01-01
pub(crate) fn at(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(minute / 60, minute % 60, 0)
        .unwrap()
}

pub(crate) fn up(migration: &str, minute: u32) -> LegacyRow {
    LegacyRow {
        migration: migration.to_string(),
        direction: Direction::Up,
        created_at: at(minute),
    }
}

pub(crate) fn down(migration: &str, minute: u32) -> LegacyRow {
    LegacyRow {
        migration: migration.to_string(),
        direction: Direction::Down,
        created_at: at(minute),
    }
}

/// Create the legacy three-column `orm_migrations` table holding `rows`.
pub(crate) fn seed_legacy(db: &dyn Database, rows: &[LegacyRow]) {
    db.execute(
        "CREATE TABLE orm_migrations (
             migration  VARCHAR NOT NULL,
             direction  VARCHAR NOT NULL,
             created_at TIMESTAMP NOT NULL
         )",
        &[],
    )
    .unwrap();
    for row in rows {
        db.execute(
            "INSERT INTO orm_migrations VALUES (?, ?, ?)",
            &[
                Value::from(row.migration.as_str()),
                Value::from(row.direction.to_string()),
                Value::from(row.created_at),
            ],
        )
        .unwrap();
    }
}

/// Surviving migration names, sorted ascending.
pub(crate) fn migration_names(db: &dyn Database) -> Vec<String> {
    db.exec_query("SELECT migration FROM orm_migrations ORDER BY migration", &[])
        .unwrap()
        .iter()
        .map(|row| row.text("migration").unwrap())
        .collect()
}

/// In-memory DuckDB wrapper that records every call and can inject
/// failures into chosen calls.
pub(crate) struct RecordingDb {
    inner: DuckDbBackend,
    calls: Mutex<Vec<String>>,
    counts: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<Vec<(&'static str, usize)>>,
    skips: Mutex<Vec<(&'static str, usize)>>,
}

impl RecordingDb {
    pub(crate) fn new() -> Self {
        Self {
            inner: DuckDbBackend::in_memory().unwrap(),
            calls: Mutex::new(Vec::new()),
            counts: Mutex::new(HashMap::new()),
            failures: Mutex::new(Vec::new()),
            skips: Mutex::new(Vec::new()),
        }
    }

    /// Make the `nth` (1-based) call to `op` fail.
    pub(crate) fn fail_on(&self, op: &'static str, nth: usize) {
        self.failures.lock().unwrap().push((op, nth));
    }

    /// Make the `nth` (1-based) `execute` succeed without touching the
    /// database, reporting zero affected rows.
    pub(crate) fn skip_execute(&self, nth: usize) {
        self.skips.lock().unwrap().push(("execute", nth));
    }

    /// Forget recorded calls, call counts, injected failures and skips.
    pub(crate) fn reset(&self) {
        self.calls.lock().unwrap().clear();
        self.counts.lock().unwrap().clear();
        self.failures.lock().unwrap().clear();
        self.skips.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls that change the database shape.
    pub(crate) fn schema_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| SCHEMA_OPS.iter().any(|op| call.starts_with(op)))
            .collect()
    }

    /// Recorded `execute` calls whose SQL contains `fragment`.
    pub(crate) fn executes_containing(&self, fragment: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("execute(") && call.contains(fragment))
            .count()
    }

    /// Record a call; `Ok(true)` means the call should be skipped.
    fn record(&self, op: &'static str, detail: String) -> DbResult<bool> {
        self.calls.lock().unwrap().push(format!("{op}({detail})"));
        let n = {
            let mut counts = self.counts.lock().unwrap();
            let n = counts.entry(op).or_default();
            *n += 1;
            *n
        };
        if self.failures.lock().unwrap().contains(&(op, n)) {
            return Err(DbError::ExecutionError(format!("injected failure in {op}")));
        }
        Ok(self.skips.lock().unwrap().contains(&(op, n)))
    }
}

impl Database for RecordingDb {
    fn exec_query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.record("exec_query", sql.to_string())?;
        self.inner.exec_query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        if self.record("execute", sql.to_string())? {
            return Ok(0);
        }
        self.inner.execute(sql, params)
    }

    fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> DbResult<()> {
        self.record("create_table", table.to_string())?;
        self.inner.create_table(table, columns)
    }

    fn drop_table(&self, table: &str) -> DbResult<()> {
        self.record("drop_table", table.to_string())?;
        self.inner.drop_table(table)
    }

    fn has_table(&self, table: &str) -> DbResult<bool> {
        self.record("has_table", table.to_string())?;
        self.inner.has_table(table)
    }

    fn get_columns(&self, table: &str) -> DbResult<Vec<String>> {
        self.record("get_columns", table.to_string())?;
        self.inner.get_columns(table)
    }

    fn add_column(&self, table: &str, column: &ColumnSpec) -> DbResult<()> {
        self.record("add_column", format!("{table}, {}", column.name))?;
        self.inner.add_column(table, column)
    }

    fn rename_column(&self, table: &str, from: &str, to: &str) -> DbResult<()> {
        self.record("rename_column", format!("{table}, {from}, {to}"))?;
        self.inner.rename_column(table, from, to)
    }

    fn drop_column(&self, table: &str, column: &str) -> DbResult<()> {
        self.record("drop_column", format!("{table}, {column}"))?;
        self.inner.drop_column(table, column)
    }

    fn add_index(&self, name: &str, index: &IndexSpec) -> DbResult<()> {
        self.record("add_index", format!("{name}, {}", index.table))?;
        self.inner.add_index(name, index)
    }

    fn drop_index(&self, name: &str) -> DbResult<()> {
        self.record("drop_index", name.to_string())?;
        self.inner.drop_index(name)
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }
}
