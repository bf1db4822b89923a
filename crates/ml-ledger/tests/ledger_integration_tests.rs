//! Integration tests for ledger reconciliation against on-disk DuckDB files.
//!
//! These tests go through the public ml-ledger API only, reopening the
//! database between steps the way separate process runs would.

use chrono::{NaiveDate, NaiveDateTime};
use ml_db::{Database, DuckDbBackend, Value};
use ml_ledger::{Ledger, LedgerConfig, LedgerError, Reconciler, Reconciliation};
use std::path::Path;

// ── Helpers ────────────────────────────────────────────────────────────

fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 12, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Open the database at `path` and reconcile its ledger.
fn reconcile(path: &Path) -> Result<Reconciliation, LedgerError> {
    let db = DuckDbBackend::from_path(path).unwrap();
    let ledger = Ledger::with_defaults(&db);
    let result = Reconciler::new(&ledger).ensure_ledger();
    result
}

fn applied(path: &Path) -> Vec<String> {
    let db = DuckDbBackend::from_path(path).unwrap();
    Ledger::with_defaults(&db).all().unwrap()
}

/// Write a legacy ledger whose `direction` column is a DuckDB ENUM.
fn write_legacy(path: &Path, rows: &[(&str, &str, NaiveDateTime)]) {
    let db = DuckDbBackend::from_path(path).unwrap();
    db.execute("CREATE TYPE migration_direction AS ENUM ('up', 'down')", &[])
        .unwrap();
    db.execute(
        "CREATE TABLE orm_migrations (
             migration  VARCHAR NOT NULL,
             direction  migration_direction NOT NULL,
             created_at TIMESTAMP NOT NULL
         )",
        &[],
    )
    .unwrap();
    for (migration, direction, created_at) in rows {
        db.execute(
            "INSERT INTO orm_migrations VALUES (?, ?, ?)",
            &[
                Value::from(*migration),
                Value::from(*direction),
                Value::from(*created_at),
            ],
        )
        .unwrap();
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn fresh_database_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.duckdb");

    assert_eq!(reconcile(&path).unwrap(), Reconciliation::Created);
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        let ledger = Ledger::with_defaults(&db);
        ledger.save("20200101_create_users").unwrap();
        ledger.save("20200102_add_email").unwrap();
        assert!(ledger.save("20200101_create_users").unwrap_err().is_duplicate());
    }

    assert_eq!(reconcile(&path).unwrap(), Reconciliation::Current);
    assert_eq!(
        applied(&path),
        vec!["20200102_add_email", "20200101_create_users"]
    );
}

#[test]
fn legacy_database_upgrades_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.duckdb");
    write_legacy(
        &path,
        &[
            ("20191201_users", "up", ts(1, 9)),
            ("20191202_orders", "up", ts(2, 9)),
            ("20191202_orders", "down", ts(3, 9)),
            ("20191203_audit", "up", ts(4, 9)),
            ("20191203_audit", "down", ts(5, 9)),
            ("20191203_audit", "up", ts(6, 9)),
        ],
    );

    assert_eq!(
        reconcile(&path).unwrap(),
        Reconciliation::Upgraded { pruned: 4 }
    );
    assert_eq!(applied(&path), vec!["20191203_audit", "20191201_users"]);

    assert_eq!(reconcile(&path).unwrap(), Reconciliation::Current);
    assert_eq!(applied(&path), vec!["20191203_audit", "20191201_users"]);

    let db = DuckDbBackend::from_path(&path).unwrap();
    assert_eq!(db.get_columns("orm_migrations").unwrap(), vec!["migration"]);
    let ledger = Ledger::with_defaults(&db);
    assert!(ledger.save("20191201_users").unwrap_err().is_duplicate());
    ledger.save("20191202_orders").unwrap();
    assert_eq!(ledger.last().unwrap().as_deref(), Some("20191203_audit"));
}

#[test]
fn legacy_scenario_leaves_single_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.duckdb");
    write_legacy(
        &path,
        &[
            ("20200101_a", "up", ts(1, 1)),
            ("20200101_a", "down", ts(1, 2)),
            ("20200102_b", "up", ts(1, 3)),
        ],
    );
    reconcile(&path).unwrap();
    assert_eq!(applied(&path), vec!["20200102_b"]);
}

#[test]
fn custom_config_ledger_round_trip() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config: LedgerConfig = LedgerConfig {
        table: "schema_ledger".to_string(),
        index: "schema_ledger_unique".to_string(),
    };
    let ledger = Ledger::new(&db, config).unwrap();
    Reconciler::new(&ledger).ensure_ledger().unwrap();

    ledger.save("20200101_a").unwrap();
    ledger.save("20200101_b").unwrap();
    ledger.save("20210101_c").unwrap();
    assert_eq!(ledger.delete("2020").unwrap(), 2);
    assert_eq!(ledger.all().unwrap(), vec!["20210101_c"]);
    assert!(db.has_table("schema_ledger").unwrap());
    assert!(!db.has_table("orm_migrations").unwrap());
}
