//! Ledger accessors.
//!
//! [`Ledger`] reads and writes the table that records applied migrations.
//! The current layout holds one uniquely indexed `migration` column; the
//! legacy layout adds `direction` and `created_at` and is only read while
//! the [`crate::Reconciler`] upgrades it.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult, Phase};
use chrono::NaiveDateTime;
use ml_db::sql_utils::{escape_like, quote_qualified};
use ml_db::{Database, DbError, Row, Value};
use std::fmt;
use std::str::FromStr;

pub const MIGRATION_COLUMN: &str = "migration";
pub const DIRECTION_COLUMN: &str = "direction";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Direction a legacy ledger row was recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

impl FromStr for Direction {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(DbError::DecodeError(format!(
                "unknown migration direction '{other}'"
            ))),
        }
    }
}

/// Identity of a legacy row: the name alone repeats across `up`/`down`
/// entries and re-applications, the timestamp disambiguates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegacyKey {
    pub migration: String,
    pub created_at: NaiveDateTime,
}

/// One row of a legacy ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRow {
    pub migration: String,
    pub direction: Direction,
    pub created_at: NaiveDateTime,
}

impl LegacyRow {
    pub fn key(&self) -> LegacyKey {
        LegacyKey {
            migration: self.migration.clone(),
            created_at: self.created_at,
        }
    }

    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            migration: row.text(MIGRATION_COLUMN)?,
            direction: row.text(DIRECTION_COLUMN)?.parse()?,
            created_at: row.timestamp(CREATED_AT_COLUMN)?,
        })
    }
}

/// Accessors over the migrations ledger table.
pub struct Ledger<'a> {
    db: &'a dyn Database,
    config: LedgerConfig,
    table_sql: String,
}

impl<'a> Ledger<'a> {
    /// Create a ledger over `db` after validating `config`.
    pub fn new(db: &'a dyn Database, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let table_sql = quote_qualified(&config.table);
        Ok(Self {
            db,
            config,
            table_sql,
        })
    }

    /// Ledger on the default `orm_migrations` table.
    pub fn with_defaults(db: &'a dyn Database) -> Self {
        let config = LedgerConfig::default();
        let table_sql = quote_qualified(&config.table);
        Self {
            db,
            config,
            table_sql,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn db(&self) -> &'a dyn Database {
        self.db
    }

    /// The greatest applied migration name, `None` on an empty ledger.
    pub fn last(&self) -> LedgerResult<Option<String>> {
        let sql = format!(
            "SELECT migration FROM {} ORDER BY migration DESC LIMIT 1",
            self.table_sql
        );
        let rows = self
            .db
            .exec_query(&sql, &[])
            .map_err(|e| LedgerError::storage(Phase::LastApplied, e))?;
        rows.first()
            .map(|row| row.text(MIGRATION_COLUMN))
            .transpose()
            .map_err(|e| LedgerError::storage(Phase::LastApplied, e))
    }

    /// Every applied migration name, most recent first.
    pub fn all(&self) -> LedgerResult<Vec<String>> {
        let sql = format!(
            "SELECT migration FROM {} ORDER BY migration DESC",
            self.table_sql
        );
        self.db
            .exec_query(&sql, &[])
            .and_then(|rows| rows.iter().map(|row| row.text(MIGRATION_COLUMN)).collect())
            .map_err(|e| LedgerError::storage(Phase::AllApplied, e))
    }

    /// Record `migration` as applied.
    ///
    /// Fails if it is already recorded; see [`LedgerError::is_duplicate`].
    pub fn save(&self, migration: &str) -> LedgerResult<()> {
        let sql = format!("INSERT INTO {} (migration) VALUES (?)", self.table_sql);
        self.db
            .execute(&sql, &[Value::from(migration)])
            .map_err(|e| LedgerError::storage(Phase::RecordApplied, e))?;
        log::debug!("Recorded migration {migration} as applied");
        Ok(())
    }

    /// Forget every migration whose name starts with `prefix`.
    ///
    /// Returns how many rows were removed; zero is not an error.
    pub fn delete(&self, prefix: &str) -> LedgerResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE migration LIKE ? ESCAPE '\\'",
            self.table_sql
        );
        let pattern = format!("{}%", escape_like(prefix));
        let removed = self
            .db
            .execute(&sql, &[Value::from(pattern)])
            .map_err(|e| LedgerError::storage(Phase::Forget, e))?;
        log::debug!("Forgot {removed} migration(s) matching prefix '{prefix}'");
        Ok(removed)
    }

    /// Legacy rows, most recent `created_at` first.
    ///
    /// Only valid while the table still has the legacy layout. `direction`
    /// may be an enum type in older installs. `created_at` is read at
    /// microsecond precision in session time, the same form
    /// [`Ledger::delete_legacy`] compares against.
    pub fn all_legacy(&self) -> LedgerResult<Vec<LegacyRow>> {
        let sql = format!(
            "SELECT migration, CAST(direction AS VARCHAR) AS direction, \
             CAST(created_at AS TIMESTAMP) AS created_at FROM {} \
             ORDER BY created_at DESC, migration DESC",
            self.table_sql
        );
        self.db
            .exec_query(&sql, &[])
            .and_then(|rows| rows.iter().map(LegacyRow::from_row).collect())
            .map_err(|e| LedgerError::storage(Phase::LoadLegacy, e))
    }

    /// Delete the legacy row identified by `key`.
    ///
    /// Returns how many rows were removed. Callers that planned the delete
    /// from [`Ledger::all_legacy`] should treat zero as a broken plan.
    pub fn delete_legacy(&self, key: &LegacyKey) -> LedgerResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE migration = ? AND CAST(created_at AS TIMESTAMP) = ?",
            self.table_sql
        );
        self.db
            .execute(
                &sql,
                &[
                    Value::from(key.migration.as_str()),
                    Value::from(key.created_at),
                ],
            )
            .map_err(|e| LedgerError::storage(Phase::PairingDelete, e))
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
