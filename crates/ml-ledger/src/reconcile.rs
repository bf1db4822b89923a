//! Ledger table reconciliation.
//!
//! [`Reconciler::ensure_ledger`] converges whatever ledger table is present
//! to the current single-column layout:
//!
//! - no table: create it and its unique index
//! - one column: already current, nothing to do
//! - more columns: legacy ledger, prune paired `up`/`down` rows, drop the
//!   `direction` and `created_at` columns, then install the unique index
//!
//! The layout is detected from the column count alone. The sequence is not
//! transactional, but every intermediate state is detected again on the next
//! call, so a failed run can simply be retried.

use crate::error::{LedgerError, LedgerResult, Phase};
use crate::ledger::{Ledger, CREATED_AT_COLUMN, DIRECTION_COLUMN, MIGRATION_COLUMN};
use crate::logger::{LedgerLogger, NullLogger};
use crate::pairing::plan_pruning;
use ml_db::{ColumnSpec, ColumnType, IndexSpec};

/// Layout of the ledger table as found in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerShape {
    /// No ledger table
    Absent,
    /// Single `migration` column
    Current,
    /// Legacy layout with the listed columns
    Legacy { columns: Vec<String> },
}

/// What [`Reconciler::ensure_ledger`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Created,
    Current,
    Upgraded { pruned: usize },
}

/// Brings the ledger table to its current layout.
pub struct Reconciler<'a> {
    ledger: &'a Ledger<'a>,
    logger: Box<dyn LedgerLogger + 'a>,
}

impl<'a> Reconciler<'a> {
    pub fn new(ledger: &'a Ledger<'a>) -> Self {
        Self {
            ledger,
            logger: Box::new(NullLogger),
        }
    }

    /// Report lifecycle events to `logger` instead of discarding them.
    pub fn with_logger(mut self, logger: impl LedgerLogger + 'a) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Inspect the ledger table without changing it.
    pub fn detect_shape(&self) -> LedgerResult<LedgerShape> {
        let db = self.ledger.db();
        let table = &self.ledger.config().table;

        let exists = db
            .has_table(table)
            .map_err(|e| LedgerError::storage(Phase::ExistenceCheck, e))?;
        if !exists {
            return Ok(LedgerShape::Absent);
        }

        let columns = db
            .get_columns(table)
            .map_err(|e| LedgerError::storage(Phase::ColumnIntrospection, e))?;
        match columns.len() {
            0 => Err(LedgerError::InvariantViolation(format!(
                "ledger table {table} reports no columns"
            ))),
            1 => Ok(LedgerShape::Current),
            _ => Ok(LedgerShape::Legacy { columns }),
        }
    }

    /// Converge the ledger table to the current layout.
    ///
    /// Callers must not run two reconciliations against the same table at
    /// once: shape detection and the following changes are not atomic.
    pub fn ensure_ledger(&self) -> LedgerResult<Reconciliation> {
        match self.detect_shape()? {
            LedgerShape::Absent => {
                self.logger.log("init", "No migrations table, creating one");
                self.create_table()?;
                self.install_index()?;
                Ok(Reconciliation::Created)
            }
            LedgerShape::Current => {
                log::debug!("Ledger table {} is current", self.ledger.config().table);
                Ok(Reconciliation::Current)
            }
            LedgerShape::Legacy { columns } => {
                self.logger
                    .log("init", "Migrations table is v1, changing to v2");
                let pruned = self.upgrade(&columns)?;
                Ok(Reconciliation::Upgraded { pruned })
            }
        }
    }

    fn create_table(&self) -> LedgerResult<()> {
        let column = ColumnSpec::new(MIGRATION_COLUMN, ColumnType::Text).required();
        self.ledger
            .db()
            .create_table(&self.ledger.config().table, &[column])
            .map_err(|e| LedgerError::storage(Phase::TableCreation, e))
    }

    fn install_index(&self) -> LedgerResult<()> {
        let config = self.ledger.config();
        let index = IndexSpec::unique(config.table.as_str(), &[MIGRATION_COLUMN]);
        self.ledger
            .db()
            .add_index(&config.index, &index)
            .map_err(|e| LedgerError::storage(Phase::IndexCreation, e))
    }

    fn upgrade(&self, columns: &[String]) -> LedgerResult<usize> {
        let known = [MIGRATION_COLUMN, DIRECTION_COLUMN, CREATED_AT_COLUMN];
        let unexpected: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|c| !known.contains(c))
            .collect();
        if !unexpected.is_empty() || !columns.iter().any(|c| c == MIGRATION_COLUMN) {
            return Err(LedgerError::InvariantViolation(format!(
                "ledger table {} has unrecognized layout: {}",
                self.ledger.config().table,
                columns.join(", ")
            )));
        }

        let has = |name: &str| columns.iter().any(|c| c == name);

        // A previous run that already dropped `direction` finished pruning.
        let pruned = if has(DIRECTION_COLUMN) && has(CREATED_AT_COLUMN) {
            self.prune_legacy_rows()?
        } else {
            log::debug!("Legacy columns partially dropped, skipping pairing");
            0
        };

        for column in [DIRECTION_COLUMN, CREATED_AT_COLUMN] {
            if has(column) {
                log::debug!("Dropping legacy column {column}");
                self.ledger
                    .db()
                    .drop_column(&self.ledger.config().table, column)
                    .map_err(|e| LedgerError::storage(Phase::ColumnDrop, e))?;
            }
        }

        self.install_index()?;
        Ok(pruned)
    }

    /// Delete every `down` row and the `up` row each one cancels.
    fn prune_legacy_rows(&self) -> LedgerResult<usize> {
        let rows = self.ledger.all_legacy()?;
        let plan = plan_pruning(&rows);

        let duplicates = plan.duplicate_survivors();
        if !duplicates.is_empty() {
            return Err(LedgerError::InvariantViolation(format!(
                "legacy ledger applies these migrations more often than it reverts them: {}; \
                 delete the extra `up` rows from {} by hand, then retry",
                duplicates.join(", "),
                self.ledger.config().table
            )));
        }

        for key in &plan.deletions {
            log::debug!(
                "Pruning legacy row {} recorded at {}",
                key.migration,
                key.created_at
            );
            if self.ledger.delete_legacy(key)? == 0 {
                return Err(LedgerError::InvariantViolation(format!(
                    "legacy row {} recorded at {} matched nothing on delete; legacy columns left in place",
                    key.migration, key.created_at
                )));
            }
        }
        Ok(plan.deletions.len())
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
