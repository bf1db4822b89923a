//! Migration ledger.
//!
//! Records which schema migrations are currently applied to a database and
//! converges the ledger table to its current single-column layout, upgrading
//! legacy `up`/`down` ledgers in place. The storage layer is consumed through
//! [`ml_db::Database`].

pub mod config;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod pairing;
pub mod reconcile;
#[cfg(test)]
pub(crate) mod test_utils;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult, Phase};
pub use ledger::{Direction, LegacyKey, LegacyRow, Ledger};
pub use logger::{FacadeLogger, LedgerLogger, NullLogger};
pub use pairing::{plan_pruning, PruningPlan};
pub use reconcile::{LedgerShape, Reconciler, Reconciliation};
