//! Error types for the migration ledger.

use ml_db::DbError;
use std::fmt;
use thiserror::Error;

/// Step of a ledger operation, reported with storage failures so callers can
/// decide between retrying and aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LastApplied,
    AllApplied,
    RecordApplied,
    Forget,
    LoadLegacy,
    ExistenceCheck,
    ColumnIntrospection,
    TableCreation,
    PairingDelete,
    ColumnDrop,
    IndexCreation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LastApplied => "last applied lookup",
            Phase::AllApplied => "applied list",
            Phase::RecordApplied => "record applied",
            Phase::Forget => "forget",
            Phase::LoadLegacy => "legacy load",
            Phase::ExistenceCheck => "existence check",
            Phase::ColumnIntrospection => "column introspection",
            Phase::TableCreation => "table creation",
            Phase::PairingDelete => "pairing delete",
            Phase::ColumnDrop => "column drop",
            Phase::IndexCreation => "index creation",
        };
        f.write_str(name)
    }
}

/// Migration ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The storage layer rejected an operation (L001).
    #[error("[L001] Ledger storage failed during {phase}: {source}")]
    Storage {
        phase: Phase,
        #[source]
        source: DbError,
    },

    /// The ledger contents cannot be converged safely (L002).
    #[error("[L002] Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// Ledger configuration rejected by validation (L003).
    #[error("[L003] Invalid ledger config: {0}")]
    ConfigInvalid(String),
}

/// Result type alias for [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub(crate) fn storage(phase: Phase, source: DbError) -> Self {
        LedgerError::Storage { phase, source }
    }

    /// The failing phase, for storage errors.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LedgerError::Storage { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// True when a save failed because the migration is already recorded.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            LedgerError::Storage { phase: Phase::RecordApplied, source } if source.is_constraint_violation()
        )
    }
}
