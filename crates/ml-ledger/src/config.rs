//! Ledger configuration.
//!
//! [`LedgerConfig`] is meant to be embedded in the host application's own
//! configuration file; reading that file is the host's job.

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

/// Default ledger table name
pub const DEFAULT_TABLE: &str = "orm_migrations";

/// Default name of the unique index on the `migration` column
pub const DEFAULT_INDEX: &str = "unique_orm_migrations";

/// Names of the ledger table and its unique index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Ledger table, optionally schema-qualified (`schema.table`)
    #[serde(default = "default_table")]
    pub table: String,

    /// Unique index installed on the `migration` column
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            index: default_index(),
        }
    }
}

impl LedgerConfig {
    /// Check that both names are plain SQL identifiers.
    ///
    /// The table may carry one schema qualifier; the index may not.
    pub fn validate(&self) -> LedgerResult<()> {
        let parts: Vec<&str> = self.table.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(LedgerError::ConfigInvalid(format!(
                "table '{}' is not a valid (optionally schema-qualified) identifier",
                self.table
            )));
        }
        if !is_identifier(&self.index) {
            return Err(LedgerError::ConfigInvalid(format!(
                "index '{}' is not a valid identifier",
                self.index
            )));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
