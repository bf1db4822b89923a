//! Pairing of legacy `up`/`down` rows.
//!
//! A legacy ledger is an append-only log: applying a migration appends an
//! `up` row, reverting it appends a `down` row. Each `down` cancels exactly
//! one `up` of the same migration. Rows are expected most recent first (the
//! order [`crate::Ledger::all_legacy`] returns), and pairing follows that
//! order: downs are visited most recent first, and each one consumes the most
//! recent `up` of the same name that no other down has consumed yet.

use crate::ledger::{Direction, LegacyKey, LegacyRow};
use std::collections::BTreeMap;

/// Outcome of pairing a legacy row set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PruningPlan {
    /// Rows to delete, in the order they must be deleted
    pub deletions: Vec<LegacyKey>,
    /// `up` rows no `down` cancelled, still in load order
    pub survivors: Vec<LegacyRow>,
}

impl PruningPlan {
    /// Migration names with more than one surviving `up` row, sorted.
    ///
    /// Such a ledger cannot take the unique index on `migration`.
    pub fn duplicate_survivors(&self) -> Vec<&str> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in &self.survivors {
            *counts.entry(row.migration.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Pair every `down` with an `up` and collect the rows to delete.
///
/// A `down` is always deleted, matched or not. Its matched `up` is deleted
/// right after it. Unmatched `up` rows survive.
pub fn plan_pruning(rows: &[LegacyRow]) -> PruningPlan {
    let mut remaining_ups: Vec<&LegacyRow> = rows
        .iter()
        .filter(|row| row.direction == Direction::Up)
        .collect();
    let mut deletions = Vec::new();

    for down in rows.iter().filter(|row| row.direction == Direction::Down) {
        deletions.push(down.key());
        match remaining_ups
            .iter()
            .position(|up| up.migration == down.migration)
        {
            Some(pos) => {
                let up = remaining_ups.remove(pos);
                deletions.push(up.key());
            }
            None => log::debug!(
                "Legacy down row for {} has no matching up row",
                down.migration
            ),
        }
    }

    PruningPlan {
        deletions,
        survivors: remaining_ups.into_iter().cloned().collect(),
    }
}

#[cfg(test)]
#[path = "pairing_test.rs"]
mod tests;
