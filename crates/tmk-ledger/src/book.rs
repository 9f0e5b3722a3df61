//! Per-asset collection of ledgers.

use std::collections::BTreeMap;

use crate::history::{build_ledger, HistoryError, ReplayOptions, ReplayReport, TxRecord};
use crate::ledger::FifoLedger;
use crate::types::{OversellPolicy, Summary};

/// One [`FifoLedger`] per asset id, iterated in sorted id order.
///
/// Ledgers are created empty on first reference through
/// [`LedgerBook::ledger_mut`] and inherit the book's oversell policy.
#[derive(Clone, Debug, Default)]
pub struct LedgerBook {
    ledgers: BTreeMap<String, FifoLedger>,
    oversell: OversellPolicy,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(oversell: OversellPolicy) -> Self {
        Self {
            ledgers: BTreeMap::new(),
            oversell,
        }
    }

    /// Ledger for `asset_id`, created empty if absent.
    pub fn ledger_mut(&mut self, asset_id: &str) -> &mut FifoLedger {
        let oversell = self.oversell;
        self.ledgers
            .entry(asset_id.to_string())
            .or_insert_with(|| FifoLedger::with_policy(oversell))
    }

    pub fn get(&self, asset_id: &str) -> Option<&FifoLedger> {
        self.ledgers.get(asset_id)
    }

    /// Replace (or insert) the ledger for `asset_id`.
    pub fn insert(&mut self, asset_id: &str, ledger: FifoLedger) {
        self.ledgers.insert(asset_id.to_string(), ledger);
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.ledgers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    pub fn summaries(&self) -> impl Iterator<Item = (&str, Summary)> {
        self.ledgers.iter().map(|(k, l)| (k.as_str(), l.summary()))
    }

    /// Replay a multi-asset history into one ledger per asset.
    ///
    /// Fails on the first asset whose replay fails; the book is only
    /// returned when every asset rebuilt.
    pub fn from_history(
        records: &[TxRecord],
        opts: ReplayOptions,
    ) -> Result<(Self, BTreeMap<String, ReplayReport>), HistoryError> {
        let mut ids: Vec<&str> = records.iter().map(|r| r.asset_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut book = Self::with_policy(opts.oversell);
        let mut reports = BTreeMap::new();
        for id in ids {
            let replay = build_ledger(id, records, opts)?;
            book.insert(id, replay.ledger);
            reports.insert(id.to_string(), replay.report);
        }
        Ok((book, reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixedpoint::{Micros, Qty};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ledgers_created_on_first_reference() {
        let mut book = LedgerBook::with_policy(OversellPolicy::Reject);
        assert!(book.get("gold").is_none());
        assert_eq!(book.ledger_mut("gold").oversell_policy(), OversellPolicy::Reject);
        assert_eq!(book.len(), 1);
        assert!(book.get("gold").unwrap().is_flat());
    }

    #[test]
    fn from_history_splits_by_asset_in_sorted_order() {
        let ts = |n: i64| Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap();
        let recs = vec![
            TxRecord::buy("zinc", "1", "5", ts(0)),
            TxRecord::buy("gold", "2", "10", ts(1)),
            TxRecord::sell("gold", "1", "20", ts(2)),
        ];
        let (book, reports) = LedgerBook::from_history(&recs, ReplayOptions::default()).unwrap();
        let assets: Vec<&str> = book.assets().collect();
        assert_eq!(assets, vec!["gold", "zinc"]);
        assert_eq!(reports["gold"].sales, 1);

        let sums: Vec<_> = book.summaries().collect();
        assert_eq!(sums[0].1.total_gain_loss, Micros::from_tokens(10));
        assert_eq!(book.get("zinc").unwrap().open_quantity(), Qty::from_units(1));
    }
}
