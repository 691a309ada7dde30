//! Network balance summary.
//!
//! One row per agent, keyed by MSISDN. Re-processing an export for an
//! agent replaces the previous snapshot — the summary always holds the
//! latest known balance, never the history.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::snapshot::{BalanceSnapshot, IngestError};

/// CSV row shape for persistence. Column order matches the original
/// summary file: date, msisdn, balance.
#[derive(Debug, Serialize, Deserialize)]
struct SummaryRow {
    date: String,
    msisdn: String,
    balance: f64,
}

/// In-memory balance summary with CSV persistence.
///
/// Backed by a `BTreeMap` so iteration, persistence and diffing are
/// deterministic across runs.
#[derive(Debug, Default)]
pub struct SummaryStore {
    entries: BTreeMap<String, BalanceSnapshot>,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot for an agent.
    ///
    /// Returns `true` when an earlier snapshot was replaced.
    pub fn upsert(&mut self, snapshot: BalanceSnapshot) -> bool {
        self.entries
            .insert(snapshot.msisdn.clone(), snapshot)
            .is_some()
    }

    pub fn get(&self, msisdn: &str) -> Option<&BalanceSnapshot> {
        self.entries.get(msisdn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots in MSISDN order.
    pub fn snapshots(&self) -> impl Iterator<Item = &BalanceSnapshot> {
        self.entries.values()
    }

    /// Load a summary CSV written by [`SummaryStore::save`].
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let file = std::fs::File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut store = Self::new();
        for row in reader.deserialize() {
            let row: SummaryRow = row?;
            store.upsert(BalanceSnapshot {
                msisdn: row.msisdn,
                captured_at: row.date,
                balance: row.balance,
            });
        }
        Ok(store)
    }

    /// Write the summary as CSV, one row per agent.
    pub fn save(&self, path: &Path) -> Result<(), IngestError> {
        let file = std::fs::File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for snapshot in self.entries.values() {
            writer.serialize(SummaryRow {
                date: snapshot.captured_at.clone(),
                msisdn: snapshot.msisdn.clone(),
                balance: snapshot.balance,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(msisdn: &str, date: &str, balance: f64) -> BalanceSnapshot {
        BalanceSnapshot {
            msisdn: msisdn.to_string(),
            captured_at: date.to_string(),
            balance,
        }
    }

    #[test]
    fn upsert_replaces_earlier_snapshot() {
        let mut store = SummaryStore::new();
        assert!(!store.upsert(snap("699000001", "2026-01-01 08:00:00", 10_000.0)));
        assert!(store.upsert(snap("699000001", "2026-01-01 17:45:00", 2_500.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("699000001").unwrap().balance, 2_500.0);
        assert_eq!(
            store.get("699000001").unwrap().captured_at,
            "2026-01-01 17:45:00"
        );
    }

    #[test]
    fn snapshots_iterate_in_msisdn_order() {
        let mut store = SummaryStore::new();
        store.upsert(snap("699000009", "d", 1.0));
        store.upsert(snap("699000001", "d", 2.0));
        store.upsert(snap("699000005", "d", 3.0));
        let order: Vec<&str> = store.snapshots().map(|s| s.msisdn.as_str()).collect();
        assert_eq!(order, vec!["699000001", "699000005", "699000009"]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        let mut store = SummaryStore::new();
        store.upsert(snap("699000001", "2026-01-01 12:00:00", 50_000.0));
        store.upsert(snap("699000002", "2026-01-01 12:05:00", 0.0));
        store.save(&path).unwrap();

        let loaded = SummaryStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("699000001").unwrap().balance, 50_000.0);
        assert_eq!(
            loaded.get("699000002").unwrap().captured_at,
            "2026-01-01 12:05:00"
        );
    }
}
