//! Balance ↔ target reconciliation.
//!
//! Inner-joins the balance summary against the float-target table on
//! MSISDN and derives the per-outlet metrics everything downstream runs
//! on. Agents present on only one side are dropped (and counted): a
//! balance without a target has no objective to measure against, and a
//! target without a balance is an agent whose export never arrived.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cockpit_ingest::SummaryStore;

use crate::targets::FloatTarget;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One outlet after reconciliation. Serializes straight to the
/// reconciliation CSV consumed by downstream tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconciledOutlet {
    pub msisdn: String,
    pub name: String,
    pub site: String,
    pub route: String,
    pub sub_zone: String,
    /// Current float balance, FCFA.
    pub balance: f64,
    /// Float objective, FCFA.
    pub target_amount: f64,
    /// balance − target.
    pub net_position: f64,
    /// balance / target; 0 when the target is 0.
    pub days_of_stock: f64,
}

impl ReconciledOutlet {
    /// Amount needed to bring the outlet back to its objective.
    pub fn gap(&self) -> f64 {
        (self.target_amount - self.balance).max(0.0)
    }
}

/// Join outcome counters, for logging and the digest summary line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Agents on both sides.
    pub matched: usize,
    /// Balances with no target row.
    pub unmatched_balances: usize,
    /// Targets with no balance row.
    pub unmatched_targets: usize,
}

/// Reconcile the balance summary against the (deduplicated) targets.
///
/// Output is MSISDN-ordered.
pub fn reconcile(summary: &SummaryStore, targets: &[FloatTarget]) -> (Vec<ReconciledOutlet>, JoinStats) {
    let target_index: BTreeMap<&str, &FloatTarget> =
        targets.iter().map(|t| (t.msisdn.as_str(), t)).collect();

    let mut outlets = Vec::new();
    let mut stats = JoinStats::default();

    for snapshot in summary.snapshots() {
        let Some(target) = target_index.get(snapshot.msisdn.as_str()) else {
            stats.unmatched_balances += 1;
            continue;
        };
        stats.matched += 1;

        let balance = snapshot.balance;
        let target_amount = target.target_amount;
        let days_of_stock = if target_amount != 0.0 {
            balance / target_amount
        } else {
            0.0
        };

        outlets.push(ReconciledOutlet {
            msisdn: snapshot.msisdn.clone(),
            name: target
                .name
                .clone()
                .unwrap_or_else(|| snapshot.msisdn.clone()),
            site: target.site.clone(),
            route: target.route.clone(),
            sub_zone: target.sub_zone.clone(),
            balance,
            target_amount,
            net_position: balance - target_amount,
            days_of_stock,
        });
    }

    stats.unmatched_targets = targets.len() - stats.matched;

    if stats.unmatched_balances > 0 || stats.unmatched_targets > 0 {
        log::info!(
            "reconciliation joined {} outlets ({} balances without target, {} targets without balance)",
            stats.matched,
            stats.unmatched_balances,
            stats.unmatched_targets
        );
    }

    (outlets, stats)
}

/// Write the reconciliation table as CSV.
pub fn write_reconciliation(path: &Path, outlets: &[ReconciledOutlet]) -> Result<(), ReconcileError> {
    let file = std::fs::File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for outlet in outlets {
        writer.serialize(outlet)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a reconciliation table written by [`write_reconciliation`].
pub fn load_reconciliation(path: &Path) -> Result<Vec<ReconciledOutlet>, ReconcileError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut outlets = Vec::new();
    for row in reader.deserialize() {
        outlets.push(row?);
    }
    Ok(outlets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cockpit_ingest::BalanceSnapshot;

    fn summary_with(entries: &[(&str, f64)]) -> SummaryStore {
        let mut store = SummaryStore::new();
        for (msisdn, balance) in entries {
            store.upsert(BalanceSnapshot {
                msisdn: msisdn.to_string(),
                captured_at: "2026-01-05 08:00:00".to_string(),
                balance: *balance,
            });
        }
        store
    }

    fn target(msisdn: &str, amount: f64) -> FloatTarget {
        FloatTarget {
            msisdn: msisdn.to_string(),
            target_amount: amount,
            site: "Douala".to_string(),
            sub_zone: "Cité Sic".to_string(),
            route: "Rte_1".to_string(),
            segment: None,
            name: Some(format!("AGENT {msisdn}")),
        }
    }

    #[test]
    fn inner_join_drops_one_sided_agents() {
        let summary = summary_with(&[("699000001", 60000.0), ("699000002", 10000.0)]);
        let targets = vec![target("699000002", 80000.0), target("699000003", 40000.0)];

        let (outlets, stats) = reconcile(&summary, &targets);

        assert_eq!(outlets.len(), 1);
        assert_eq!(outlets[0].msisdn, "699000002");
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched_balances, 1);
        assert_eq!(stats.unmatched_targets, 1);
    }

    #[test]
    fn derived_metrics_follow_the_formulas() {
        let summary = summary_with(&[("699000001", 60000.0)]);
        let targets = vec![target("699000001", 120000.0)];

        let (outlets, _) = reconcile(&summary, &targets);
        let outlet = &outlets[0];

        assert!((outlet.net_position - -60000.0).abs() < 0.01);
        assert!((outlet.days_of_stock - 0.5).abs() < 1e-9);
        assert!((outlet.gap() - 60000.0).abs() < 0.01);
        assert_eq!(outlet.name, "AGENT 699000001");
    }

    #[test]
    fn zero_target_guards_the_division() {
        let summary = summary_with(&[("699000001", 60000.0)]);
        let targets = vec![target("699000001", 0.0)];

        let (outlets, _) = reconcile(&summary, &targets);
        assert_eq!(outlets[0].days_of_stock, 0.0);
        assert_eq!(outlets[0].gap(), 0.0);
    }

    #[test]
    fn name_falls_back_to_msisdn() {
        let summary = summary_with(&[("699000001", 1000.0)]);
        let mut t = target("699000001", 2000.0);
        t.name = None;
        let (outlets, _) = reconcile(&summary, &[t]);
        assert_eq!(outlets[0].name, "699000001");
    }

    #[test]
    fn overfunded_outlet_has_zero_gap() {
        let summary = summary_with(&[("699000001", 500000.0)]);
        let targets = vec![target("699000001", 100000.0)];
        let (outlets, _) = reconcile(&summary, &targets);
        assert_eq!(outlets[0].gap(), 0.0);
        assert!((outlets[0].days_of_stock - 5.0).abs() < 1e-9);
    }

    #[test]
    fn reconciliation_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconciliation.csv");

        let summary = summary_with(&[("699000001", 60000.0), ("699000002", 90000.0)]);
        let targets = vec![target("699000001", 120000.0), target("699000002", 30000.0)];
        let (outlets, _) = reconcile(&summary, &targets);

        write_reconciliation(&path, &outlets).unwrap();
        let loaded = load_reconciliation(&path).unwrap();
        assert_eq!(loaded, outlets);
    }
}
