//! Outlet classification and network KPIs.
//!
//! Turns reconciled outlets into pipeline candidates and aggregates the
//! numbers the operations team steers by: stockout rate, coverage,
//! dormant cash, and the under/over-target posture of the network.

use std::fmt;

use serde::Serialize;

use crate::reconcile::ReconciledOutlet;
use crate::types::{OutletCandidate, StockStatus};

// ---------------------------------------------------------------------------
// Operating thresholds
// ---------------------------------------------------------------------------

/// Days-of-stock below which an outlet is in stockout.
pub const STOCKOUT_DAYS: f64 = 0.5;
/// Days-of-stock below which an outlet is under tension.
pub const TENSION_DAYS: f64 = 1.0;
/// Upper bound of the comfort band; above this is overstock.
pub const COMFORT_DAYS: f64 = 3.0;
/// Days-of-stock above which an outlet's balance counts as dormant cash.
pub const DORMANT_DAYS: f64 = 5.0;
/// Network stockout rate (percent) above which the network is critical.
pub const CRITICAL_STOCKOUT_RATE: f64 = 20.0;
/// Network-wide coverage objective, in days of stock.
pub const TARGET_COVERAGE_DAYS: f64 = 1.0;
/// Share of under-target outlets (percent) above which the network
/// posture is Understocked.
pub const UNDERSTOCK_SHARE: f64 = 60.0;
/// Share of under-target outlets (percent) below which the posture is
/// Overstocked.
pub const OVERSTOCK_SHARE: f64 = 40.0;

/// Band an outlet by its days-of-stock.
pub fn classify_days(days_of_stock: f64) -> StockStatus {
    if days_of_stock < STOCKOUT_DAYS {
        StockStatus::Stockout
    } else if days_of_stock < TENSION_DAYS {
        StockStatus::Tension
    } else if days_of_stock <= COMFORT_DAYS {
        StockStatus::Comfort
    } else {
        StockStatus::Overstock
    }
}

/// Build a pipeline candidate from a reconciled outlet.
pub fn classify_outlet(outlet: &ReconciledOutlet, timestamp: &str) -> OutletCandidate {
    OutletCandidate {
        msisdn: outlet.msisdn.clone(),
        name: outlet.name.clone(),
        site: outlet.site.clone(),
        route: outlet.route.clone(),
        sub_zone: outlet.sub_zone.clone(),
        balance: outlet.balance,
        target_amount: outlet.target_amount,
        net_position: outlet.net_position,
        days_of_stock: outlet.days_of_stock,
        gap: outlet.gap(),
        status: classify_days(outlet.days_of_stock),
        detection_timestamp: timestamp.to_string(),
        priority_score: None,
        urgency_score: None,
    }
}

// ---------------------------------------------------------------------------
// Network summary
// ---------------------------------------------------------------------------

/// Which way the network as a whole is leaning against its targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NetworkPosture {
    /// Most outlets sit below their objective; recharge globally.
    Understocked,
    /// Most outlets sit above their objective; dormant cash to recover.
    Overstocked,
    /// Split network; target the extremes.
    Balanced,
}

impl fmt::Display for NetworkPosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkPosture::Understocked => write!(f, "Understocked"),
            NetworkPosture::Overstocked => write!(f, "Overstocked"),
            NetworkPosture::Balanced => write!(f, "Balanced"),
        }
    }
}

/// Aggregate KPIs over a set of classified outlets.
#[derive(Clone, Debug, Serialize)]
pub struct NetworkSummary {
    pub outlets: usize,
    /// Σ balance, FCFA.
    pub total_balance: f64,
    /// Σ target, FCFA.
    pub total_target: f64,
    /// Σ balance over outlets beyond [`DORMANT_DAYS`].
    pub dormant_cash: f64,
    pub stockout_count: usize,
    pub tension_count: usize,
    pub comfort_count: usize,
    pub overstock_count: usize,
    /// Percent of outlets in stockout. The rupture rate.
    pub stockout_rate: f64,
    /// total_balance / total_target, in days; 0 when there is no target.
    pub coverage_days: f64,
    /// Outlets with balance strictly below target.
    pub under_target: usize,
    pub over_target: usize,
    /// Percent of outlets under target.
    pub under_target_share: f64,
    pub posture: NetworkPosture,
}

impl NetworkSummary {
    /// The red-banner condition: stockout rate beyond the critical
    /// threshold.
    pub fn is_critical(&self) -> bool {
        self.stockout_rate > CRITICAL_STOCKOUT_RATE
    }
}

/// Compute network KPIs over classified outlets.
pub fn network_summary(candidates: &[OutletCandidate]) -> NetworkSummary {
    let outlets = candidates.len();
    let total_balance: f64 = candidates.iter().map(|c| c.balance).sum();
    let total_target: f64 = candidates.iter().map(|c| c.target_amount).sum();
    let dormant_cash: f64 = candidates
        .iter()
        .filter(|c| c.days_of_stock > DORMANT_DAYS)
        .map(|c| c.balance)
        .sum();

    let mut stockout_count = 0;
    let mut tension_count = 0;
    let mut comfort_count = 0;
    let mut overstock_count = 0;
    for candidate in candidates {
        match candidate.status {
            StockStatus::Stockout => stockout_count += 1,
            StockStatus::Tension => tension_count += 1,
            StockStatus::Comfort => comfort_count += 1,
            StockStatus::Overstock => overstock_count += 1,
        }
    }

    let stockout_rate = if outlets > 0 {
        stockout_count as f64 / outlets as f64 * 100.0
    } else {
        0.0
    };
    let coverage_days = if total_target > 0.0 {
        total_balance / total_target
    } else {
        0.0
    };

    let under_target = candidates
        .iter()
        .filter(|c| c.balance < c.target_amount)
        .count();
    let over_target = outlets - under_target;
    let under_target_share = if outlets > 0 {
        under_target as f64 / outlets as f64 * 100.0
    } else {
        0.0
    };

    let posture = if outlets == 0 {
        NetworkPosture::Balanced
    } else if under_target_share > UNDERSTOCK_SHARE {
        NetworkPosture::Understocked
    } else if under_target_share < OVERSTOCK_SHARE {
        NetworkPosture::Overstocked
    } else {
        NetworkPosture::Balanced
    };

    NetworkSummary {
        outlets,
        total_balance,
        total_target,
        dormant_cash,
        stockout_count,
        tension_count,
        comfort_count,
        overstock_count,
        stockout_rate,
        coverage_days,
        under_target,
        over_target,
        under_target_share,
        posture,
    }
}
