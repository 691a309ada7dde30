use std::fmt;

use serde::Serialize;

use crate::candidate_pipeline::HasRequestId;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Time window for an analysis run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisWindow {
    /// ISO-8601 start timestamp.
    pub start: String,
    /// ISO-8601 end timestamp.
    pub end: String,
}

/// Optional cluster narrowing. Any field that is set must match; the
/// fields cascade the same way the original sidebar did (site, then
/// distribution route, then sub-zone).
#[derive(Clone, Debug, Default)]
pub struct ClusterSelection {
    pub site: Option<String>,
    pub route: Option<String>,
    pub sub_zone: Option<String>,
}

impl ClusterSelection {
    pub fn is_empty(&self) -> bool {
        self.site.is_none() && self.route.is_none() && self.sub_zone.is_none()
    }
}

/// The role of the user requesting the digest.
#[derive(Clone, Debug)]
pub enum UserRole {
    /// Sees the whole network.
    Executive,
    /// Sees only their distribution route.
    RouteManager { route: String },
}

/// A digest request from an operations user.
#[derive(Clone, Debug)]
pub struct NetworkQuery {
    pub request_id: String,
    pub user_id: String,
    pub user_role: UserRole,
    pub clusters: ClusterSelection,
    pub window: AnalysisWindow,
}

impl HasRequestId for NetworkQuery {
    fn request_id(&self) -> &str {
        &self.request_id
    }
}

// ---------------------------------------------------------------------------
// Candidate types
// ---------------------------------------------------------------------------

/// Stock health band for one outlet, from its days-of-stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StockStatus {
    /// Under half a day of float left. Counts toward the rupture rate.
    Stockout,
    /// Under a day. Recharge before the next business peak.
    Tension,
    /// One to three days. Where the network should sit.
    Comfort,
    /// More than three days. Cash parked where it earns nothing.
    Overstock,
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::Stockout => write!(f, "Stockout"),
            StockStatus::Tension => write!(f, "Tension"),
            StockStatus::Comfort => write!(f, "Comfort"),
            StockStatus::Overstock => write!(f, "Overstock"),
        }
    }
}

/// One point of sale flowing through the recharge pipeline.
#[derive(Clone, Debug, Serialize)]
pub struct OutletCandidate {
    /// Agent wallet number.
    pub msisdn: String,
    pub name: String,
    pub site: String,
    pub route: String,
    pub sub_zone: String,

    /// Current float balance, FCFA.
    pub balance: f64,
    /// Float objective for this outlet, FCFA.
    pub target_amount: f64,
    /// balance − target.
    pub net_position: f64,
    /// balance / target; 0 when the outlet has no target.
    pub days_of_stock: f64,
    /// Amount to recharge: max(0, target − balance).
    pub gap: f64,
    pub status: StockStatus,
    pub detection_timestamp: String,

    // Scoring fields (populated by scorers and hydrators)
    pub priority_score: Option<f64>,
    pub urgency_score: Option<f64>,
}

impl Default for OutletCandidate {
    fn default() -> Self {
        Self {
            msisdn: String::new(),
            name: String::new(),
            site: String::new(),
            route: String::new(),
            sub_zone: String::new(),
            balance: 0.0,
            target_amount: 0.0,
            net_position: 0.0,
            days_of_stock: 0.0,
            gap: 0.0,
            status: StockStatus::Comfort,
            detection_timestamp: String::new(),
            priority_score: None,
            urgency_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_displays_human_names() {
        assert_eq!(StockStatus::Stockout.to_string(), "Stockout");
        assert_eq!(StockStatus::Overstock.to_string(), "Overstock");
    }

    #[test]
    fn empty_cluster_selection() {
        assert!(ClusterSelection::default().is_empty());
        let sel = ClusterSelection {
            route: Some("Rte_4".into()),
            ..ClusterSelection::default()
        };
        assert!(!sel.is_empty());
    }
}
