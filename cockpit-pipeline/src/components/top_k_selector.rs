use crate::stage::Selector;
use crate::types::{NetworkQuery, OutletCandidate};

/// Selects the top K outlets by priority score.
///
/// K defaults to 15 — the size of the recharge shortlist a route team
/// can actually act on in a day.
pub struct TopKSelector {
    pub k: usize,
}

impl Default for TopKSelector {
    fn default() -> Self {
        Self { k: 15 }
    }
}

impl Selector<NetworkQuery, OutletCandidate> for TopKSelector {
    fn score(&self, candidate: &OutletCandidate) -> f64 {
        candidate.priority_score.unwrap_or(f64::NEG_INFINITY)
    }

    fn size(&self) -> Option<usize> {
        Some(self.k)
    }
}
