use async_trait::async_trait;

use crate::stage::Scorer;
use crate::types::{NetworkQuery, OutletCandidate, StockStatus};

/// Scores outlets by recharge gap on a log scale, weighted by how
/// acute the stock position is.
///
/// The log keeps one enormous gap from drowning out a cluster of
/// urgent stockouts; the status multiplier puts a dry outlet ahead of
/// an equally-sized gap at a comfortable one.
pub struct GapScorer;

impl GapScorer {
    fn status_multiplier(status: StockStatus) -> f64 {
        match status {
            StockStatus::Stockout => 1.5,
            StockStatus::Tension => 1.2,
            StockStatus::Comfort => 1.0,
            StockStatus::Overstock => 0.7,
        }
    }
}

#[async_trait]
impl Scorer<NetworkQuery, OutletCandidate> for GapScorer {
    async fn score(
        &self,
        _query: &NetworkQuery,
        candidates: &[OutletCandidate],
    ) -> Result<Vec<OutletCandidate>, String> {
        let scored = candidates
            .iter()
            .map(|c| {
                let base_score = (c.gap + 1.0).ln(); // +1 handles a zero gap
                let multiplier = Self::status_multiplier(c.status);
                OutletCandidate {
                    priority_score: Some(base_score * multiplier),
                    ..OutletCandidate::default()
                }
            })
            .collect();

        Ok(scored)
    }

    fn update(&self, candidate: &mut OutletCandidate, scored: OutletCandidate) {
        candidate.priority_score = scored.priority_score;
    }
}
