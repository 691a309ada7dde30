use async_trait::async_trait;

use crate::stage::Hydrator;
use crate::types::{NetworkQuery, OutletCandidate, StockStatus};

/// Attaches an urgency score from the stock status.
///
/// Urgency is a presentation signal (how loudly the digest flags the
/// line), distinct from priority (where the line ranks).
pub struct UrgencyHydrator;

#[async_trait]
impl Hydrator<NetworkQuery, OutletCandidate> for UrgencyHydrator {
    async fn hydrate(
        &self,
        _query: &NetworkQuery,
        candidates: &[OutletCandidate],
    ) -> Result<Vec<OutletCandidate>, String> {
        let hydrated = candidates
            .iter()
            .map(|c| {
                let urgency = match c.status {
                    StockStatus::Stockout => 0.9,
                    StockStatus::Tension => 0.7,
                    StockStatus::Comfort => 0.4,
                    StockStatus::Overstock => 0.2,
                };
                OutletCandidate {
                    urgency_score: Some(urgency),
                    ..OutletCandidate::default()
                }
            })
            .collect();
        Ok(hydrated)
    }

    fn update(&self, candidate: &mut OutletCandidate, hydrated: OutletCandidate) {
        candidate.urgency_score = hydrated.urgency_score;
    }
}
