use async_trait::async_trait;

use crate::stage::{Filter, FilterResult};
use crate::types::{NetworkQuery, OutletCandidate};

/// Removes outlets whose balance already covers the objective — there
/// is nothing to recharge, so they have no business in the ranked list.
///
/// A minimum gap keeps sub-trivial recharges (a few hundred FCFA) out
/// of the digest when configured.
pub struct FundedOutletFilter {
    pub min_gap: f64,
}

impl FundedOutletFilter {
    pub fn new(min_gap: f64) -> Self {
        Self { min_gap }
    }
}

impl Default for FundedOutletFilter {
    fn default() -> Self {
        Self { min_gap: 0.0 }
    }
}

#[async_trait]
impl Filter<NetworkQuery, OutletCandidate> for FundedOutletFilter {
    async fn filter(
        &self,
        _query: &NetworkQuery,
        candidates: Vec<OutletCandidate>,
    ) -> Result<FilterResult<OutletCandidate>, String> {
        let (kept, removed): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.gap > self.min_gap);

        Ok(FilterResult { kept, removed })
    }
}
