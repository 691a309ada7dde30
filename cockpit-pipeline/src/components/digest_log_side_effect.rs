use std::sync::Arc;

use async_trait::async_trait;

use crate::stage::{SideEffect, SideEffectInput};
use crate::types::{NetworkQuery, OutletCandidate};

/// Logs the final shortlist so every digest leaves an audit trail of
/// what was recommended, tied to the request id.
pub struct DigestLogSideEffect;

#[async_trait]
impl SideEffect<NetworkQuery, OutletCandidate> for DigestLogSideEffect {
    async fn run(
        &self,
        input: Arc<SideEffectInput<NetworkQuery, OutletCandidate>>,
    ) -> Result<(), String> {
        let total_gap: f64 = input.selected_candidates.iter().map(|c| c.gap).sum();
        log::info!(
            "request_id={} digest selected {} outlets, {:.0} FCFA to recharge",
            input.query.request_id,
            input.selected_candidates.len(),
            total_gap
        );
        Ok(())
    }
}
