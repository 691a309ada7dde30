use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::outlet_classifier::classify_outlet;
use crate::reconcile::ReconciledOutlet;
use crate::stage::Source;
use crate::types::{NetworkQuery, OutletCandidate, UserRole};

/// Produces one candidate per reconciled outlet.
///
/// Classification happens here so every stage downstream sees the
/// status, gap and days-of-stock already derived. Route managers only
/// ever receive their own route.
pub struct ReconciliationSource {
    outlets: Vec<ReconciledOutlet>,
}

impl ReconciliationSource {
    pub fn new(outlets: Vec<ReconciledOutlet>) -> Self {
        Self { outlets }
    }
}

#[async_trait]
impl Source<NetworkQuery, OutletCandidate> for ReconciliationSource {
    fn enable(&self, _query: &NetworkQuery) -> bool {
        !self.outlets.is_empty()
    }

    async fn get_candidates(&self, query: &NetworkQuery) -> Result<Vec<OutletCandidate>, String> {
        let timestamp = if query.window.end.is_empty() {
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        } else {
            query.window.end.clone()
        };

        let mut candidates: Vec<OutletCandidate> = self
            .outlets
            .iter()
            .map(|outlet| classify_outlet(outlet, &timestamp))
            .collect();

        if let UserRole::RouteManager { ref route } = query.user_role {
            candidates.retain(|c| c.route == *route);
        }

        Ok(candidates)
    }
}
