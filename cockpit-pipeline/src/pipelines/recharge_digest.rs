use std::sync::Arc;

use async_trait::async_trait;

use crate::candidate_pipeline::CandidatePipeline;
use crate::components::cluster_filter::ClusterFilter;
use crate::components::digest_log_side_effect::DigestLogSideEffect;
use crate::components::funded_outlet_filter::FundedOutletFilter;
use crate::components::gap_scorer::GapScorer;
use crate::components::reconciliation_source::ReconciliationSource;
use crate::components::route_diversity_scorer::RouteDiversityScorer;
use crate::components::top_k_selector::TopKSelector;
use crate::components::urgency_hydrator::UrgencyHydrator;
use crate::components::window_query_hydrator::WindowQueryHydrator;
use crate::reconcile::ReconciledOutlet;
use crate::stage::{Filter, Hydrator, QueryHydrator, Scorer, Selector, SideEffect, Source};
use crate::types::{NetworkQuery, OutletCandidate};

/// The recharge digest pipeline.
///
/// Pipeline flow:
/// 1. WindowQueryHydrator fills in a default analysis window
/// 2. ReconciliationSource classifies every reconciled outlet
/// 3. UrgencyHydrator attaches presentation urgency
/// 4. ClusterFilter applies the query's site/route/sub-zone selection
/// 5. FundedOutletFilter drops outlets with nothing to recharge
/// 6. GapScorer assigns priority scores
/// 7. RouteDiversityScorer attenuates repeated routes
/// 8. TopKSelector picks the shortlist
/// 9. DigestLogSideEffect leaves the audit trail
pub struct RechargeDigestPipeline {
    query_hydrators: Vec<Box<dyn QueryHydrator<NetworkQuery>>>,
    sources: Vec<Box<dyn Source<NetworkQuery, OutletCandidate>>>,
    hydrators: Vec<Box<dyn Hydrator<NetworkQuery, OutletCandidate>>>,
    filters: Vec<Box<dyn Filter<NetworkQuery, OutletCandidate>>>,
    scorers: Vec<Box<dyn Scorer<NetworkQuery, OutletCandidate>>>,
    selector: TopKSelector,
    post_selection_hydrators: Vec<Box<dyn Hydrator<NetworkQuery, OutletCandidate>>>,
    post_selection_filters: Vec<Box<dyn Filter<NetworkQuery, OutletCandidate>>>,
    side_effects: Arc<Vec<Box<dyn SideEffect<NetworkQuery, OutletCandidate>>>>,
    result_size: usize,
}

impl RechargeDigestPipeline {
    /// Pipeline over reconciled outlets with the default shortlist size.
    pub fn with_network(outlets: Vec<ReconciledOutlet>) -> Self {
        Self::with_network_and_size(outlets, TopKSelector::default().k)
    }

    /// Pipeline over reconciled outlets with a custom shortlist size.
    pub fn with_network_and_size(outlets: Vec<ReconciledOutlet>, result_size: usize) -> Self {
        let query_hydrators: Vec<Box<dyn QueryHydrator<NetworkQuery>>> =
            vec![Box::new(WindowQueryHydrator)];

        let sources: Vec<Box<dyn Source<NetworkQuery, OutletCandidate>>> =
            vec![Box::new(ReconciliationSource::new(outlets))];

        let hydrators: Vec<Box<dyn Hydrator<NetworkQuery, OutletCandidate>>> =
            vec![Box::new(UrgencyHydrator)];

        let filters: Vec<Box<dyn Filter<NetworkQuery, OutletCandidate>>> = vec![
            Box::new(ClusterFilter),
            Box::new(FundedOutletFilter::default()),
        ];

        let scorers: Vec<Box<dyn Scorer<NetworkQuery, OutletCandidate>>> = vec![
            Box::new(GapScorer),
            Box::new(RouteDiversityScorer::default()),
        ];

        let selector = TopKSelector { k: result_size };

        let side_effects: Arc<Vec<Box<dyn SideEffect<NetworkQuery, OutletCandidate>>>> =
            Arc::new(vec![Box::new(DigestLogSideEffect)]);

        Self {
            query_hydrators,
            sources,
            hydrators,
            filters,
            scorers,
            selector,
            post_selection_hydrators: Vec::new(),
            post_selection_filters: Vec::new(),
            side_effects,
            result_size,
        }
    }
}

#[async_trait]
impl CandidatePipeline<NetworkQuery, OutletCandidate> for RechargeDigestPipeline {
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<NetworkQuery>>] {
        &self.query_hydrators
    }

    fn sources(&self) -> &[Box<dyn Source<NetworkQuery, OutletCandidate>>] {
        &self.sources
    }

    fn hydrators(&self) -> &[Box<dyn Hydrator<NetworkQuery, OutletCandidate>>] {
        &self.hydrators
    }

    fn filters(&self) -> &[Box<dyn Filter<NetworkQuery, OutletCandidate>>] {
        &self.filters
    }

    fn scorers(&self) -> &[Box<dyn Scorer<NetworkQuery, OutletCandidate>>] {
        &self.scorers
    }

    fn selector(&self) -> &dyn Selector<NetworkQuery, OutletCandidate> {
        &self.selector
    }

    fn post_selection_hydrators(&self) -> &[Box<dyn Hydrator<NetworkQuery, OutletCandidate>>] {
        &self.post_selection_hydrators
    }

    fn post_selection_filters(&self) -> &[Box<dyn Filter<NetworkQuery, OutletCandidate>>] {
        &self.post_selection_filters
    }

    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<NetworkQuery, OutletCandidate>>>> {
        Arc::clone(&self.side_effects)
    }

    fn result_size(&self) -> usize {
        self.result_size
    }
}
