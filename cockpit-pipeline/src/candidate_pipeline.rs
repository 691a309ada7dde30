//! The pipeline runner.
//!
//! A pipeline is a fixed wiring of stages; `execute` drives a query
//! through them in order. Stage failures degrade the run (logged, the
//! stage is skipped) instead of aborting it — a digest with one scorer
//! missing is still worth delivering to the operations team.

use std::sync::Arc;

use async_trait::async_trait;

use crate::stage::{
    Filter, Hydrator, QueryHydrator, Scorer, Selector, SideEffect, SideEffectInput, Source,
};

/// Queries carry a request id so every log line of a run can be tied
/// together.
pub trait HasRequestId {
    fn request_id(&self) -> &str;
}

/// Outcome of a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineResult<Q, C> {
    /// The query after hydration.
    pub query: Q,
    /// Everything the sources produced, before filtering.
    pub retrieved_candidates: Vec<C>,
    /// Candidates removed by filters.
    pub filtered_candidates: Vec<C>,
    /// The final ranked selection.
    pub selected_candidates: Vec<C>,
}

#[async_trait]
pub trait CandidatePipeline<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + HasRequestId + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<Q>>];
    fn sources(&self) -> &[Box<dyn Source<Q, C>>];
    fn hydrators(&self) -> &[Box<dyn Hydrator<Q, C>>];
    fn filters(&self) -> &[Box<dyn Filter<Q, C>>];
    fn scorers(&self) -> &[Box<dyn Scorer<Q, C>>];
    fn selector(&self) -> &dyn Selector<Q, C>;
    fn post_selection_hydrators(&self) -> &[Box<dyn Hydrator<Q, C>>];
    fn post_selection_filters(&self) -> &[Box<dyn Filter<Q, C>>];
    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<Q, C>>>>;
    fn result_size(&self) -> usize;

    async fn execute(&self, query: Q) -> PipelineResult<Q, C> {
        let mut query = query;

        // 1. Query hydration, sequential — later hydrators may depend on
        //    fields earlier ones filled in.
        for hydrator in self.query_hydrators() {
            if !hydrator.enable(&query) {
                continue;
            }
            match hydrator.hydrate(&query).await {
                Ok(hydrated) => hydrator.update(&mut query, hydrated),
                Err(e) => log::warn!(
                    "request_id={} query hydrator {} failed: {}",
                    query.request_id(),
                    hydrator.name(),
                    e
                ),
            }
        }

        // 2. Candidate sourcing.
        let mut retrieved: Vec<C> = Vec::new();
        for source in self.sources() {
            if !source.enable(&query) {
                continue;
            }
            match source.get_candidates(&query).await {
                Ok(candidates) => retrieved.extend(candidates),
                Err(e) => log::warn!(
                    "request_id={} source {} failed: {}",
                    query.request_id(),
                    source.name(),
                    e
                ),
            }
        }

        let mut candidates = retrieved.clone();

        // 3. Candidate hydration.
        apply_hydrators(&query, self.hydrators(), &mut candidates).await;

        // 4. Filtering.
        let mut filtered_out: Vec<C> = Vec::new();
        apply_filters(&query, self.filters(), &mut candidates, &mut filtered_out).await;

        // 5. Scoring.
        for scorer in self.scorers() {
            if !scorer.enable(&query) {
                continue;
            }
            match scorer.score(&query, &candidates).await {
                Ok(scored) if scored.len() == candidates.len() => {
                    for (candidate, scored) in candidates.iter_mut().zip(scored) {
                        scorer.update(candidate, scored);
                    }
                }
                Ok(scored) => log::warn!(
                    "request_id={} scorer {} returned {} results for {} candidates; skipped",
                    query.request_id(),
                    scorer.name(),
                    scored.len(),
                    candidates.len()
                ),
                Err(e) => log::warn!(
                    "request_id={} scorer {} failed: {}",
                    query.request_id(),
                    scorer.name(),
                    e
                ),
            }
        }

        // 6. Selection.
        let mut selected = if self.selector().enable(&query) {
            self.selector().select(&query, candidates)
        } else {
            candidates
        };
        selected.truncate(self.result_size());

        // 7. Post-selection stages.
        apply_hydrators(&query, self.post_selection_hydrators(), &mut selected).await;
        apply_filters(
            &query,
            self.post_selection_filters(),
            &mut selected,
            &mut filtered_out,
        )
        .await;

        // 8. Side effects — awaited so callers observe them, but failures
        //    never touch the result.
        let input = Arc::new(SideEffectInput {
            query: Arc::new(query.clone()),
            selected_candidates: selected.clone(),
        });
        for effect in self.side_effects().iter() {
            if !effect.enable(Arc::clone(&input.query)) {
                continue;
            }
            if let Err(e) = effect.run(Arc::clone(&input)).await {
                log::warn!(
                    "request_id={} side effect {} failed: {}",
                    query.request_id(),
                    effect.name(),
                    e
                );
            }
        }

        PipelineResult {
            query,
            retrieved_candidates: retrieved,
            filtered_candidates: filtered_out,
            selected_candidates: selected,
        }
    }
}

async fn apply_hydrators<Q, C>(query: &Q, hydrators: &[Box<dyn Hydrator<Q, C>>], candidates: &mut [C])
where
    Q: Clone + Send + Sync + HasRequestId + 'static,
    C: Clone + Send + Sync + 'static,
{
    for hydrator in hydrators {
        if !hydrator.enable(query) {
            continue;
        }
        match hydrator.hydrate(query, candidates).await {
            Ok(hydrated) if hydrated.len() == candidates.len() => {
                for (candidate, hydrated) in candidates.iter_mut().zip(hydrated) {
                    hydrator.update(candidate, hydrated);
                }
            }
            Ok(hydrated) => log::warn!(
                "request_id={} hydrator {} returned {} results for {} candidates; skipped",
                query.request_id(),
                hydrator.name(),
                hydrated.len(),
                candidates.len()
            ),
            Err(e) => log::warn!(
                "request_id={} hydrator {} failed: {}",
                query.request_id(),
                hydrator.name(),
                e
            ),
        }
    }
}

async fn apply_filters<Q, C>(
    query: &Q,
    filters: &[Box<dyn Filter<Q, C>>],
    candidates: &mut Vec<C>,
    filtered_out: &mut Vec<C>,
) where
    Q: Clone + Send + Sync + HasRequestId + 'static,
    C: Clone + Send + Sync + 'static,
{
    for filter in filters {
        if !filter.enable(query) {
            continue;
        }
        match filter.filter(query, candidates.clone()).await {
            Ok(result) => {
                *candidates = result.kept;
                filtered_out.extend(result.removed);
            }
            Err(e) => log::warn!(
                "request_id={} filter {} failed: {}",
                query.request_id(),
                filter.name(),
                e
            ),
        }
    }
}
