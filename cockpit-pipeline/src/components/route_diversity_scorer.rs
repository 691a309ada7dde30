use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;

use crate::stage::Scorer;
use crate::types::{NetworkQuery, OutletCandidate};

/// Attenuates scores for repeated distribution routes so the digest
/// spreads across the network instead of listing one route's worth of
/// outlets.
///
/// Candidates are walked in current-score order; the n-th appearance of
/// a route is multiplied by `decay_factor^n`, floored so a route with
/// many genuine emergencies is dampened, never silenced.
pub struct RouteDiversityScorer {
    pub decay_factor: f64,
    pub floor: f64,
}

impl Default for RouteDiversityScorer {
    fn default() -> Self {
        Self {
            decay_factor: 0.7,
            floor: 0.1,
        }
    }
}

impl RouteDiversityScorer {
    fn multiplier(&self, position: usize) -> f64 {
        (1.0 - self.floor) * self.decay_factor.powf(position as f64) + self.floor
    }
}

#[async_trait]
impl Scorer<NetworkQuery, OutletCandidate> for RouteDiversityScorer {
    async fn score(
        &self,
        _query: &NetworkQuery,
        candidates: &[OutletCandidate],
    ) -> Result<Vec<OutletCandidate>, String> {
        let mut route_counts: HashMap<String, usize> = HashMap::new();
        let mut scored = vec![OutletCandidate::default(); candidates.len()];

        let mut ordered: Vec<(usize, &OutletCandidate)> = candidates.iter().enumerate().collect();
        ordered.sort_by(|(_, a), (_, b)| {
            let a_score = a.priority_score.unwrap_or(f64::NEG_INFINITY);
            let b_score = b.priority_score.unwrap_or(f64::NEG_INFINITY);
            b_score.partial_cmp(&a_score).unwrap_or(Ordering::Equal)
        });

        for (original_idx, candidate) in ordered {
            let entry = route_counts.entry(candidate.route.clone()).or_insert(0);
            let position = *entry;
            *entry += 1;

            let multiplier = self.multiplier(position);
            scored[original_idx] = OutletCandidate {
                priority_score: candidate.priority_score.map(|s| s * multiplier),
                ..OutletCandidate::default()
            };
        }

        Ok(scored)
    }

    fn update(&self, candidate: &mut OutletCandidate, scored: OutletCandidate) {
        candidate.priority_score = scored.priority_score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisWindow, ClusterSelection, UserRole};

    fn query() -> NetworkQuery {
        NetworkQuery {
            request_id: "t".into(),
            user_id: "u".into(),
            user_role: UserRole::Executive,
            clusters: ClusterSelection::default(),
            window: AnalysisWindow::default(),
        }
    }

    fn candidate(route: &str, score: f64) -> OutletCandidate {
        OutletCandidate {
            route: route.to_string(),
            priority_score: Some(score),
            ..OutletCandidate::default()
        }
    }

    #[tokio::test]
    async fn first_of_each_route_keeps_its_score() {
        let scorer = RouteDiversityScorer::default();
        let candidates = vec![candidate("Rte_1", 10.0), candidate("Rte_2", 8.0)];
        let scored = scorer.score(&query(), &candidates).await.unwrap();
        assert!((scored[0].priority_score.unwrap() - 10.0).abs() < 1e-9);
        assert!((scored[1].priority_score.unwrap() - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn repeated_route_is_attenuated() {
        let scorer = RouteDiversityScorer::default();
        let candidates = vec![
            candidate("Rte_1", 10.0),
            candidate("Rte_1", 9.0),
            candidate("Rte_2", 8.0),
        ];
        let scored = scorer.score(&query(), &candidates).await.unwrap();
        let first = scored[0].priority_score.unwrap();
        let second = scored[1].priority_score.unwrap();
        let other_route = scored[2].priority_score.unwrap();

        assert!(first > second, "repeat should attenuate: {first} vs {second}");
        assert!(
            other_route > second,
            "diverse route should beat attenuated repeat: {other_route} vs {second}"
        );
    }

    #[tokio::test]
    async fn floor_bounds_the_attenuation() {
        let scorer = RouteDiversityScorer::default();
        let candidates: Vec<_> = (0..20)
            .map(|i| candidate("Rte_1", 100.0 - i as f64))
            .collect();
        let scored = scorer.score(&query(), &candidates).await.unwrap();
        let last = scored[19].priority_score.unwrap();
        // Even deep in the tail the multiplier never drops below the floor.
        assert!(last >= (100.0 - 19.0) * scorer.floor - 1e-9);
    }
}
