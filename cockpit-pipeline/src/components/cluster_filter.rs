use async_trait::async_trait;

use crate::stage::{Filter, FilterResult};
use crate::types::{NetworkQuery, OutletCandidate};

/// Applies the query's cluster selection: site, then distribution
/// route, then sub-zone. Every field that is set must match.
pub struct ClusterFilter;

#[async_trait]
impl Filter<NetworkQuery, OutletCandidate> for ClusterFilter {
    fn enable(&self, query: &NetworkQuery) -> bool {
        !query.clusters.is_empty()
    }

    async fn filter(
        &self,
        query: &NetworkQuery,
        candidates: Vec<OutletCandidate>,
    ) -> Result<FilterResult<OutletCandidate>, String> {
        let selection = &query.clusters;
        let (kept, removed): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
            selection.site.as_ref().map_or(true, |s| c.site == *s)
                && selection.route.as_ref().map_or(true, |r| c.route == *r)
                && selection.sub_zone.as_ref().map_or(true, |z| c.sub_zone == *z)
        });

        Ok(FilterResult { kept, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisWindow, ClusterSelection, UserRole};

    fn candidate(site: &str, route: &str, sub_zone: &str) -> OutletCandidate {
        OutletCandidate {
            site: site.to_string(),
            route: route.to_string(),
            sub_zone: sub_zone.to_string(),
            ..OutletCandidate::default()
        }
    }

    fn query(clusters: ClusterSelection) -> NetworkQuery {
        NetworkQuery {
            request_id: "t".into(),
            user_id: "u".into(),
            user_role: UserRole::Executive,
            clusters,
            window: AnalysisWindow::default(),
        }
    }

    #[tokio::test]
    async fn filters_by_sub_zone() {
        let filter = ClusterFilter;
        let candidates = vec![
            candidate("Douala", "Rte_1", "Cité Sic"),
            candidate("Douala", "Rte_1", "Ndogbong"),
            candidate("Douala", "Rte_2", "Cité Sic"),
        ];
        let q = query(ClusterSelection {
            sub_zone: Some("Cité Sic".into()),
            ..ClusterSelection::default()
        });
        let result = filter.filter(&q, candidates).await.unwrap();
        assert_eq!(result.kept.len(), 2);
        assert_eq!(result.removed.len(), 1);
        assert!(result.kept.iter().all(|c| c.sub_zone == "Cité Sic"));
    }

    #[tokio::test]
    async fn cascading_selection_intersects() {
        let filter = ClusterFilter;
        let candidates = vec![
            candidate("Douala", "Rte_1", "Cité Sic"),
            candidate("Douala", "Rte_2", "Cité Sic"),
            candidate("Yaounde", "Rte_1", "Mokolo"),
        ];
        let q = query(ClusterSelection {
            site: Some("Douala".into()),
            route: Some("Rte_1".into()),
            sub_zone: None,
        });
        let result = filter.filter(&q, candidates).await.unwrap();
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].route, "Rte_1");
        assert_eq!(result.kept[0].site, "Douala");
    }

    #[test]
    fn disabled_without_selection() {
        let filter = ClusterFilter;
        assert!(!filter.enable(&query(ClusterSelection::default())));
    }
}
