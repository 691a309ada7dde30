use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};

use crate::stage::QueryHydrator;
use crate::types::{AnalysisWindow, NetworkQuery};

/// Fills an empty analysis window with the last 24 hours.
///
/// Digest requests rarely specify a window; the snapshots are whatever
/// the last sync produced, so "since yesterday" is the honest default.
pub struct WindowQueryHydrator;

#[async_trait]
impl QueryHydrator<NetworkQuery> for WindowQueryHydrator {
    async fn hydrate(&self, query: &NetworkQuery) -> Result<NetworkQuery, String> {
        if query.window.start.is_empty() || query.window.end.is_empty() {
            let end = Utc::now();
            let start = end - Duration::hours(24);
            Ok(NetworkQuery {
                window: AnalysisWindow {
                    start: start.to_rfc3339_opts(SecondsFormat::Secs, true),
                    end: end.to_rfc3339_opts(SecondsFormat::Secs, true),
                },
                ..query.clone()
            })
        } else {
            Ok(query.clone())
        }
    }

    fn update(&self, query: &mut NetworkQuery, hydrated: NetworkQuery) {
        query.window = hydrated.window;
    }
}
