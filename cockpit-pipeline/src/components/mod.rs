pub mod cluster_filter;
pub mod digest_log_side_effect;
pub mod funded_outlet_filter;
pub mod gap_scorer;
pub mod reconciliation_source;
pub mod route_diversity_scorer;
pub mod top_k_selector;
pub mod urgency_hydrator;
pub mod window_query_hydrator;
