/// Short type name for stage logging.
///
/// `"cockpit_pipeline::components::gap_scorer::GapScorer"` → `"GapScorer"`.
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}
