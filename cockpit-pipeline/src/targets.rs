//! Float-target table loader.
//!
//! The target file comes out of the distributor's planning tool and its
//! headers drift between exports (`Agent MSISDN` vs `AGENT_MSISDN`,
//! `Average of oos_target` vs a pre-renamed `target_amount`, ...). The
//! loader resolves headers through an alias table, then deduplicates
//! per agent: target amounts are averaged, cluster fields take the
//! first occurrence.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Header aliases, first match wins. The upstream names are kept as
/// emitted by the planning tool.
const MSISDN_ALIASES: &[&str] = &["Agent MSISDN", "AGENT_MSISDN", "msisdn"];
const TARGET_ALIASES: &[&str] = &["Average of oos_target", "Montants OOS", "target_amount"];
const SITE_ALIASES: &[&str] = &["ISL_Terr", "Site", "site"];
const SUB_ZONE_ALIASES: &[&str] = &["SITENAME", "Sous-Zone", "sub_zone"];
const ROUTE_ALIASES: &[&str] = &["Routes", "route"];
const SEGMENT_ALIASES: &[&str] = &["segment_group", "segment"];
const NAME_ALIASES: &[&str] = &["nom et prenoms", "Noms", "name"];

/// Placeholder for cluster fields the export did not carry.
pub const UNKNOWN_CLUSTER: &str = "unknown";

/// Float objective and cluster metadata for one agent.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatTarget {
    pub msisdn: String,
    /// Daily float objective, FCFA.
    pub target_amount: f64,
    pub site: String,
    pub sub_zone: String,
    pub route: String,
    pub segment: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum TargetLoadError {
    #[error("target file is missing a recognizable '{column}' column (headers: {found:?})")]
    MissingColumn {
        column: String,
        found: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Load and deduplicate float targets from a CSV reader.
pub fn load_targets<R: Read>(reader: R) -> Result<Vec<FloatTarget>, TargetLoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let msisdn_idx = resolve(&headers, MSISDN_ALIASES)
        .ok_or_else(|| missing("Agent MSISDN", &headers))?;
    let target_idx = resolve(&headers, TARGET_ALIASES)
        .ok_or_else(|| missing("Average of oos_target", &headers))?;
    let site_idx = resolve(&headers, SITE_ALIASES);
    let sub_zone_idx = resolve(&headers, SUB_ZONE_ALIASES);
    let route_idx = resolve(&headers, ROUTE_ALIASES);
    let segment_idx = resolve(&headers, SEGMENT_ALIASES);
    let name_idx = resolve(&headers, NAME_ALIASES);

    let mut raw: Vec<FloatTarget> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let msisdn = record.get(msisdn_idx).unwrap_or("").trim().to_string();
        if msisdn.is_empty() {
            continue;
        }
        // Planning exports put '-' or text in broken cells; coerce to 0
        // rather than reject the whole file.
        let target_amount = record
            .get(target_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        raw.push(FloatTarget {
            msisdn,
            target_amount,
            site: text_field(&record, site_idx),
            sub_zone: text_field(&record, sub_zone_idx),
            route: text_field(&record, route_idx),
            segment: optional_field(&record, segment_idx),
            name: optional_field(&record, name_idx),
        });
    }

    Ok(dedupe_targets(raw))
}

/// Load float targets from a CSV file path.
pub fn load_targets_file(path: &Path) -> Result<Vec<FloatTarget>, TargetLoadError> {
    let file = std::fs::File::open(path)?;
    load_targets(file)
}

/// Collapse duplicate agents: mean of the target amounts, first
/// occurrence of every categorical field. Output is MSISDN-ordered.
pub fn dedupe_targets(raw: Vec<FloatTarget>) -> Vec<FloatTarget> {
    let mut grouped: BTreeMap<String, (FloatTarget, f64, usize)> = BTreeMap::new();
    for target in raw {
        match grouped.get_mut(&target.msisdn) {
            Some((_, sum, count)) => {
                *sum += target.target_amount;
                *count += 1;
            }
            None => {
                let amount = target.target_amount;
                grouped.insert(target.msisdn.clone(), (target, amount, 1));
            }
        }
    }

    grouped
        .into_values()
        .map(|(mut first, sum, count)| {
            first.target_amount = sum / count as f64;
            first
        })
        .collect()
}

fn resolve(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == *alias))
}

fn missing(column: &str, headers: &csv::StringRecord) -> TargetLoadError {
    TargetLoadError::MissingColumn {
        column: column.to_string(),
        found: headers.iter().map(|h| h.to_string()).collect(),
    }
}

fn text_field(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string())
}

fn optional_field(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANNING_EXPORT: &str = "\
Agent MSISDN,Average of oos_target,ISL_Terr,SITENAME,Routes,segment_group,nom et prenoms
699000001,120000,Douala,Cité Sic,Rte_1,Gold,ETS KAMGA
699000002,80000,Douala,Ndogbong,Rte_2,Silver,MBOUNDJA SARL
699000003,50000,Yaounde,Mokolo,Rte_7,,
";

    #[test]
    fn loads_planning_export_headers() {
        let targets = load_targets(PLANNING_EXPORT.as_bytes()).unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].msisdn, "699000001");
        assert!((targets[0].target_amount - 120000.0).abs() < 0.01);
        assert_eq!(targets[0].site, "Douala");
        assert_eq!(targets[0].sub_zone, "Cité Sic");
        assert_eq!(targets[0].route, "Rte_1");
        assert_eq!(targets[0].name.as_deref(), Some("ETS KAMGA"));
        assert_eq!(targets[2].segment, None);
    }

    #[test]
    fn accepts_pre_renamed_headers() {
        let data = "\
msisdn,target_amount,site,sub_zone,route
699000009,45000,Douala,Akwa,Rte_3
";
        let targets = load_targets(data.as_bytes()).unwrap();
        assert_eq!(targets[0].msisdn, "699000009");
        assert!((targets[0].target_amount - 45000.0).abs() < 0.01);
    }

    #[test]
    fn missing_msisdn_column_is_an_error() {
        let data = "Average of oos_target,ISL_Terr\n1000,Douala\n";
        let err = load_targets(data.as_bytes()).unwrap_err();
        match err {
            TargetLoadError::MissingColumn { column, .. } => {
                assert_eq!(column, "Agent MSISDN")
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_agents_average_amounts_and_keep_first_cluster() {
        let data = "\
Agent MSISDN,Average of oos_target,ISL_Terr,Routes
699000001,100000,Douala,Rte_1
699000001,50000,Yaounde,Rte_9
699000002,80000,Douala,Rte_2
";
        let targets = load_targets(data.as_bytes()).unwrap();
        assert_eq!(targets.len(), 2);
        let first = &targets[0];
        assert_eq!(first.msisdn, "699000001");
        assert!((first.target_amount - 75000.0).abs() < 0.01);
        assert_eq!(first.site, "Douala");
        assert_eq!(first.route, "Rte_1");
    }

    #[test]
    fn broken_amount_cells_coerce_to_zero() {
        let data = "Agent MSISDN,Average of oos_target\n699000001,n/a\n";
        let targets = load_targets(data.as_bytes()).unwrap();
        assert_eq!(targets[0].target_amount, 0.0);
    }

    #[test]
    fn missing_cluster_columns_fall_back_to_unknown() {
        let data = "Agent MSISDN,Average of oos_target\n699000001,1000\n";
        let targets = load_targets(data.as_bytes()).unwrap();
        assert_eq!(targets[0].site, UNKNOWN_CLUSTER);
        assert_eq!(targets[0].sub_zone, UNKNOWN_CLUSTER);
        assert_eq!(targets[0].route, UNKNOWN_CLUSTER);
    }
}
