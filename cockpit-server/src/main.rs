//! Float Cockpit CLI.
//!
//! `cockpit digest`    — KPI digest + ranked recharge shortlist
//! `cockpit reconcile` — write the reconciliation table
//! `cockpit watch`     — continuous inbox ingestion

mod config;
mod watch;

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use cockpit_ingest::SummaryStore;
use cockpit_pipeline::candidate_pipeline::{CandidatePipeline, PipelineResult};
use cockpit_pipeline::outlet_classifier::{
    network_summary, NetworkPosture, NetworkSummary, CRITICAL_STOCKOUT_RATE,
    TARGET_COVERAGE_DAYS,
};
use cockpit_pipeline::pipelines::recharge_digest::RechargeDigestPipeline;
use cockpit_pipeline::reconcile::{reconcile, write_reconciliation, JoinStats};
use cockpit_pipeline::targets::load_targets_file;
use cockpit_pipeline::types::{
    AnalysisWindow, ClusterSelection, NetworkQuery, OutletCandidate, UserRole,
};

use config::WatchSettings;

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DigestJson {
    generated_at: String,
    site_filter: Option<String>,
    route_filter: Option<String>,
    sub_zone_filter: Option<String>,
    pipeline_ms: u128,
    kpis: NetworkSummary,
    interpretation: String,
    recharges: Vec<RechargeJson>,
    summary: RunSummaryJson,
}

#[derive(Serialize)]
struct RechargeJson {
    msisdn: String,
    name: String,
    site: String,
    route: String,
    sub_zone: String,
    balance: f64,
    target_amount: f64,
    days_of_stock: f64,
    status: String,
    gap: f64,
    priority_score: f64,
    urgency_score: f64,
    action: String,
}

#[derive(Serialize)]
struct RunSummaryJson {
    summary_rows: usize,
    targets_loaded: usize,
    outlets_reconciled: usize,
    balances_without_target: usize,
    targets_without_balance: usize,
    candidates_retrieved: usize,
    candidates_filtered_out: usize,
    candidates_selected: usize,
}

fn build_json(
    result: &PipelineResult<NetworkQuery, OutletCandidate>,
    kpis: NetworkSummary,
    stats: JoinStats,
    summary_rows: usize,
    targets_loaded: usize,
    pipeline_ms: u128,
) -> DigestJson {
    let interpretation = interpretation(&kpis);
    DigestJson {
        generated_at: Utc::now().to_rfc3339(),
        site_filter: result.query.clusters.site.clone(),
        route_filter: result.query.clusters.route.clone(),
        sub_zone_filter: result.query.clusters.sub_zone.clone(),
        pipeline_ms,
        kpis,
        interpretation,
        recharges: result
            .selected_candidates
            .iter()
            .map(|c| RechargeJson {
                msisdn: c.msisdn.clone(),
                name: c.name.clone(),
                site: c.site.clone(),
                route: c.route.clone(),
                sub_zone: c.sub_zone.clone(),
                balance: c.balance,
                target_amount: c.target_amount,
                days_of_stock: c.days_of_stock,
                status: c.status.to_string(),
                gap: c.gap,
                priority_score: c.priority_score.unwrap_or(0.0),
                urgency_score: c.urgency_score.unwrap_or(0.0),
                action: action_label(c),
            })
            .collect(),
        summary: RunSummaryJson {
            summary_rows,
            targets_loaded,
            outlets_reconciled: stats.matched,
            balances_without_target: stats.unmatched_balances,
            targets_without_balance: stats.unmatched_targets,
            candidates_retrieved: result.retrieved_candidates.len(),
            candidates_filtered_out: result.filtered_candidates.len(),
            candidates_selected: result.selected_candidates.len(),
        },
    }
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// Thousands separators, no decimals. FCFA has no cents.
fn format_thousands(amount: f64) -> String {
    let whole = amount.abs().round() as u64;
    let sign = if amount < 0.0 { "-" } else { "" };

    if whole < 1_000 {
        return format!("{}{}", sign, whole);
    }

    let s = whole.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    format!("{}{}", sign, result.chars().rev().collect::<String>())
}

/// Compact display for the KPI banner: millions as "12.5M".
fn format_fcfa(amount: f64) -> String {
    if amount.abs() >= 1_000_000.0 {
        format!("{:.1}M", amount / 1_000_000.0)
    } else {
        format_thousands(amount)
    }
}

fn action_label(candidate: &OutletCandidate) -> String {
    if candidate.gap > 0.0 {
        format!("RECHARGE {}", format_thousands(candidate.gap))
    } else {
        "OK".to_string()
    }
}

/// One-paragraph reading of the balance-vs-objective spread, mirroring
/// what the operations team used to eyeball on the scatter chart.
fn interpretation(kpis: &NetworkSummary) -> String {
    match kpis.posture {
        NetworkPosture::Understocked => format!(
            "Clear trend: network under-stocked. {:.1}% of outlets sit below their objective — prioritize a global recharge.",
            kpis.under_target_share
        ),
        NetworkPosture::Overstocked => format!(
            "Clear trend: over-stocking. {:.1}% of outlets hold more float than planned — dormant cash to recover.",
            100.0 - kpis.under_target_share
        ),
        NetworkPosture::Balanced => format!(
            "Split network: {:.1}% under / {:.1}% over objective. Target the extremes.",
            kpis.under_target_share,
            100.0 - kpis.under_target_share
        ),
    }
}

fn print_human(
    result: &PipelineResult<NetworkQuery, OutletCandidate>,
    kpis: &NetworkSummary,
    load_ms: u128,
    pipeline_ms: u128,
) {
    println!();
    println!("  \u{2554}{}\u{2557}", "\u{2550}".repeat(62));
    println!("  \u{2551}{:^62}\u{2551}", "FLOAT COCKPIT \u{2014} Network Stock Digest");
    println!("  \u{255a}{}\u{255d}", "\u{2550}".repeat(62));
    println!();

    println!(
        "  {} outlets reconciled  \u{00b7}  {} FCFA on hand  \u{00b7}  objective {} FCFA",
        kpis.outlets,
        format_fcfa(kpis.total_balance),
        format_fcfa(kpis.total_target),
    );
    println!(
        "  Coverage {:.1}d (target {:.1}d)  \u{00b7}  Dormant cash {} FCFA",
        kpis.coverage_days,
        TARGET_COVERAGE_DAYS,
        format_fcfa(kpis.dormant_cash),
    );
    println!(
        "  Park: {} stockout \u{00b7} {} tension \u{00b7} {} comfort \u{00b7} {} overstock",
        kpis.stockout_count, kpis.tension_count, kpis.comfort_count, kpis.overstock_count,
    );
    println!();

    if kpis.is_critical() {
        println!(
            "  \u{26a0}  CRITICAL: stockout rate {:.1}% (> {:.0}%). {} outlets dry \u{2014} immediate action required.",
            kpis.stockout_rate, CRITICAL_STOCKOUT_RATE, kpis.stockout_count,
        );
    } else {
        println!(
            "  \u{2713}  Performance: stockout rate under control at {:.1}%.",
            kpis.stockout_rate,
        );
    }
    println!();
    println!("  {}", interpretation(kpis));
    println!();

    if result.selected_candidates.is_empty() {
        println!("  No recharge needed. All outlets at objective.");
    } else {
        println!("  Top {} recharges:", result.selected_candidates.len());
        println!("  {:\u{2500}<72}", "");
        for (i, c) in result.selected_candidates.iter().enumerate() {
            let urgency = c.urgency_score.unwrap_or(0.0);
            let urgency_icon = match urgency {
                u if u >= 0.9 => "!!",
                u if u >= 0.7 => "! ",
                _ => "  ",
            };
            println!(
                "  {} {:2}. {:10} {:22} {:6} {:>5.1}d  {:>20}  score {:.1}",
                urgency_icon,
                i + 1,
                c.msisdn,
                truncate(&c.name, 22),
                c.route,
                c.days_of_stock,
                action_label(c),
                c.priority_score.unwrap_or(0.0),
            );
        }
        println!("  {:\u{2500}<72}", "");
    }

    println!();
    println!(
        "  \u{23f1}  Data loaded in {}ms \u{00b7} Pipeline ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        pipeline_ms,
        load_ms + pipeline_ms
    );
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", cut)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn usage() {
    eprintln!("Usage: cockpit <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  digest <summary.csv> <targets.csv> [--site S] [--route R] [--zone Z] [--top N] [--json]");
    eprintln!("  reconcile <summary.csv> <targets.csv> [--out reconciliation.csv]");
    eprintln!("  watch [--config cockpit.toml]");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  cockpit digest summary.csv targets.csv");
    eprintln!("  cockpit digest summary.csv targets.csv --zone \"Cit\u{e9} Sic\" --top 10 --json");
    eprintln!("  cockpit reconcile summary.csv targets.csv --out reconciliation.csv");
    eprintln!("  cockpit watch --config cockpit.toml");
}

/// Does a candidate fall inside the query's cluster selection?
fn in_scope(candidate: &OutletCandidate, selection: &ClusterSelection) -> bool {
    selection.site.as_ref().map_or(true, |s| candidate.site == *s)
        && selection.route.as_ref().map_or(true, |r| candidate.route == *r)
        && selection
            .sub_zone
            .as_ref()
            .map_or(true, |z| candidate.sub_zone == *z)
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> &'a str {
    if *i + 1 < args.len() {
        *i += 2;
        &args[*i - 1]
    } else {
        eprintln!("Error: {} requires a value", flag);
        process::exit(1);
    }
}

async fn run_digest(args: &[String]) {
    if args.len() < 2 {
        usage();
        process::exit(1);
    }
    let summary_path = PathBuf::from(&args[0]);
    let targets_path = PathBuf::from(&args[1]);

    let mut clusters = ClusterSelection::default();
    let mut top_k: usize = 15;
    let mut json_output = false;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--site" => clusters.site = Some(flag_value(args, &mut i, "--site").to_string()),
            "--route" => clusters.route = Some(flag_value(args, &mut i, "--route").to_string()),
            "--zone" => clusters.sub_zone = Some(flag_value(args, &mut i, "--zone").to_string()),
            "--top" => {
                top_k = flag_value(args, &mut i, "--top").parse().unwrap_or_else(|_| {
                    eprintln!("Error: --top requires a positive integer");
                    process::exit(1);
                });
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let load_start = Instant::now();
    let summary = match SummaryStore::load(&summary_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading summary {}: {}", summary_path.display(), e);
            process::exit(1);
        }
    };
    let targets = match load_targets_file(&targets_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading targets {}: {}", targets_path.display(), e);
            process::exit(1);
        }
    };
    let (outlets, stats) = reconcile(&summary, &targets);
    let load_ms = load_start.elapsed().as_millis();

    if outlets.is_empty() {
        eprintln!("Error: no outlet appears in both the summary and the targets");
        eprintln!("  summary rows: {}", summary.len());
        eprintln!("  target rows:  {}", targets.len());
        process::exit(1);
    }

    let pipeline_start = Instant::now();
    let pipeline = RechargeDigestPipeline::with_network_and_size(outlets, top_k);
    let query = NetworkQuery {
        request_id: "digest-001".into(),
        user_id: "ops_cli".into(),
        user_role: UserRole::Executive,
        clusters,
        window: AnalysisWindow::default(),
    };
    let result = pipeline.execute(query).await;
    let pipeline_ms = pipeline_start.elapsed().as_millis();

    // KPIs cover the selected cluster scope, like the dashboard's
    // filtered view, not just the ranked shortlist.
    let scoped: Vec<OutletCandidate> = result
        .retrieved_candidates
        .iter()
        .filter(|c| in_scope(c, &result.query.clusters))
        .cloned()
        .collect();
    if scoped.is_empty() {
        log::warn!("cluster selection matched no outlets");
    }
    let kpis = network_summary(&scoped);

    if json_output {
        let digest = build_json(
            &result,
            kpis,
            stats,
            summary.len(),
            targets.len(),
            pipeline_ms,
        );
        match serde_json::to_string_pretty(&digest) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing digest: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_human(&result, &kpis, load_ms, pipeline_ms);
    }
}

fn run_reconcile(args: &[String]) {
    if args.len() < 2 {
        usage();
        process::exit(1);
    }
    let summary_path = PathBuf::from(&args[0]);
    let targets_path = PathBuf::from(&args[1]);
    let mut out_path = PathBuf::from("reconciliation.csv");
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => out_path = PathBuf::from(flag_value(args, &mut i, "--out")),
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let summary = match SummaryStore::load(&summary_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading summary {}: {}", summary_path.display(), e);
            process::exit(1);
        }
    };
    let targets = match load_targets_file(&targets_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading targets {}: {}", targets_path.display(), e);
            process::exit(1);
        }
    };

    let (outlets, stats) = reconcile(&summary, &targets);
    if let Err(e) = write_reconciliation(&out_path, &outlets) {
        eprintln!("Error writing {}: {}", out_path.display(), e);
        process::exit(1);
    }
    println!(
        "{} outlets reconciled \u{2192} {} ({} balances without target, {} targets without balance)",
        stats.matched,
        out_path.display(),
        stats.unmatched_balances,
        stats.unmatched_targets
    );
}

async fn run_watch_cmd(args: &[String]) {
    let mut settings = WatchSettings::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let path = PathBuf::from(flag_value(args, &mut i, "--config"));
                settings = match WatchSettings::load(&path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                };
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    if let Err(e) = watch::run_watch(settings).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "digest" => run_digest(&args[2..]).await,
        "reconcile" => run_reconcile(&args[2..]),
        "watch" => run_watch_cmd(&args[2..]).await,
        "--help" | "-h" | "help" => usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            usage();
            process::exit(1);
        }
    }
}
