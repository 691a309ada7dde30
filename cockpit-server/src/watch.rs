//! Continuous watch mode.
//!
//! Wires the sync engine to the domain: every export that lands in the
//! inbox updates the balance summary, and the reconciliation table is
//! rewritten immediately so whatever reads it always sees the network
//! as of the last file.

use std::path::Path;

use async_trait::async_trait;

use cockpit_ingest::{
    read_snapshot, FileProcessor, LogFlushHook, SummaryStore, SyncEngine,
};
use cockpit_pipeline::reconcile::{reconcile, write_reconciliation};
use cockpit_pipeline::targets::{load_targets_file, FloatTarget};

use crate::config::WatchSettings;

/// Processes one export end-to-end: snapshot → summary → reconciliation.
struct CockpitProcessor {
    summary: SummaryStore,
    targets: Vec<FloatTarget>,
    settings: WatchSettings,
}

#[async_trait]
impl FileProcessor for CockpitProcessor {
    async fn process(&mut self, path: &Path) -> Result<(), String> {
        let snapshot = read_snapshot(path).map_err(|e| e.to_string())?;
        let replaced = self.summary.upsert(snapshot);
        log::debug!(
            "summary now {} agents ({})",
            self.summary.len(),
            if replaced { "updated" } else { "new" }
        );

        self.summary
            .save(&self.settings.summary_file)
            .map_err(|e| e.to_string())?;

        let (outlets, _) = reconcile(&self.summary, &self.targets);
        write_reconciliation(&self.settings.reconciliation_file, &outlets)
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Run the watch loop until Ctrl-C.
pub async fn run_watch(settings: WatchSettings) -> Result<(), String> {
    let targets = load_targets_file(&settings.targets_file)
        .map_err(|e| format!("cannot load targets {}: {}", settings.targets_file.display(), e))?;
    log::info!(
        "loaded {} float targets from {}",
        targets.len(),
        settings.targets_file.display()
    );

    // Resume from the previous summary when one exists, so a restart
    // does not forget agents whose exports already arrived.
    let summary = if settings.summary_file.exists() {
        let loaded = SummaryStore::load(&settings.summary_file).map_err(|e| e.to_string())?;
        log::info!(
            "resuming summary with {} agents from {}",
            loaded.len(),
            settings.summary_file.display()
        );
        loaded
    } else {
        SummaryStore::new()
    };

    let mut processor = CockpitProcessor {
        summary,
        targets,
        settings: settings.clone(),
    };

    let mut engine = SyncEngine::new(settings.sync_config(), vec![Box::new(LogFlushHook)]);
    engine
        .run(&mut processor, async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutdown requested");
        })
        .await;

    log::info!("watch stopped after {} files", engine.processed_total());
    Ok(())
}
