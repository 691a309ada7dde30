//! Continuous inbox watching.
//!
//! Upstream systems drop transaction exports into an inbox directory.
//! The sync engine polls it, moves each export into the data directory
//! (overwriting any previous export for the same agent), hands the file
//! to a processor, and fires flush hooks on batch boundaries, after an
//! idle period, and at shutdown.
//!
//! Polling rather than OS file-watching: exports land over network
//! shares where change notification is unreliable, and a one-second
//! poll is plenty for the volumes involved.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Why a flush was triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushReason {
    /// `batch_size` files processed since the last batch flush.
    Batch,
    /// No new files for `idle_timeout` with unflushed work pending.
    Idle,
    /// The engine is stopping.
    Shutdown,
}

/// Handles one export file after it has been moved into the data dir.
#[async_trait]
pub trait FileProcessor: Send {
    async fn process(&mut self, path: &Path) -> Result<(), String>;
}

/// Runs when the engine decides accumulated work should be published.
///
/// The original deployment pushed the refreshed files to a remote on
/// flush; the hook keeps that decision out of the engine.
#[async_trait]
pub trait FlushHook: Send + Sync {
    async fn flush(&self, reason: FlushReason, processed_total: usize) -> Result<(), String>;

    /// Stable name for logging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("flush_hook")
    }
}

/// Flush hook that only logs. The default in every deployment that has
/// no downstream publisher configured.
pub struct LogFlushHook;

#[async_trait]
impl FlushHook for LogFlushHook {
    async fn flush(&self, reason: FlushReason, processed_total: usize) -> Result<(), String> {
        log::info!(
            "flush ({:?}) after {} files processed",
            reason,
            processed_total
        );
        Ok(())
    }
}

/// Sync engine configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Directory upstream systems drop exports into.
    pub inbox_dir: PathBuf,
    /// Directory processed exports are moved to.
    pub data_dir: PathBuf,
    /// Files between batch flushes.
    pub batch_size: usize,
    /// Inactivity window before an idle flush.
    pub idle_timeout: Duration,
    /// Inbox poll cadence.
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from("inbox"),
            data_dir: PathBuf::from("data"),
            batch_size: 100,
            idle_timeout: Duration::from_secs(180),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Polling sync engine.
pub struct SyncEngine {
    config: SyncConfig,
    hooks: Vec<Box<dyn FlushHook>>,
    processed_total: usize,
    pending_flush: bool,
    last_activity: Instant,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, hooks: Vec<Box<dyn FlushHook>>) -> Self {
        Self {
            config,
            hooks,
            processed_total: 0,
            pending_flush: false,
            last_activity: Instant::now(),
        }
    }

    /// Total files processed since the engine started.
    pub fn processed_total(&self) -> usize {
        self.processed_total
    }

    /// Run until `shutdown` resolves, then perform a final flush if any
    /// work is unflushed.
    pub async fn run<P, S>(&mut self, processor: &mut P, shutdown: S)
    where
        P: FileProcessor,
        S: std::future::Future<Output = ()>,
    {
        if let Err(e) = std::fs::create_dir_all(&self.config.data_dir) {
            log::error!(
                "cannot create data dir {}: {}",
                self.config.data_dir.display(),
                e
            );
            return;
        }

        log::info!(
            "watching {} (batch {} files, idle flush {}s)",
            self.config.inbox_dir.display(),
            self.config.batch_size,
            self.config.idle_timeout.as_secs()
        );

        tokio::pin!(shutdown);
        loop {
            let moved = self.drain_inbox(processor).await;
            if moved == 0 {
                self.maybe_idle_flush().await;
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        if self.pending_flush {
            self.flush(FlushReason::Shutdown).await;
        }
    }

    /// One inbox pass: move every `*.csv` into the data dir and process
    /// it. Returns how many files were handled.
    ///
    /// Per-file failures are logged and skipped; a locked or half-written
    /// file will be picked up on a later pass once the writer releases it.
    pub async fn drain_inbox<P: FileProcessor>(&mut self, processor: &mut P) -> usize {
        let entries = match std::fs::read_dir(&self.config.inbox_dir) {
            Ok(entries) => entries,
            // Inbox not there yet — upstream mounts it late. Keep waiting.
            Err(_) => return 0,
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();

        let mut moved = 0;
        for source in files {
            let Some(filename) = source.file_name() else {
                continue;
            };
            let dest = self.config.data_dir.join(filename);

            if dest.exists() {
                if let Err(e) = std::fs::remove_file(&dest) {
                    log::warn!("cannot replace {}: {}; retrying next pass", dest.display(), e);
                    continue;
                }
            }
            if let Err(e) = move_file(&source, &dest) {
                log::warn!("cannot move {}: {}; retrying next pass", source.display(), e);
                continue;
            }

            self.processed_total += 1;
            self.pending_flush = true;
            self.last_activity = Instant::now();
            moved += 1;

            log::info!(
                "[{}] {} received",
                self.processed_total,
                filename.to_string_lossy()
            );
            if let Err(e) = processor.process(&dest).await {
                log::error!("processing {} failed: {}", dest.display(), e);
            }

            if self.processed_total % self.config.batch_size == 0 {
                self.flush(FlushReason::Batch).await;
            }
        }
        moved
    }

    /// Fire an idle flush when work is pending and the inbox has been
    /// quiet long enough.
    pub async fn maybe_idle_flush(&mut self) {
        if self.pending_flush && self.last_activity.elapsed() >= self.config.idle_timeout {
            self.flush(FlushReason::Idle).await;
        }
    }

    async fn flush(&mut self, reason: FlushReason) {
        for hook in &self.hooks {
            if let Err(e) = hook.flush(reason, self.processed_total).await {
                log::error!("flush hook {} failed: {}", hook.name(), e);
            }
        }
        self.pending_flush = false;
    }
}

/// Move with a copy+remove fallback for cross-device inboxes.
fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    match std::fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(source, dest)?;
            std::fs::remove_file(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingProcessor {
        seen: Vec<PathBuf>,
    }

    #[async_trait]
    impl FileProcessor for RecordingProcessor {
        async fn process(&mut self, path: &Path) -> Result<(), String> {
            self.seen.push(path.to_path_buf());
            Ok(())
        }
    }

    struct RecordingHook {
        events: Arc<Mutex<Vec<(FlushReason, usize)>>>,
    }

    #[async_trait]
    impl FlushHook for RecordingHook {
        async fn flush(&self, reason: FlushReason, processed_total: usize) -> Result<(), String> {
            self.events.lock().unwrap().push((reason, processed_total));
            Ok(())
        }
    }

    fn engine_with(
        inbox: &Path,
        data: &Path,
        batch_size: usize,
        idle: Duration,
    ) -> (SyncEngine, Arc<Mutex<Vec<(FlushReason, usize)>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let hook = RecordingHook {
            events: Arc::clone(&events),
        };
        let engine = SyncEngine::new(
            SyncConfig {
                inbox_dir: inbox.to_path_buf(),
                data_dir: data.to_path_buf(),
                batch_size,
                idle_timeout: idle,
                poll_interval: Duration::from_millis(10),
            },
            vec![Box::new(hook)],
        );
        (engine, events)
    }

    fn drop_export(inbox: &Path, msisdn: &str) {
        std::fs::write(
            inbox.join(format!("Transactions_{msisdn}.csv")),
            "Date,Balance\n2026-01-01,1000\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn drain_moves_and_processes_inbox_files() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        drop_export(&inbox, "699000001");
        drop_export(&inbox, "699000002");
        std::fs::write(inbox.join("notes.txt"), "ignore me").unwrap();

        let (mut engine, _) = engine_with(&inbox, &data, 100, Duration::from_secs(180));
        let mut processor = RecordingProcessor { seen: Vec::new() };
        let moved = engine.drain_inbox(&mut processor).await;

        assert_eq!(moved, 2);
        assert_eq!(processor.seen.len(), 2);
        assert!(data.join("Transactions_699000001.csv").exists());
        assert!(!inbox.join("Transactions_699000001.csv").exists());
        assert!(inbox.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn batch_flush_fires_every_batch_size_files() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        let (mut engine, events) = engine_with(&inbox, &data, 2, Duration::from_secs(180));
        let mut processor = RecordingProcessor { seen: Vec::new() };

        for i in 0..5 {
            drop_export(&inbox, &format!("69900000{i}"));
        }
        engine.drain_inbox(&mut processor).await;

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(FlushReason::Batch, 2), (FlushReason::Batch, 4)]
        );
    }

    #[tokio::test]
    async fn idle_flush_only_when_work_is_pending() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        let (mut engine, events) = engine_with(&inbox, &data, 100, Duration::from_millis(0));
        let mut processor = RecordingProcessor { seen: Vec::new() };

        // Nothing processed yet: no idle flush.
        engine.maybe_idle_flush().await;
        assert!(events.lock().unwrap().is_empty());

        drop_export(&inbox, "699000001");
        engine.drain_inbox(&mut processor).await;
        engine.maybe_idle_flush().await;
        assert_eq!(*events.lock().unwrap(), vec![(FlushReason::Idle, 1)]);

        // Flushed state is cleared; a second idle pass stays quiet.
        engine.maybe_idle_flush().await;
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overwrites_previous_export_for_same_agent() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(
            data.join("Transactions_699000001.csv"),
            "Date,Balance\n2025-12-31,999\n",
        )
        .unwrap();

        drop_export(&inbox, "699000001");
        let (mut engine, _) = engine_with(&inbox, &data, 100, Duration::from_secs(180));
        let mut processor = RecordingProcessor { seen: Vec::new() };
        engine.drain_inbox(&mut processor).await;

        let content =
            std::fs::read_to_string(data.join("Transactions_699000001.csv")).unwrap();
        assert!(content.contains("2026-01-01"));
    }
}
