//! Watch-mode configuration.
//!
//! Everything an operator tunes per deployment lives in one TOML file;
//! every field has a default so an empty file (or none at all) runs the
//! standard layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cockpit_ingest::SyncConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Directory upstream systems drop exports into.
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,

    /// Directory processed exports are moved to.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Balance summary CSV, rewritten after every export.
    #[serde(default = "default_summary_file")]
    pub summary_file: PathBuf,

    /// Float-target CSV from the planning tool.
    #[serde(default = "default_targets_file")]
    pub targets_file: PathBuf,

    /// Reconciliation CSV, rewritten after every export.
    #[serde(default = "default_reconciliation_file")]
    pub reconciliation_file: PathBuf,

    /// Files between batch flushes.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds of inbox silence before an idle flush.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Inbox poll cadence, milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from("inbox")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("summary.csv")
}

fn default_targets_file() -> PathBuf {
    PathBuf::from("targets.csv")
}

fn default_reconciliation_file() -> PathBuf {
    PathBuf::from("reconciliation.csv")
}

fn default_batch_size() -> usize {
    100
}

fn default_idle_timeout_secs() -> u64 {
    180
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            inbox_dir: default_inbox_dir(),
            data_dir: default_data_dir(),
            summary_file: default_summary_file(),
            targets_file: default_targets_file(),
            reconciliation_file: default_reconciliation_file(),
            batch_size: default_batch_size(),
            idle_timeout_secs: default_idle_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatchSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// The sync-engine slice of the settings.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            inbox_dir: self.inbox_dir.clone(),
            data_dir: self.data_dir.clone(),
            batch_size: self.batch_size,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
