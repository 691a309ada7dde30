//! Float Cockpit ingestion layer.
//!
//! Agent wallets export one CSV per agent (`Transactions_<msisdn>.csv`).
//! This crate turns those exports into balance snapshots, maintains the
//! network-wide balance summary, and drives the continuous inbox watch
//! loop that feeds the reconciliation pipeline.

pub mod snapshot;
pub mod summary;
pub mod sync;

pub use snapshot::{msisdn_from_filename, read_snapshot, snapshot_from_bytes, BalanceSnapshot};
pub use snapshot::IngestError;
pub use summary::SummaryStore;
pub use sync::{FileProcessor, FlushHook, FlushReason, LogFlushHook, SyncConfig, SyncEngine};
