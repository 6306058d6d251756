//! Manifest reconciliation and package status engine.
//!
//! Pure engine crate: consumes normalized manifest rows and store handles,
//! produces sync summaries and receipt transitions. No database or HTTP
//! dependencies — persistence and notification are ports implemented by
//! the caller.

pub mod dates;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod model;
pub mod receipt;
pub mod status;
pub mod store;

pub use engine::{sync, SyncOptions};
pub use error::EngineError;
pub use manifest::{load_manifest_file, load_manifest_rows, ManifestBatch};
pub use model::{
    HistoryEntry, ManifestRow, Package, PackageStatus, Source, SyncSummary, ACTION_RECEIVED,
    ACTION_REFUNDED, ACTION_RETURN_INITIATED,
};
pub use receipt::{check_history, log_receipt, AlertSink, ScanEvent};
pub use status::compute_status;
pub use store::{HistoryStore, MemoryStore, PackageStore, StoreError};
