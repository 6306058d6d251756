//! SQLite persistence for the package ledger and scan history.
//!
//! Wraps `rusqlite` behind the `PackageStore`/`HistoryStore` ports so the
//! engine stays storage-agnostic. One connection per `SqliteStore`; callers
//! that need concurrency open their own handle (WAL mode makes that cheap).

mod sqlite;
mod stats;

pub use sqlite::SqliteStore;
pub use stats::{DashboardStats, DayCount, StatBadge};
