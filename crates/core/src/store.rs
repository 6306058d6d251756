use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::model::{HistoryEntry, Package, PackageStatus, ACTION_RECEIVED};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error surfaced by a store implementation (lock timeout, constraint
/// violation, I/O). Opaque to the engine: a failed row is logged and
/// counted, then the run moves on.
#[derive(Debug)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.message)
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Persistent record store keyed by tracking number. Implementations must
/// enforce unique-key semantics on `tracking_number`; `upsert` never
/// duplicates.
pub trait PackageStore {
    fn find_by_tracking(&self, tracking: &str) -> Result<Option<Package>, StoreError>;
    fn upsert(&self, package: &Package) -> Result<(), StoreError>;
    fn delete(&self, tracking: &str) -> Result<(), StoreError>;
    fn list_by_status(&self, status: PackageStatus) -> Result<Vec<Package>, StoreError>;
}

/// Append-only audit trail.
pub trait HistoryStore {
    fn append(&self, entry: &HistoryEntry) -> Result<(), StoreError>;
    /// Has this tracking number ever been logged as received?
    fn exists_received(&self, tracking: &str) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// HashMap-backed store for engine tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    packages: Mutex<HashMap<String, Package>>,
    history: Mutex<Vec<HistoryEntry>>,
    // Tracking number whose writes fail, for error-path tests.
    poisoned: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.packages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.lock().unwrap().clone()
    }

    /// Make every write touching `tracking` fail, to exercise the
    /// row-abandoned-run-continues path.
    pub fn poison(&self, tracking: &str) {
        *self.poisoned.lock().unwrap() = Some(tracking.to_string());
    }

    fn check_poison(&self, tracking: &str) -> Result<(), StoreError> {
        if self
            .poisoned
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|t| t == tracking)
        {
            return Err(StoreError::new(format!("simulated failure for {tracking}")));
        }
        Ok(())
    }
}

impl PackageStore for MemoryStore {
    fn find_by_tracking(&self, tracking: &str) -> Result<Option<Package>, StoreError> {
        Ok(self.packages.lock().unwrap().get(tracking).cloned())
    }

    fn upsert(&self, package: &Package) -> Result<(), StoreError> {
        self.check_poison(&package.tracking_number)?;
        self.packages
            .lock()
            .unwrap()
            .insert(package.tracking_number.clone(), package.clone());
        Ok(())
    }

    fn delete(&self, tracking: &str) -> Result<(), StoreError> {
        self.check_poison(tracking)?;
        self.packages.lock().unwrap().remove(tracking);
        Ok(())
    }

    fn list_by_status(&self, status: PackageStatus) -> Result<Vec<Package>, StoreError> {
        let mut matched: Vec<Package> = self
            .packages
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.tracking_number.cmp(&b.tracking_number));
        Ok(matched)
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.history.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn exists_received(&self, tracking: &str) -> Result<bool, StoreError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.tracking_number == tracking && e.action == ACTION_RECEIVED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ManifestRow, Source};

    fn package(tracking: &str, status: PackageStatus) -> Package {
        let row = ManifestRow {
            tracking_number: tracking.into(),
            item_name: "Widget".into(),
            date: "2025-01-10".into(),
            quantity: 1,
            image_url: String::new(),
            asin: String::new(),
            source_url: String::new(),
        };
        Package::from_manifest(&row, status)
    }

    #[test]
    fn upsert_is_keyed_by_tracking() {
        let store = MemoryStore::new();
        store.upsert(&package("1Z1", PackageStatus::OnTime)).unwrap();
        store.upsert(&package("1Z1", PackageStatus::PastDue)).unwrap();
        assert_eq!(store.len(), 1);
        let found = store.find_by_tracking("1Z1").unwrap().unwrap();
        assert_eq!(found.status, PackageStatus::PastDue);
        assert_eq!(found.source, Source::Manifest);
    }

    #[test]
    fn list_by_status_filters() {
        let store = MemoryStore::new();
        store.upsert(&package("1Z1", PackageStatus::OnTime)).unwrap();
        store.upsert(&package("1Z2", PackageStatus::PastDue)).unwrap();
        store.upsert(&package("1Z3", PackageStatus::PastDue)).unwrap();
        let past_due = store.list_by_status(PackageStatus::PastDue).unwrap();
        assert_eq!(past_due.len(), 2);
        assert_eq!(past_due[0].tracking_number, "1Z2");
    }

    #[test]
    fn exists_received_checks_action() {
        let store = MemoryStore::new();
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        store
            .append(&HistoryEntry {
                tracking_number: "1Z1".into(),
                actor: Some("alice".into()),
                action: "return_initiated".into(),
                timestamp: ts,
                details: String::new(),
            })
            .unwrap();
        assert!(!store.exists_received("1Z1").unwrap());

        store
            .append(&HistoryEntry {
                tracking_number: "1Z1".into(),
                actor: Some("alice".into()),
                action: ACTION_RECEIVED.into(),
                timestamp: ts,
                details: "Qty: 1".into(),
            })
            .unwrap();
        assert!(store.exists_received("1Z1").unwrap());
    }
}
