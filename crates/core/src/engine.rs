use chrono::{Duration, NaiveDate};

use crate::dates;
use crate::manifest::ManifestBatch;
use crate::model::{Package, PackageStatus, SyncSummary};
use crate::status::compute_status;
use crate::store::{PackageStore, StoreError};

/// Per-run sync policy, read by the caller from config at the start of
/// each run (a momentarily stale toggle is acceptable).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prune old, already-received, past-due records to bound storage.
    pub auto_trim: bool,
    /// Age beyond which a trim-eligible record is deleted.
    pub trim_after_days: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            auto_trim: false,
            trim_after_days: 60,
        }
    }
}

enum RowOutcome {
    Inserted,
    Updated,
    Trimmed,
    Unchanged,
}

/// Reconcile one manifest snapshot into the package store.
///
/// Row-at-a-time and best-effort: a store failure abandons that row and
/// the run continues; there is no rollback of earlier rows. Safe to call
/// redundantly — re-running with the same manifest and clock is a no-op
/// apart from the (monotonic, one-time) trim policy.
pub fn sync(
    store: &dyn PackageStore,
    batch: &ManifestBatch,
    today: NaiveDate,
    options: &SyncOptions,
) -> SyncSummary {
    let mut summary = SyncSummary {
        rows: batch.rows.len() + batch.skipped,
        skipped: batch.skipped,
        ..Default::default()
    };
    let trim_cutoff = today - Duration::days(options.trim_after_days);

    for row in &batch.rows {
        match sync_row(store, row, today, options, trim_cutoff) {
            Ok(RowOutcome::Inserted) => summary.inserted += 1,
            Ok(RowOutcome::Updated) => summary.updated += 1,
            Ok(RowOutcome::Trimmed) => summary.trimmed += 1,
            Ok(RowOutcome::Unchanged) => summary.unchanged += 1,
            Err(err) => {
                log::warn!("sync: row {} abandoned: {err}", row.tracking_number);
                summary.errors += 1;
            }
        }
    }

    summary
}

fn sync_row(
    store: &dyn PackageStore,
    row: &crate::model::ManifestRow,
    today: NaiveDate,
    options: &SyncOptions,
    trim_cutoff: NaiveDate,
) -> Result<RowOutcome, StoreError> {
    let existing = store.find_by_tracking(&row.tracking_number)?;

    let Some(mut pkg) = existing else {
        let status = compute_status(&row.date, today, None);
        let pkg = Package::from_manifest(row, status);
        store.upsert(&pkg)?;
        return Ok(RowOutcome::Inserted);
    };

    // Return/refund states are owned by explicit user actions; the
    // manifest has nothing to say about such a package any more.
    if pkg.status.is_terminal() {
        return Ok(RowOutcome::Unchanged);
    }

    // A human-corrected date always wins over the manifest's.
    let effective_date = pkg
        .manual_date
        .clone()
        .unwrap_or_else(|| row.date.clone());
    // Trim check precedes the scan-wins status override: an effective
    // date this stale is necessarily past due, and a record that was
    // also scanned has served its purpose.
    if options.auto_trim && pkg.date_scanned.is_some() {
        if let Some(date) = dates::parse_canonical(&effective_date) {
            if date < trim_cutoff {
                store.delete(&pkg.tracking_number)?;
                return Ok(RowOutcome::Trimmed);
            }
        }
    }

    let status = compute_status(&effective_date, today, Some(&pkg));

    // Refresh manifest-sourced fields; tracking number, scan stamp,
    // priority and history are untouched.
    pkg.item_name = row.item_name.clone();
    pkg.date_expected = effective_date;
    pkg.quantity = row.quantity;
    pkg.image_url = row.image_url.clone();
    pkg.status = status;
    pkg.asin = row.asin.clone();
    pkg.source_url = row.source_url.clone();
    store.upsert(&pkg)?;

    Ok(RowOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::load_manifest_rows;
    use crate::model::Source;
    use crate::store::MemoryStore;
    use chrono::NaiveDateTime;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn stamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    const MANIFEST: &str = "\
TrackingNumber,ItemName,Date,Quantity,Image,ASIN,SourceURL
1Z999,Widget,2025-01-10,2,,,
1Z998,Gadget,Pending,1,,,
";

    #[test]
    fn fresh_sync_inserts() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(MANIFEST).unwrap();
        let summary = sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.errors, 0);

        let widget = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(widget.status, PackageStatus::Expected);
        assert_eq!(widget.quantity, 2);
        assert_eq!(widget.source, Source::Manifest);

        let gadget = store.find_by_tracking("1Z998").unwrap().unwrap();
        assert_eq!(gadget.status, PackageStatus::OnTime);
        assert_eq!(gadget.date_expected, "Pending");
    }

    #[test]
    fn resync_after_date_passes_goes_past_due() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(MANIFEST).unwrap();
        sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());
        let summary = sync(&store, &batch, day("2025-02-01"), &SyncOptions::default());

        assert_eq!(summary.updated, 2);
        let widget = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(widget.status, PackageStatus::PastDue);
    }

    #[test]
    fn sync_is_idempotent_at_fixed_clock() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(MANIFEST).unwrap();
        let today = day("2025-01-10");
        sync(&store, &batch, today, &SyncOptions::default());

        let before: Vec<_> = ["1Z999", "1Z998"]
            .iter()
            .map(|t| store.find_by_tracking(t).unwrap().unwrap())
            .collect();

        let summary = sync(&store, &batch, today, &SyncOptions::default());
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.updated, 2);

        let after: Vec<_> = ["1Z999", "1Z998"]
            .iter()
            .map(|t| store.find_by_tracking(t).unwrap().unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn duplicate_rows_upsert_once() {
        let store = MemoryStore::new();
        let csv = "\
TrackingNumber,ItemName,Date,Quantity
1Z999,Widget,2025-01-10,1
1Z999,Widget Again,2025-01-11,3
";
        let batch = load_manifest_rows(csv).unwrap();
        sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());

        assert_eq!(store.len(), 1);
        // Last row wins on contended fields.
        let pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(pkg.item_name, "Widget Again");
        assert_eq!(pkg.quantity, 3);
    }

    #[test]
    fn manual_date_overrides_manifest() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(
            "TrackingNumber,ItemName,Date,Quantity\n1Z999,Widget,2025-01-01,1\n",
        )
        .unwrap();
        sync(&store, &batch, day("2025-01-01"), &SyncOptions::default());

        let mut pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        pkg.manual_date = Some("2025-03-01".to_string());
        store.upsert(&pkg).unwrap();

        let summary = sync(&store, &batch, day("2025-01-02"), &SyncOptions::default());
        assert_eq!(summary.updated, 1);

        let pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(pkg.date_expected, "2025-03-01");
        // Future manual date, so not past_due despite the manifest date.
        assert_eq!(pkg.status, PackageStatus::OnTime);
    }

    #[test]
    fn scanned_package_stays_received_across_syncs() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(MANIFEST).unwrap();
        sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());

        let mut pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        pkg.status = PackageStatus::Received;
        pkg.date_scanned = Some(stamp("2025-01-10 09:30:00"));
        store.upsert(&pkg).unwrap();

        sync(&store, &batch, day("2025-02-01"), &SyncOptions::default());
        let pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(pkg.status, PackageStatus::Received);
        assert_eq!(pkg.date_scanned, Some(stamp("2025-01-10 09:30:00")));
    }

    #[test]
    fn terminal_states_left_alone() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(MANIFEST).unwrap();
        sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());

        let mut pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        pkg.status = PackageStatus::Refunded;
        pkg.refund_date = Some(day("2025-01-15"));
        store.upsert(&pkg).unwrap();

        let summary = sync(&store, &batch, day("2025-02-01"), &SyncOptions::default());
        assert_eq!(summary.unchanged, 1);

        let pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        assert_eq!(pkg.status, PackageStatus::Refunded);
        // Fields are not refreshed either: the record is fully frozen.
        assert_eq!(pkg.refund_date, Some(day("2025-01-15")));
    }

    #[test]
    fn auto_trim_removes_old_received_past_due() {
        let store = MemoryStore::new();
        let batch = load_manifest_rows(
            "TrackingNumber,ItemName,Date,Quantity\n1Z999,Widget,2025-01-01,1\n",
        )
        .unwrap();
        sync(&store, &batch, day("2025-01-01"), &SyncOptions::default());

        let mut pkg = store.find_by_tracking("1Z999").unwrap().unwrap();
        pkg.date_scanned = Some(stamp("2025-01-01 09:00:00"));
        store.upsert(&pkg).unwrap();

        // 70 days later, with trim enabled: the record has served its
        // purpose and is pruned.
        let options = SyncOptions {
            auto_trim: true,
            ..Default::default()
        };
        let summary = sync(&store, &batch, day("2025-03-12"), &options);
        assert_eq!(summary.trimmed, 1);
        assert!(store.find_by_tracking("1Z999").unwrap().is_none());
    }

    #[test]
    fn trim_spares_unscanned_and_recent() {
        let store = MemoryStore::new();
        let csv = "\
TrackingNumber,ItemName,Date,Quantity
1ZOLD,Never Arrived,2025-01-01,1
1ZNEW,Recent,2025-03-01,1
";
        let batch = load_manifest_rows(csv).unwrap();
        sync(&store, &batch, day("2025-01-01"), &SyncOptions::default());

        let options = SyncOptions {
            auto_trim: true,
            ..Default::default()
        };
        let summary = sync(&store, &batch, day("2025-03-12"), &options);
        assert_eq!(summary.trimmed, 0);
        // Unscanned past_due stays visible no matter how old.
        assert!(store.find_by_tracking("1ZOLD").unwrap().is_some());
    }

    #[test]
    fn store_failure_abandons_row_and_continues() {
        let store = MemoryStore::new();
        let csv = "\
TrackingNumber,ItemName,Date,Quantity
1ZBAD,Broken,2025-01-10,1
1ZOK,Fine,2025-01-10,1
";
        let batch = load_manifest_rows(csv).unwrap();
        store.poison("1ZBAD");

        let summary = sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.inserted, 1);
        assert!(store.find_by_tracking("1ZOK").unwrap().is_some());
    }

    #[test]
    fn skipped_rows_counted_in_summary() {
        let store = MemoryStore::new();
        let csv = "\
TrackingNumber,ItemName,Date,Quantity
,No Tracking,2025-01-10,1
1ZOK,Fine,2025-01-10,1
";
        let batch = load_manifest_rows(csv).unwrap();
        let summary = sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.inserted, 1);
    }
}
