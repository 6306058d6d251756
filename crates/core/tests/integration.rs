use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use packdock_core::engine::{sync, SyncOptions};
use packdock_core::manifest::load_manifest_file;
use packdock_core::model::PackageStatus;
use packdock_core::receipt::{check_history, log_receipt, ScanEvent};
use packdock_core::store::{MemoryStore, PackageStore};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn stamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn full_manifest_lifecycle() {
    let store = MemoryStore::new();
    let batch = load_manifest_file(&fixtures_dir().join("manifest.csv")).unwrap();

    // Day one: everything lands fresh.
    let summary = sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());
    assert_eq!(summary.rows, 5);
    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);

    let dock = store
        .find_by_tracking("1Z999AA10123456784")
        .unwrap()
        .unwrap();
    assert_eq!(dock.status, PackageStatus::Expected);
    assert_eq!(dock.quantity, 2);
    assert_eq!(dock.asin, "B0DOCK123");

    // Unpadded US date and "1.0" quantity normalized on the way in.
    let rolls = store
        .find_by_tracking("1Z999AA10123456785")
        .unwrap()
        .unwrap();
    assert_eq!(rolls.date_expected, "2025-01-08");
    assert_eq!(rolls.status, PackageStatus::PastDue);
    assert_eq!(rolls.quantity, 1);
    assert_eq!(rolls.image_url, "");

    let printer = store
        .find_by_tracking("1Z999AA10123456786")
        .unwrap()
        .unwrap();
    assert_eq!(printer.status, PackageStatus::OnTime);
    assert_eq!(printer.date_expected, "Pending");

    let tape = store.find_by_tracking("9400111899560001").unwrap().unwrap();
    assert_eq!(tape.status, PackageStatus::OnTime);

    // The dock arrives and is scanned.
    assert!(!check_history(&store, "1Z999AA10123456784").unwrap());
    let scan = ScanEvent {
        tracking_number: "1Z999AA10123456784",
        item_name: "USB-C Dock",
        quantity: 2,
        actor: Some("alice"),
    };
    log_receipt(&store, &store, None, &scan, stamp("2025-01-10 11:02:33")).unwrap();
    assert!(check_history(&store, "1Z999AA10123456784").unwrap());

    // Weeks later the same manifest syncs again: the scanned dock stays
    // received, the unscanned rows age into past_due.
    let summary = sync(&store, &batch, day("2025-02-10"), &SyncOptions::default());
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 4);

    let dock = store
        .find_by_tracking("1Z999AA10123456784")
        .unwrap()
        .unwrap();
    assert_eq!(dock.status, PackageStatus::Received);
    assert_eq!(dock.date_scanned, Some(stamp("2025-01-10 11:02:33")));

    let tape = store.find_by_tracking("9400111899560001").unwrap().unwrap();
    assert_eq!(tape.status, PackageStatus::PastDue);

    // Far enough in the future with trim enabled, the received dock is
    // pruned while everything unscanned survives.
    let options = SyncOptions {
        auto_trim: true,
        ..Default::default()
    };
    let summary = sync(&store, &batch, day("2025-06-01"), &options);
    assert_eq!(summary.trimmed, 1);
    assert!(store
        .find_by_tracking("1Z999AA10123456784")
        .unwrap()
        .is_none());
    assert!(store
        .find_by_tracking("9400111899560001")
        .unwrap()
        .is_some());
}

#[test]
fn surprise_arrival_then_manifest_catchup() {
    let store = MemoryStore::new();

    // Scan before any manifest mentions the package.
    let scan = ScanEvent {
        tracking_number: "1ZLATE",
        item_name: "Late Addition",
        quantity: 1,
        actor: Some("bob"),
    };
    log_receipt(&store, &store, None, &scan, stamp("2025-01-09 16:45:00")).unwrap();

    // The manifest catches up the next day; the scan must survive.
    let batch = packdock_core::manifest::load_manifest_rows(
        "TrackingNumber,ItemName,Date,Quantity\n1ZLATE,Late Addition,2025-01-10,1\n",
    )
    .unwrap();
    sync(&store, &batch, day("2025-01-10"), &SyncOptions::default());

    let pkg = store.find_by_tracking("1ZLATE").unwrap().unwrap();
    assert_eq!(pkg.status, PackageStatus::Received);
    assert_eq!(pkg.date_scanned, Some(stamp("2025-01-09 16:45:00")));
    assert_eq!(pkg.date_expected, "2025-01-10");
}
