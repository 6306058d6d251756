use chrono::NaiveDateTime;

use crate::model::{HistoryEntry, Package, PackageStatus, ACTION_RECEIVED};
use crate::store::{HistoryStore, PackageStore, StoreError};

/// Outbound "priority item arrived" notification. Fire-and-forget:
/// implementations must not block the scan path; failures are logged by
/// the implementation, never surfaced to the scanner.
pub trait AlertSink {
    fn priority_alert(&self, package: &Package, quantity: u32, actor: Option<&str>);
}

/// One scan at the receiving station.
#[derive(Debug, Clone, Copy)]
pub struct ScanEvent<'a> {
    pub tracking_number: &'a str,
    pub item_name: &'a str,
    pub quantity: u32,
    /// Best-effort identity of whoever scanned; absent is tolerated.
    pub actor: Option<&'a str>,
}

/// Record a scan: transition the package to `received` (once) and append
/// an audit entry.
///
/// Re-scanning an already-received package is an intentional no-op on the
/// package — `date_scanned` is stamped exactly once — but the history
/// entry is still appended, so the audit trail keeps every attempt.
/// Callers wanting a "duplicate" message should consult
/// [`check_history`] first.
pub fn log_receipt(
    packages: &dyn PackageStore,
    history: &dyn HistoryStore,
    alerts: Option<&dyn AlertSink>,
    scan: &ScanEvent<'_>,
    now: NaiveDateTime,
) -> Result<Package, StoreError> {
    let pkg = match packages.find_by_tracking(scan.tracking_number)? {
        Some(mut pkg) => {
            let mut dirty = false;
            if pkg.status.is_receivable() {
                pkg.status = PackageStatus::Received;
                dirty = true;
            }
            if pkg.date_scanned.is_none() {
                pkg.date_scanned = Some(now);
                dirty = true;
            }
            if dirty {
                packages.upsert(&pkg)?;
            }
            pkg
        }
        None => {
            // Unexpected arrival: track it anyway.
            let pkg = Package::auto_created(
                scan.tracking_number,
                scan.item_name,
                scan.quantity,
                now,
            );
            packages.upsert(&pkg)?;
            pkg
        }
    };

    history.append(&HistoryEntry {
        tracking_number: pkg.tracking_number.clone(),
        actor: scan.actor.map(str::to_string),
        action: ACTION_RECEIVED.to_string(),
        timestamp: now,
        details: format!("Qty: {}", scan.quantity),
    })?;

    if pkg.priority {
        if let Some(sink) = alerts {
            sink.priority_alert(&pkg, scan.quantity, scan.actor);
        }
    }

    Ok(pkg)
}

/// True iff this tracking number has ever been logged as received.
/// Used by the UI layer to say "duplicate" instead of silently re-scanning.
pub fn check_history(
    history: &dyn HistoryStore,
    tracking: &str,
) -> Result<bool, StoreError> {
    history.exists_received(tracking)
}
