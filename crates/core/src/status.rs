use chrono::NaiveDate;

use crate::dates;
use crate::model::{Package, PackageStatus};

/// Derive a package's display status from its effective expected date.
///
/// Rules, in order:
/// 1. A scanned package transitioning through the receivable set stays
///    `received` — a scan always wins over a date-derived status.
/// 2. Terminal return/refund states are never overwritten here; they are
///    set exclusively by explicit user actions.
/// 3. `Pending` (or otherwise unparseable) effective dates leave an
///    existing record's status unchanged; new records default to
///    `on_time` since there is nothing to compare.
/// 4. Otherwise compare against `today`: equal → `expected`, before →
///    `past_due`, after → `on_time`.
pub fn compute_status(
    effective_date: &str,
    today: NaiveDate,
    existing: Option<&Package>,
) -> PackageStatus {
    if let Some(pkg) = existing {
        if pkg.status.is_terminal() {
            return pkg.status;
        }
        if pkg.date_scanned.is_some()
            && (pkg.status.is_receivable() || pkg.status == PackageStatus::Received)
        {
            return PackageStatus::Received;
        }
    }

    match dates::parse_canonical(effective_date) {
        Some(date) if date == today => PackageStatus::Expected,
        Some(date) if date < today => PackageStatus::PastDue,
        Some(_) => PackageStatus::OnTime,
        None => match existing {
            Some(pkg) => pkg.status,
            None => PackageStatus::OnTime,
        },
    }
}
