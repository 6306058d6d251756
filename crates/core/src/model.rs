use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dates;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized manifest row. Upstream column-mapping has already
/// reduced whatever the carrier export looked like to the canonical schema;
/// dates are canonical (`YYYY-MM-DD`) or the `Pending` sentinel.
#[derive(Debug, Clone)]
pub struct ManifestRow {
    pub tracking_number: String,
    pub item_name: String,
    pub date: String,
    pub quantity: u32,
    pub image_url: String,
    pub asin: String,
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// Status + provenance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    OnTime,
    Expected,
    PastDue,
    Received,
    ReturnPending,
    Returned,
    Refunded,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnTime => "on_time",
            Self::Expected => "expected",
            Self::PastDue => "past_due",
            Self::Received => "received",
            Self::ReturnPending => "return_pending",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "on_time" => Some(Self::OnTime),
            "expected" => Some(Self::Expected),
            "past_due" => Some(Self::PastDue),
            "received" => Some(Self::Received),
            "return_pending" => Some(Self::ReturnPending),
            "returned" => Some(Self::Returned),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// States a scan may transition to `received`.
    pub fn is_receivable(&self) -> bool {
        matches!(
            self,
            Self::Expected | Self::PastDue | Self::Pending | Self::OnTime
        )
    }

    /// States owned by explicit user actions (return/refund flow).
    /// A sync never moves a package out of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReturnPending | Self::Returned | Self::Refunded)
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a package record came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Manifest,
    Manual,
    Scan,
    #[serde(rename = "auto-email")]
    AutoEmail,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Manual => "manual",
            Self::Scan => "scan",
            Self::AutoEmail => "auto-email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manifest" => Some(Self::Manifest),
            "manual" => Some(Self::Manual),
            "scan" => Some(Self::Scan),
            "auto-email" => Some(Self::AutoEmail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Package ledger record
// ---------------------------------------------------------------------------

/// One row per unique tracking number — the system of record.
///
/// `date_expected` holds the canonical date string or `Pending`. Once a
/// human has set `manual_date`, the manifest's date is advisory only.
/// `image_url`/`asin`/`source_url` use the empty string for "absent"
/// (manifest exports routinely hand us blanks and `nan`s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub tracking_number: String,
    pub item_name: String,
    pub status: PackageStatus,
    pub source: Source,
    pub date_expected: String,
    pub manual_date: Option<String>,
    pub date_scanned: Option<NaiveDateTime>,
    pub quantity: u32,
    pub priority: bool,
    pub image_url: String,
    pub asin: String,
    pub source_url: String,
    pub refund_date: Option<NaiveDate>,
}

impl Package {
    /// A fresh record from a manifest row that had no prior entry.
    pub fn from_manifest(row: &ManifestRow, status: PackageStatus) -> Self {
        Self {
            tracking_number: row.tracking_number.clone(),
            item_name: row.item_name.clone(),
            status,
            source: Source::Manifest,
            date_expected: row.date.clone(),
            manual_date: None,
            date_scanned: None,
            quantity: row.quantity,
            priority: false,
            image_url: row.image_url.clone(),
            asin: row.asin.clone(),
            source_url: row.source_url.clone(),
            refund_date: None,
        }
    }

    /// Auto-created record for a scan with no manifest entry: the item
    /// arrived anyway, so it is tracked as received on the spot.
    pub fn auto_created(
        tracking_number: &str,
        item_name: &str,
        quantity: u32,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            tracking_number: tracking_number.to_string(),
            item_name: item_name.to_string(),
            status: PackageStatus::Received,
            source: Source::Scan,
            date_expected: now.date().format(dates::CANONICAL_FORMAT).to_string(),
            manual_date: None,
            date_scanned: Some(now),
            quantity,
            priority: false,
            image_url: String::new(),
            asin: String::new(),
            source_url: String::new(),
            refund_date: None,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

pub const ACTION_RECEIVED: &str = "received";
pub const ACTION_RETURN_INITIATED: &str = "return_initiated";
pub const ACTION_REFUNDED: &str = "refunded";

/// Append-only audit log entry. Never mutated; deleted only by explicit
/// admin bulk-clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tracking_number: String,
    pub actor: Option<String>,
    pub action: String,
    pub timestamp: NaiveDateTime,
    pub details: String,
}

// ---------------------------------------------------------------------------
// Sync output
// ---------------------------------------------------------------------------

/// Change summary for one sync run. Consumed for logging and monitoring,
/// never for control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Manifest rows seen, including skipped ones.
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub trimmed: usize,
    /// Rows with a blank tracking number.
    pub skipped: usize,
    /// Packages in a return/refund state, left untouched.
    pub unchanged: usize,
    /// Row-level store failures (that row abandoned, run continued).
    pub errors: usize,
}
