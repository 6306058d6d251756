//! Dashboard and analytics queries over the ledger.

use chrono::{Duration, NaiveDate};
use rusqlite::params;
use serde::Serialize;

use packdock_core::{PackageStatus, StoreError, ACTION_RECEIVED};

use crate::sqlite::SqliteStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Traffic-light color for a dashboard card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatBadge {
    Gold,
    Green,
    Red,
}

impl StatBadge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

/// Snapshot of the four dashboard cards.
///
/// "Expected" counts packages due today that are still open: unscanned, or
/// scanned today. A package scanned on an earlier day is done and drops off
/// the card even if the manifest still lists today's date.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub expected_total: usize,
    pub expected_scanned: usize,
    pub expected_badge: StatBadge,
    pub past_due: usize,
    pub past_due_badge: StatBadge,
    pub returns_open: usize,
    pub returns_badge: StatBadge,
    /// Refunds closed in the last 30 days.
    pub refunded_recent: usize,
    pub refunded_badge: StatBadge,
}

/// One day of scan activity. Days with no scans are present with zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: usize,
}

impl SqliteStore {
    pub fn dashboard_stats(&self, today: NaiveDate) -> Result<DashboardStats, StoreError> {
        let today_str = today.format(DATE_FORMAT).to_string();
        let thirty_days_ago = (today - Duration::days(30)).format(DATE_FORMAT).to_string();

        let mut expected_total = 0usize;
        let mut expected_scanned = 0usize;
        {
            let mut stmt = self
                .conn()
                .prepare("SELECT date_scanned FROM packages WHERE date_expected = ?1")
                .map_err(stats_err)?;
            let rows = stmt
                .query_map(params![today_str], |row| row.get::<_, Option<String>>(0))
                .map_err(stats_err)?;
            for scanned in rows {
                let scanned = scanned.map_err(stats_err)?;
                let scanned_today = scanned
                    .as_deref()
                    .is_some_and(|ts| ts.starts_with(&today_str));
                if scanned.is_none() || scanned_today {
                    expected_total += 1;
                    if scanned_today {
                        expected_scanned += 1;
                    }
                }
            }
        }

        let past_due = self
            .count_where(
                "status = ?1 AND date_scanned IS NULL",
                params![PackageStatus::PastDue.as_str()],
            )?;
        let returns_open = self.count_where(
            "status = ?1",
            params![PackageStatus::ReturnPending.as_str()],
        )?;
        let refunded_recent = self.count_where(
            "status = ?1 AND refund_date > ?2",
            params![PackageStatus::Refunded.as_str(), thirty_days_ago],
        )?;

        let expected_badge = if expected_total == 0 {
            StatBadge::Gold
        } else if expected_scanned == expected_total {
            StatBadge::Green
        } else {
            StatBadge::Red
        };

        Ok(DashboardStats {
            expected_total,
            expected_scanned,
            expected_badge,
            past_due,
            past_due_badge: badge_if_zero(past_due),
            returns_open,
            returns_badge: badge_if_zero(returns_open),
            refunded_recent,
            refunded_badge: StatBadge::Green,
        })
    }

    /// Received-scan counts per day for the trailing window, today inclusive.
    pub fn daily_scan_counts(
        &self,
        today: NaiveDate,
        days: usize,
    ) -> Result<Vec<DayCount>, StoreError> {
        let start = today - Duration::days(days.saturating_sub(1) as i64);
        let mut counts: Vec<DayCount> = (0..days)
            .map(|i| DayCount {
                day: (start + Duration::days(i as i64)).format(DATE_FORMAT).to_string(),
                count: 0,
            })
            .collect();

        let mut stmt = self
            .conn()
            .prepare(
                "SELECT date(timestamp) AS day, count(*) FROM history \
                 WHERE action = ?1 AND date(timestamp) >= ?2 GROUP BY day",
            )
            .map_err(stats_err)?;
        let rows = stmt
            .query_map(
                params![ACTION_RECEIVED, start.format(DATE_FORMAT).to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(stats_err)?;
        for row in rows {
            let (day, count) = row.map_err(stats_err)?;
            if let Some(slot) = counts.iter_mut().find(|c| c.day == day) {
                slot.count = count as usize;
            }
        }
        Ok(counts)
    }

    /// Total received scans in the trailing window, today inclusive.
    pub fn scan_count(&self, today: NaiveDate, days: usize) -> Result<usize, StoreError> {
        let start = (today - Duration::days(days.saturating_sub(1) as i64))
            .format(DATE_FORMAT)
            .to_string();
        self.conn()
            .query_row(
                "SELECT count(*) FROM history WHERE action = ?1 AND date(timestamp) >= ?2",
                params![ACTION_RECEIVED, start],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .map_err(stats_err)
    }

    fn count_where(
        &self,
        predicate: &str,
        params: impl rusqlite::Params,
    ) -> Result<usize, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT count(*) FROM packages WHERE {predicate}"),
                params,
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .map_err(stats_err)
    }
}

fn badge_if_zero(count: usize) -> StatBadge {
    if count > 0 {
        StatBadge::Red
    } else {
        StatBadge::Green
    }
}

fn stats_err(e: rusqlite::Error) -> StoreError {
    StoreError::new(e.to_string())
}
