// SQLite-backed package ledger and history log

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use packdock_core::{
    HistoryEntry, HistoryStore, Package, PackageStatus, PackageStore, Source, StoreError,
    ACTION_REFUNDED, ACTION_RETURN_INITIATED,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_number TEXT UNIQUE NOT NULL,
    item_name TEXT,
    status TEXT DEFAULT 'pending',
    source TEXT DEFAULT 'manifest',
    date_expected TEXT,           -- canonical YYYY-MM-DD or 'Pending'
    manual_date TEXT,             -- human override, wins over date_expected
    date_scanned TEXT,            -- local timestamp, set once at first scan
    quantity INTEGER DEFAULT 1,
    priority INTEGER DEFAULT 0,
    image_url TEXT,
    asin TEXT,
    source_url TEXT,
    refund_date TEXT
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_number TEXT NOT NULL,
    actor TEXT,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    details TEXT
);

CREATE INDEX IF NOT EXISTS idx_tracking ON packages (tracking_number);
CREATE INDEX IF NOT EXISTS idx_status ON packages (status);
CREATE INDEX IF NOT EXISTS idx_date_expected ON packages (date_expected);
CREATE INDEX IF NOT EXISTS idx_history_tracking ON history (tracking_number);
CREATE INDEX IF NOT EXISTS idx_history_action ON history (action);
"#;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const PACKAGE_COLUMNS: &str = "tracking_number, item_name, status, source, date_expected, \
     manual_date, date_scanned, quantity, priority, image_url, asin, source_url, refund_date";

/// One SQLite connection wrapped behind the store ports. WAL mode plus a
/// 10s busy timeout, matching how the scan station and the sync loop share
/// the file without stepping on each other.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::prepare(conn)
    }

    /// Private in-memory database, for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(10)).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    // -----------------------------------------------------------------------
    // Return / refund transitions
    // -----------------------------------------------------------------------

    /// Flag a received package for return. Appends a `return_initiated`
    /// history entry alongside the status change.
    pub fn mark_return_pending(
        &self,
        tracking: &str,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let pkg = self
            .find_by_tracking(tracking)?
            .ok_or_else(|| StoreError::new(format!("no package with tracking {tracking}")))?;
        if pkg.status == PackageStatus::Returned || pkg.status == PackageStatus::Refunded {
            return Err(StoreError::new(format!(
                "package {tracking} is already {}",
                pkg.status
            )));
        }
        self.conn
            .execute(
                "UPDATE packages SET status = ?1 WHERE tracking_number = ?2",
                params![PackageStatus::ReturnPending.as_str(), tracking],
            )
            .map_err(db_err)?;
        self.append(&HistoryEntry {
            tracking_number: tracking.to_string(),
            actor: actor.map(str::to_string),
            action: ACTION_RETURN_INITIATED.to_string(),
            timestamp: now,
            details: String::new(),
        })
    }

    /// Close out a return as refunded and stamp the refund date.
    pub fn mark_refunded(
        &self,
        tracking: &str,
        actor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let pkg = self
            .find_by_tracking(tracking)?
            .ok_or_else(|| StoreError::new(format!("no package with tracking {tracking}")))?;
        if pkg.status == PackageStatus::Refunded {
            return Err(StoreError::new(format!("package {tracking} is already refunded")));
        }
        self.conn
            .execute(
                "UPDATE packages SET status = ?1, refund_date = ?2 WHERE tracking_number = ?3",
                params![
                    PackageStatus::Refunded.as_str(),
                    now.date().format(DATE_FORMAT).to_string(),
                    tracking
                ],
            )
            .map_err(db_err)?;
        self.append(&HistoryEntry {
            tracking_number: tracking.to_string(),
            actor: actor.map(str::to_string),
            action: ACTION_REFUNDED.to_string(),
            timestamp: now,
            details: String::new(),
        })
    }

    // -----------------------------------------------------------------------
    // History queries
    // -----------------------------------------------------------------------

    pub fn history_for(&self, tracking: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tracking_number, actor, action, timestamp, details FROM history \
                 WHERE tracking_number = ?1 ORDER BY timestamp DESC, id DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tracking], history_from_row)
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tracking_number, actor, action, timestamp, details FROM history \
                 ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], history_from_row)
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Admin bulk-clear. Returns the number of entries removed.
    pub fn clear_history(&self) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM history", [])
            .map_err(db_err)
    }

    pub fn count_packages(&self) -> Result<usize, StoreError> {
        self.conn
            .query_row("SELECT count(*) FROM packages", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(db_err)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl PackageStore for SqliteStore {
    fn find_by_tracking(&self, tracking: &str) -> Result<Option<Package>, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE tracking_number = ?1"),
                params![tracking],
                package_from_row,
            )
            .optional()
            .map_err(db_err)
    }

    fn upsert(&self, package: &Package) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO packages ({PACKAGE_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
                     ON CONFLICT(tracking_number) DO UPDATE SET \
                     item_name = excluded.item_name, status = excluded.status, \
                     source = excluded.source, date_expected = excluded.date_expected, \
                     manual_date = excluded.manual_date, date_scanned = excluded.date_scanned, \
                     quantity = excluded.quantity, priority = excluded.priority, \
                     image_url = excluded.image_url, asin = excluded.asin, \
                     source_url = excluded.source_url, refund_date = excluded.refund_date"
                ),
                params![
                    package.tracking_number,
                    package.item_name,
                    package.status.as_str(),
                    package.source.as_str(),
                    package.date_expected,
                    package.manual_date,
                    package
                        .date_scanned
                        .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
                    package.quantity,
                    package.priority as i64,
                    package.image_url,
                    package.asin,
                    package.source_url,
                    package.refund_date.map(|d| d.format(DATE_FORMAT).to_string()),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn delete(&self, tracking: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "DELETE FROM packages WHERE tracking_number = ?1",
                params![tracking],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list_by_status(&self, status: PackageStatus) -> Result<Vec<Package>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PACKAGE_COLUMNS} FROM packages WHERE status = ?1 ORDER BY tracking_number"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![status.as_str()], package_from_row)
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }
}

impl HistoryStore for SqliteStore {
    fn append(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO history (tracking_number, actor, action, timestamp, details) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.tracking_number,
                    entry.actor,
                    entry.action,
                    entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    entry.details,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn exists_received(&self, tracking: &str) -> Result<bool, StoreError> {
        self.conn
            .query_row(
                "SELECT count(*) FROM history WHERE tracking_number = ?1 AND action = ?2",
                params![tracking, packdock_core::ACTION_RECEIVED],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    let status_raw: String = row.get(2)?;
    let status = PackageStatus::parse(&status_raw)
        .ok_or_else(|| text_error(2, format!("unknown status '{status_raw}'")))?;
    let source_raw: String = row.get(3)?;
    let source = Source::parse(&source_raw)
        .ok_or_else(|| text_error(3, format!("unknown source '{source_raw}'")))?;
    let date_scanned: Option<String> = row.get(6)?;
    let date_scanned = date_scanned
        .map(|raw| {
            NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
                .map_err(|e| text_error(6, format!("bad timestamp '{raw}': {e}")))
        })
        .transpose()?;
    let refund_date: Option<String> = row.get(12)?;
    let refund_date = refund_date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| text_error(12, format!("bad refund date '{raw}': {e}")))
        })
        .transpose()?;

    Ok(Package {
        tracking_number: row.get(0)?,
        item_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        status,
        source,
        date_expected: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        manual_date: row.get(5)?,
        date_scanned,
        quantity: row.get::<_, Option<i64>>(7)?.unwrap_or(1).max(0) as u32,
        priority: row.get::<_, Option<i64>>(8)?.unwrap_or(0) != 0,
        image_url: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        asin: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        source_url: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        refund_date,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let raw: String = row.get(3)?;
    let timestamp = NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| text_error(3, format!("bad timestamp '{raw}': {e}")))?;
    Ok(HistoryEntry {
        tracking_number: row.get(0)?,
        actor: row.get(1)?,
        action: row.get(2)?,
        timestamp,
        details: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

fn text_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, message.into())
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::new(e.to_string())
}
