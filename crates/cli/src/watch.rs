// Watch mode: periodic manifest sync with change detection

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDate};

use packdock_config::CachedSettings;
use packdock_core::{load_manifest_file, sync, SyncOptions};
use packdock_store::SqliteStore;

use crate::exit_codes::EXIT_SYNC_STORE;
use crate::CliError;

/// Where the last sync left off. A pass is skipped when the manifest file
/// has not changed since the previous pass, unless the calendar day has
/// rolled over (statuses age against "today", so a quiet manifest still
/// needs one sync per day).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncCursor {
    manifest_mtime: Option<SystemTime>,
    last_sync_day: Option<NaiveDate>,
}

impl SyncCursor {
    pub fn should_sync(&self, mtime: SystemTime, today: NaiveDate) -> bool {
        self.manifest_mtime != Some(mtime) || self.last_sync_day != Some(today)
    }

    pub fn mark_synced(&mut self, mtime: SystemTime, today: NaiveDate) {
        self.manifest_mtime = Some(mtime);
        self.last_sync_day = Some(today);
    }
}

pub struct WatchOptions {
    pub manifest: PathBuf,
    pub db_path: PathBuf,
    pub settings: CachedSettings,
    /// Stop after this many sync passes. For tests and one-shot cron use.
    pub max_runs: Option<u64>,
}

/// Run the watch loop until `shutdown` is set or `max_runs` passes have
/// completed. Everything inside a pass is best-effort: a vanished
/// manifest or a locked database logs and waits for the next tick.
pub fn run(mut opts: WatchOptions, shutdown: Arc<AtomicBool>) -> Result<(), CliError> {
    let store = SqliteStore::open(&opts.db_path).map_err(|e| CliError {
        code: EXIT_SYNC_STORE,
        message: format!("cannot open ledger {}: {e}", opts.db_path.display()),
        hint: None,
    })?;

    let mut cursor = SyncCursor::default();
    let mut runs: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let pass_done = run_pass(&store, &opts.manifest, &mut opts.settings, &mut cursor);
        if pass_done {
            runs += 1;
            if opts.max_runs.is_some_and(|max| runs >= max) {
                break;
            }
        }

        let interval = Duration::from_secs(opts.settings.get().sync_interval_secs.max(1));
        sleep_interruptible(interval, &shutdown);
    }

    log::info!("watch loop stopped after {runs} sync passes");
    Ok(())
}

/// One tick. Returns true if a sync actually ran.
fn run_pass(
    store: &SqliteStore,
    manifest: &PathBuf,
    settings: &mut CachedSettings,
    cursor: &mut SyncCursor,
) -> bool {
    let mtime = match std::fs::metadata(manifest).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(e) => {
            log::warn!("manifest {} not readable: {e}", manifest.display());
            return false;
        }
    };
    let today = Local::now().date_naive();
    if !cursor.should_sync(mtime, today) {
        return false;
    }

    let batch = match load_manifest_file(manifest) {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("manifest load failed: {e}");
            return false;
        }
    };

    let current = settings.get();
    let options = SyncOptions {
        auto_trim: current.auto_trim,
        trim_after_days: current.trim_after_days,
    };
    let summary = sync(store, &batch, today, &options);
    log::info!(
        "sync: {} rows, {} inserted, {} updated, {} trimmed, {} errors",
        summary.rows,
        summary.inserted,
        summary.updated,
        summary.trimmed,
        summary.errors
    );
    cursor.mark_synced(mtime, today);
    true
}

fn sleep_interruptible(total: Duration, shutdown: &AtomicBool) {
    let slice = Duration::from_millis(250);
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}
