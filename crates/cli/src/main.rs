// packdock CLI - warehouse receiving ledger operations

mod exit_codes;
mod notify;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};

use packdock_config::{CachedSettings, Settings};
use packdock_core::{check_history, load_manifest_file, log_receipt, sync, AlertSink, ScanEvent, SyncOptions};
use packdock_store::SqliteStore;

use exit_codes::{
    EXIT_LEDGER_TRANSITION, EXIT_SCAN_DUPLICATE, EXIT_SCAN_STORE, EXIT_SUCCESS, EXIT_SYNC_MANIFEST,
    EXIT_SYNC_STORE, EXIT_USAGE,
};
use notify::WebhookSink;

#[derive(Parser)]
#[command(name = "packdock")]
#[command(about = "Warehouse package receiving: manifest sync, scans, returns")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Ledger database (defaults to DB_PATH from config.json)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a manifest CSV into the package ledger
    #[command(after_help = "\
Examples:
  packdock sync manifest.csv
  packdock sync manifest.csv --trim
  packdock sync --json")]
    Sync {
        /// Manifest CSV (defaults to MANIFEST_FILE from config.json)
        manifest: Option<PathBuf>,

        /// Trim stale already-received past-due records, regardless of
        /// the AUTO_TRIM config setting
        #[arg(long)]
        trim: bool,

        /// Print the change summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a package arriving at the dock
    #[command(after_help = "\
Examples:
  packdock scan 1Z999AA10123456784
  packdock scan 1Z999AA10123456784 --item 'Espresso Machine' --qty 2 --user dana")]
    Scan {
        tracking: String,

        /// Item description for packages with no manifest entry
        #[arg(long, default_value = "Unknown")]
        item: String,

        #[arg(long, default_value_t = 1)]
        qty: u32,

        /// Who scanned it
        #[arg(long)]
        user: Option<String>,

        /// Record the receipt even if this tracking number was already
        /// scanned before
        #[arg(long)]
        force: bool,
    },

    /// Sync on an interval, skipping passes when nothing changed
    #[command(after_help = "\
Examples:
  packdock watch manifest.csv
  packdock watch manifest.csv --max-runs 1")]
    Watch {
        manifest: Option<PathBuf>,

        /// Stop after this many sync passes
        #[arg(long)]
        max_runs: Option<u64>,
    },

    /// Dashboard cards and scan-volume analytics
    Stats {
        /// Trailing window for scan counts, in days
        #[arg(long, default_value_t = 14)]
        days: usize,

        #[arg(long)]
        json: bool,
    },

    /// Audit trail, newest first
    History {
        /// Limit to one tracking number
        tracking: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Delete the entire audit trail
        #[arg(long, conflicts_with_all = ["tracking", "limit"])]
        clear: bool,
    },

    /// Flag a package for return
    Return {
        tracking: String,

        #[arg(long)]
        user: Option<String>,
    },

    /// Close out a return as refunded
    Refund {
        tracking: String,

        #[arg(long)]
        user: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync { manifest, trim, json } => cmd_sync(cli.db, manifest, trim, json),
        Commands::Scan { tracking, item, qty, user, force } => {
            cmd_scan(cli.db, tracking, item, qty, user, force)
        }
        Commands::Watch { manifest, max_runs } => cmd_watch(cli.db, manifest, max_runs),
        Commands::Stats { days, json } => cmd_stats(cli.db, days, json),
        Commands::History { tracking, limit, clear } => cmd_history(cli.db, tracking, limit, clear),
        Commands::Return { tracking, user } => cmd_return(cli.db, tracking, user),
        Commands::Refund { tracking, user } => cmd_refund(cli.db, tracking, user),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SYNC_MANIFEST, message: msg.into(), hint: None }
    }

    pub fn store(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn resolve_db(db: Option<PathBuf>, settings: &Settings) -> PathBuf {
    db.unwrap_or_else(|| settings.database_path())
}

fn open_store(db: Option<PathBuf>, settings: &Settings, code: u8) -> Result<SqliteStore, CliError> {
    let path = resolve_db(db, settings);
    SqliteStore::open(&path)
        .map_err(|e| CliError::store(code, format!("cannot open ledger {}: {e}", path.display())))
}

fn resolve_manifest(arg: Option<PathBuf>, settings: &Settings) -> Result<PathBuf, CliError> {
    arg.or_else(|| settings.manifest_file.clone()).ok_or_else(|| {
        CliError::args("no manifest given")
            .with_hint("pass a path, or set MANIFEST_FILE in config.json")
    })
}

fn webhook_sink(settings: &Settings) -> Option<WebhookSink> {
    if !settings.webhook_enabled {
        return None;
    }
    let url = settings.webhook_url.clone()?;
    match WebhookSink::new(url) {
        Ok(sink) => Some(sink),
        Err(e) => {
            log::error!("webhook disabled: {e}");
            None
        }
    }
}

// ============================================================================
// sync
// ============================================================================

fn cmd_sync(
    db: Option<PathBuf>,
    manifest: Option<PathBuf>,
    trim: bool,
    json: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let manifest = resolve_manifest(manifest, &settings)?;
    let store = open_store(db, &settings, EXIT_SYNC_STORE)?;

    let batch = load_manifest_file(&manifest)
        .map_err(|e| CliError::manifest(format!("{}: {e}", manifest.display())))?;

    let options = SyncOptions {
        auto_trim: trim || settings.auto_trim,
        trim_after_days: settings.trim_after_days,
    };
    let summary = sync(&store, &batch, Local::now().date_naive(), &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary).expect("summary serializes"));
    } else {
        println!(
            "{} rows: {} inserted, {} updated, {} trimmed, {} skipped, {} unchanged, {} errors",
            summary.rows,
            summary.inserted,
            summary.updated,
            summary.trimmed,
            summary.skipped,
            summary.unchanged,
            summary.errors
        );
    }
    Ok(())
}

// ============================================================================
// scan
// ============================================================================

fn cmd_scan(
    db: Option<PathBuf>,
    tracking: String,
    item: String,
    qty: u32,
    user: Option<String>,
    force: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let store = open_store(db, &settings, EXIT_SCAN_STORE)?;

    if !force {
        let seen = check_history(&store, &tracking)
            .map_err(|e| CliError::store(EXIT_SCAN_STORE, e.to_string()))?;
        if seen {
            return Err(CliError::store(
                EXIT_SCAN_DUPLICATE,
                format!("{tracking} was already scanned"),
            )
            .with_hint("pass --force to record another receipt"));
        }
    }

    let sink = webhook_sink(&settings);
    let scan = ScanEvent {
        tracking_number: &tracking,
        item_name: &item,
        quantity: qty,
        actor: user.as_deref(),
    };
    let pkg = log_receipt(
        &store,
        &store,
        sink.as_ref().map(|s| s as &dyn AlertSink),
        &scan,
        Local::now().naive_local(),
    )
    .map_err(|e| CliError::store(EXIT_SCAN_STORE, e.to_string()))?;

    println!("received {} ({} x{})", pkg.tracking_number, pkg.item_name, qty);
    if pkg.priority {
        println!("priority item!");
    }
    Ok(())
}

// ============================================================================
// watch
// ============================================================================

fn cmd_watch(
    db: Option<PathBuf>,
    manifest: Option<PathBuf>,
    max_runs: Option<u64>,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let manifest = resolve_manifest(manifest, &settings)?;
    let db_path = resolve_db(db, &settings);

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| CliError::args(format!("cannot install signal handler: {e}")))?;

    watch::run(
        watch::WatchOptions {
            manifest,
            db_path,
            settings: CachedSettings::at_default_location(),
            max_runs,
        },
        shutdown,
    )
}

// ============================================================================
// stats
// ============================================================================

fn cmd_stats(db: Option<PathBuf>, days: usize, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let store = open_store(db, &settings, EXIT_SYNC_STORE)?;
    let today = Local::now().date_naive();

    let stats = store
        .dashboard_stats(today)
        .map_err(|e| CliError::store(EXIT_SYNC_STORE, e.to_string()))?;
    let daily = store
        .daily_scan_counts(today, days)
        .map_err(|e| CliError::store(EXIT_SYNC_STORE, e.to_string()))?;

    if json {
        let doc = serde_json::json!({ "stats": stats, "daily_scans": daily });
        println!("{}", serde_json::to_string_pretty(&doc).expect("stats serialize"));
        return Ok(());
    }

    println!(
        "expected today:  {}/{} scanned [{}]",
        stats.expected_scanned,
        stats.expected_total,
        stats.expected_badge.as_str()
    );
    println!("past due:        {} [{}]", stats.past_due, stats.past_due_badge.as_str());
    println!("open returns:    {} [{}]", stats.returns_open, stats.returns_badge.as_str());
    println!("refunds (30d):   {}", stats.refunded_recent);
    println!();
    println!("scans, last {days} days:");
    for day in &daily {
        println!("  {}  {}", day.day, day.count);
    }
    Ok(())
}

// ============================================================================
// history
// ============================================================================

fn cmd_history(
    db: Option<PathBuf>,
    tracking: Option<String>,
    limit: usize,
    clear: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let store = open_store(db, &settings, EXIT_SYNC_STORE)?;

    if clear {
        let removed = store
            .clear_history()
            .map_err(|e| CliError::store(EXIT_SYNC_STORE, e.to_string()))?;
        println!("cleared {removed} history entries");
        return Ok(());
    }

    let entries = match &tracking {
        Some(tracking) => store.history_for(tracking),
        None => store.recent_history(limit),
    }
    .map_err(|e| CliError::store(EXIT_SYNC_STORE, e.to_string()))?;

    if entries.is_empty() {
        println!("no history");
        return Ok(());
    }
    for entry in entries.iter().take(limit) {
        println!(
            "{}  {:<18} {}  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.tracking_number,
            entry.actor.as_deref().unwrap_or("-"),
            entry.details
        );
    }
    Ok(())
}

// ============================================================================
// return / refund
// ============================================================================

fn cmd_return(db: Option<PathBuf>, tracking: String, user: Option<String>) -> Result<(), CliError> {
    let settings = Settings::load();
    let store = open_store(db, &settings, EXIT_LEDGER_TRANSITION)?;
    store
        .mark_return_pending(&tracking, user.as_deref(), Local::now().naive_local())
        .map_err(|e| CliError::store(EXIT_LEDGER_TRANSITION, e.to_string()))?;
    println!("{tracking} flagged for return");
    Ok(())
}

fn cmd_refund(db: Option<PathBuf>, tracking: String, user: Option<String>) -> Result<(), CliError> {
    let settings = Settings::load();
    let store = open_store(db, &settings, EXIT_LEDGER_TRANSITION)?;
    store
        .mark_refunded(&tracking, user.as_deref(), Local::now().naive_local())
        .map_err(|e| CliError::store(EXIT_LEDGER_TRANSITION, e.to_string()))?;
    println!("{tracking} refunded");
    Ok(())
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}
