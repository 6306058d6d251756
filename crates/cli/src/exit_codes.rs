//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; cron wrappers rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | sync             | Manifest sync codes                      |
//! | 10-19   | scan             | Receipt scanning codes                   |
//! | 20-29   | ledger           | Return/refund and lookup codes           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Sync (3-9)
// =============================================================================

/// Manifest file missing, unreadable, or structurally invalid
/// (no TrackingNumber column, malformed CSV).
pub const EXIT_SYNC_MANIFEST: u8 = 3;

/// Ledger database could not be opened or prepared.
pub const EXIT_SYNC_STORE: u8 = 4;

// =============================================================================
// Scan (10-19)
// =============================================================================

/// Store failure while recording a receipt.
pub const EXIT_SCAN_STORE: u8 = 10;

/// Tracking number was already logged as received (pass --force to
/// record another receipt anyway).
pub const EXIT_SCAN_DUPLICATE: u8 = 11;

// =============================================================================
// Ledger (20-29)
// =============================================================================

/// Tracking number not found, or the transition was rejected
/// (refunding an already-refunded package).
pub const EXIT_LEDGER_TRANSITION: u8 = 20;
