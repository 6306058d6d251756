use chrono::NaiveDate;

/// Sentinel for "no usable date". Stored and displayed verbatim.
pub const PENDING: &str = "Pending";

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Formats tried in order; first successful parse wins. chrono's numeric
/// specifiers accept unpadded fields, so `1/5/2025` parses under `%m/%d/%Y`.
const INPUT_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Normalize an arbitrary date string to `YYYY-MM-DD` or [`PENDING`].
///
/// Never fails: a malformed date must not block the rest of its manifest
/// row from importing, so unparseable input falls back to `Pending`.
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return PENDING.to_string();
    }
    let lower = trimmed.to_ascii_lowercase();
    if matches!(lower.as_str(), "pending" | "nan" | "none") {
        return PENDING.to_string();
    }

    for fmt in INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format(CANONICAL_FORMAT).to_string();
        }
    }

    PENDING.to_string()
}

/// Parse an already-normalized date. `Pending` (and anything else that is
/// not canonical) yields `None`.
pub fn parse_canonical(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, CANONICAL_FORMAT).ok()
}
