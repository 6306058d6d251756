use std::io;
use std::path::Path;

use crate::dates;
use crate::error::EngineError;
use crate::model::ManifestRow;

/// Canonical manifest column names. Column-mapping heuristics (matching
/// "Tracking #", "Carrier Tracking Number" and friends) live upstream;
/// by the time a manifest reaches this reader it carries these names.
const COL_TRACKING: &str = "TrackingNumber";
const COL_ITEM_NAME: &str = "ItemName";
const COL_DATE: &str = "Date";
const COL_QUANTITY: &str = "Quantity";
const COL_IMAGE: &str = "Image";
const COL_ASIN: &str = "ASIN";
const COL_SOURCE_URL: &str = "SourceURL";

/// One pass over a manifest source: normalized rows plus the count of
/// rows dropped for a blank tracking number.
#[derive(Debug)]
pub struct ManifestBatch {
    pub rows: Vec<ManifestRow>,
    pub skipped: usize,
}

/// Load and normalize manifest rows from CSV text.
///
/// Only `TrackingNumber` is a required column; everything else falls back
/// to a default per field. Rows without a tracking number are skipped and
/// counted, not errors.
pub fn load_manifest_rows(csv_data: &str) -> Result<ManifestBatch, EngineError> {
    // Exports written by Excel and friends often lead with a BOM.
    let csv_data = csv_data.strip_prefix('\u{feff}').unwrap_or(csv_data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| headers.iter().position(|h| h == name);

    let tracking_idx = idx(COL_TRACKING).ok_or_else(|| EngineError::MissingColumn {
        column: COL_TRACKING.to_string(),
    })?;
    let name_idx = idx(COL_ITEM_NAME);
    let date_idx = idx(COL_DATE);
    let quantity_idx = idx(COL_QUANTITY);
    let image_idx = idx(COL_IMAGE);
    let asin_idx = idx(COL_ASIN);
    let source_url_idx = idx(COL_SOURCE_URL);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Csv(e.to_string()))?;
        let field = |idx: Option<usize>| -> &str {
            idx.and_then(|i| record.get(i)).unwrap_or("").trim()
        };

        let tracking = record.get(tracking_idx).unwrap_or("").trim();
        if tracking.is_empty() {
            skipped += 1;
            continue;
        }

        let item_name = {
            let name = field(name_idx);
            if name.is_empty() { "Unknown" } else { name }
        };

        rows.push(ManifestRow {
            tracking_number: tracking.to_string(),
            item_name: item_name.to_string(),
            date: dates::normalize_date(field(date_idx)),
            quantity: parse_quantity(field(quantity_idx)),
            image_url: scrub_nan(field(image_idx)),
            asin: scrub_nan(field(asin_idx)),
            source_url: scrub_nan(field(source_url_idx)),
        });
    }

    Ok(ManifestBatch { rows, skipped })
}

/// Load a manifest CSV from disk. A missing or unreadable file surfaces
/// as [`EngineError::Io`]; the caller treats that run as a no-op.
pub fn load_manifest_file(path: &Path) -> Result<ManifestBatch, EngineError> {
    let data = std::fs::read_to_string(path).map_err(|e: io::Error| {
        EngineError::Io(format!("cannot read {}: {e}", path.display()))
    })?;
    load_manifest_rows(&data)
}

/// Float-then-int coercion: spreadsheet exports hand us `"1.0"` for 1.
/// Anything unparseable (or non-positive) defaults to 1.
fn parse_quantity(value: &str) -> u32 {
    if value.is_empty() {
        return 1;
    }
    match value.parse::<f64>() {
        Ok(q) if q >= 1.0 => q as u32,
        _ => 1,
    }
}

/// Spreadsheet exports serialize missing cells as the string `nan`.
fn scrub_nan(value: &str) -> String {
    if value.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        value.to_string()
    }
}
