//! `Results.csv` reader

use std::fs::File;
use std::path::Path;

use super::ExportEntry;
use crate::error::ExtractionError;

pub const NAME_COLUMN: &str = "Name [Unit]";
/// The console writes `Name [Unit], Value`; the leading space belongs to the header
pub const VALUE_COLUMN: &str = " Value";

/// Stream `(name, value)` rows to `sink`
///
/// Rows read before a malformed row stay delivered.
pub fn read_entries(
    path: &Path,
    sink: &mut dyn FnMut(ExportEntry),
) -> Result<(), ExtractionError> {
    let file = File::open(path).map_err(|e| ExtractionError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(file);

    let format_error = |reason: String| ExtractionError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let headers = reader
        .headers()
        .map_err(|e| format_error(format!("unreadable header: {}", e)))?
        .clone();

    let column = |wanted: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == wanted)
    };
    let (name_idx, value_idx) = match (column(NAME_COLUMN), column(VALUE_COLUMN)) {
        (Some(n), Some(v)) => (n, v),
        _ => {
            return Err(format_error(format!(
                "expected columns '{}' and '{}', found {:?}",
                NAME_COLUMN,
                VALUE_COLUMN,
                headers.iter().collect::<Vec<_>>()
            )))
        }
    };

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format_error(format!("row {}: {}", row + 2, e)))?;

        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }

        sink(ExportEntry {
            name: name.to_string(),
            value: record.get(value_idx).unwrap_or("").to_string(),
        });
    }

    Ok(())
}
