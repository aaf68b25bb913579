//! CSV and workbook readers producing a header row plus keyed records.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tkpro_core::{CellValue, RawRecord};

use crate::error::ImportError;

/// Rows of one import, keyed by header name, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads an export from disk. `.csv` files go through the CSV reader,
/// everything else through the workbook reader (first sheet only).
///
/// # Errors
///
/// Returns [`ImportError::Io`] if the file cannot be read,
/// [`ImportError::Csv`] / [`ImportError::Workbook`] on malformed input and
/// [`ImportError::NoWorksheet`] for a workbook without sheets.
pub fn read_path(path: &Path) -> Result<RawTable, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        read_csv_str(&String::from_utf8_lossy(&bytes))
    } else {
        read_workbook(path)
    }
}

/// Parses comma-delimited text with a required header row.
///
/// Fields are trimmed and unquoted. Rows whose field count differs from the
/// header's are dropped rather than guessed at.
///
/// # Errors
///
/// Returns [`ImportError::Csv`] if the text is not valid CSV.
pub fn read_csv_str(content: &str) -> Result<RawTable, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if idx == 0 {
                h.trim_start_matches('\u{feff}').to_owned()
            } else {
                h.to_owned()
            }
        })
        .collect();

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            dropped += 1;
            continue;
        }
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), CellValue::Text(v.to_owned())))
            .collect();
        rows.push(row);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "dropped CSV rows with mismatched field count");
    }

    Ok(RawTable { headers, rows })
}

fn read_workbook(path: &Path) -> Result<RawTable, ImportError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::NoWorksheet(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok(RawTable::default());
    };
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = cell.to_string().trim().to_owned();
            if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name
            }
        })
        .collect();

    let rows = rows_iter
        .filter_map(|cells| {
            let row: RawRecord = headers
                .iter()
                .zip(cells)
                .map(|(h, cell)| (h.clone(), cell_value(cell)))
                .filter(|(_, v)| !v.is_blank())
                .collect();
            (!row.is_empty()).then_some(row)
        })
        .collect();

    tracing::debug!(sheet = %sheet_name, "read first worksheet");
    Ok(RawTable { headers, rows })
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Bool(b) => CellValue::Bool(*b),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.trim().to_owned()),
        other => CellValue::Text(other.to_string()),
    }
}
