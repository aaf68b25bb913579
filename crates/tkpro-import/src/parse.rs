//! Forgiving numeric parsing for spreadsheet cells.
//!
//! Merchant exports mix currency symbols, thousands separators and magnitude
//! shorthand (`"2.5k"`, `"3万"`, `"1.2m"`). Nothing here ever fails: input
//! that carries no recognizable number parses as `0.0`.

use std::sync::LazyLock;

use regex::Regex;
use tkpro_core::CellValue;

/// First decimal number in the cell. ASCII digits only.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid number regex"));

/// Finds the magnitude marker anywhere in `cleaned`, checking `k`, then
/// `w`/`万`, then `m`. At most one marker applies; its first occurrence is
/// removed from the returned text.
fn take_magnitude(cleaned: &str) -> (f64, String) {
    if cleaned.contains('k') {
        (1_000.0, cleaned.replacen('k', "", 1))
    } else if cleaned.contains('w') || cleaned.contains('万') {
        (10_000.0, cleaned.replacen('w', "", 1).replacen('万', "", 1))
    } else if cleaned.contains('m') {
        (1_000_000.0, cleaned.replacen('m', "", 1))
    } else {
        (1.0, cleaned.to_owned())
    }
}

/// Parses a raw cell string into a non-negative quantity.
///
/// Trims, lowercases and drops `,` thousands separators. A `k` (×1 000),
/// `w`/`万` (×10 000) or `m` (×1 000 000) anywhere in the cell scales the
/// first number found, with `k` taking precedence over `w`/`万` and both
/// over `m`.
#[must_use]
pub fn parse_numeric(raw: &str) -> f64 {
    let cleaned = raw.trim().to_lowercase().replace(',', "");
    let (multiplier, rest) = take_magnitude(&cleaned);
    let Some(found) = NUMBER_RE.find(&rest) else {
        return 0.0;
    };
    found
        .as_str()
        .parse::<f64>()
        .map_or(0.0, |value| value * multiplier)
}

/// Normalizes an optional spreadsheet cell into a non-negative quantity.
///
/// Missing and empty cells are `0.0`. Typed workbook numbers are used
/// directly (sign dropped, non-finite values become `0.0`); booleans carry
/// no quantity.
#[must_use]
pub fn normalize_numeric(value: Option<&CellValue>) -> f64 {
    match value {
        None | Some(CellValue::Empty | CellValue::Bool(_)) => 0.0,
        Some(CellValue::Number(n)) if n.is_finite() => n.abs(),
        Some(CellValue::Number(_)) => 0.0,
        Some(CellValue::Text(s)) => parse_numeric(s),
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
