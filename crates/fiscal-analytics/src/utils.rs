//! Shared utilities for the analytics pipeline.
//!
//! This module contains helpers used across the cleaner, the profiler and
//! the analysis engines: dtype checks, lenient string parsing, column
//! extraction and the basic sample statistics every engine agrees on.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// The canonical instant type temporal columns are coerced to.
pub fn canonical_datetime() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Spreadsheet spellings of an absent value.
pub const MISSING_MARKERS: [&str; 7] = ["na", "n/a", "#n/a", "null", "none", "nan", "missing"];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use fiscal_analytics::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// True for empty strings and missing markers such as `N/A`.
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a finite number.
///
/// Handles currency symbols, percentages and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Shape checks run before chrono so plain numbers never reach the date parser.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/.]\d{1,2}([-/.]\d{1,2})?([ T]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?)?(Z|[+-]\d{2}:?\d{2})?$")
            .expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/.]\d{1,2}[-/.]\d{4}([ T]\d{1,2}:\d{2}(:\d{2})?)?$")
            .expect("Invalid regex: MM-DD-YYYY"),
        Regex::new(r"^[A-Za-z]{3,9} \d{1,2},? \d{4}$").expect("Invalid regex: Mon DD, YYYY"),
        Regex::new(r"^\d{1,2} [A-Za-z]{3,9},? \d{4}$").expect("Invalid regex: DD Mon YYYY"),
        Regex::new(r"^[A-Za-z]{3,9}[ -]\d{4}$").expect("Invalid regex: Mon YYYY"),
    ]
});

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}[-/.]\d{1,2}$").expect("Invalid regex: YYYY-MM"));

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parse a date or date-time string leniently.
///
/// Accepts ISO dates and timestamps (with or without offset), slash and dot
/// separated dates (month first when ambiguous), year-month (`2023-04`) and
/// month names (`Apr 3, 2023`, `3 April 2023`, `Apr 2023`). Bare numbers are
/// never treated as dates.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if !DATE_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    // Year-first dates use `-` from here on; only the two date separators are touched.
    let unified = match trimmed.as_bytes().get(4) {
        Some(b'/') => trimmed.replacen('/', "-", 2),
        Some(b'.') => trimmed.replacen('.', "-", 2),
        _ => trimmed.replace(',', ""),
    };

    if YEAR_MONTH.is_match(trimmed) {
        return NaiveDate::parse_from_str(&format!("{unified}-01"), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&unified, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&unified, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // "Apr 2023" / "April-2023"
    let month_year = format!("1 {}", unified.replace('-', " "));
    for format in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&month_year, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Parse a date string to milliseconds since the Unix epoch.
pub fn parse_datetime_millis(s: &str) -> Option<i64> {
    parse_datetime(s).map(|dt| dt.and_utc().timestamp_millis())
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Read a column as `f64` values, keeping missing cells as `None`.
pub fn column_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    series_f64(series)
}

/// Read a series as `f64` values, keeping missing cells as `None`.
pub fn series_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Present values only, in row order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Rows where every listed column has a value, as (row index, feature vector).
pub fn complete_rows(df: &DataFrame, columns: &[String]) -> PolarsResult<Vec<(usize, Vec<f64>)>> {
    let extracted: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| column_f64(df, c))
        .collect::<PolarsResult<_>>()?;

    let mut rows = Vec::new();
    for row in 0..df.height() {
        let features: Option<Vec<f64>> = extracted.iter().map(|col| col[row]).collect();
        if let Some(features) = features {
            rows.push((row, features));
        }
    }
    Ok(rows)
}

// =============================================================================
// Sample Statistics
// =============================================================================

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Ascending copy of the values.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent value of a string-like Series.
///
/// Ties go to the value that appears first in the column. `None` when the
/// column has no values at all.
pub fn string_mode(series: &Series) -> Option<String> {
    let as_str = series.cast(&DataType::String).ok()?;
    let str_chunked = as_str.str().ok()?;

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, val) in str_chunked.into_iter().flatten().enumerate() {
        let entry = counts.entry(val).or_insert((0, position));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values = series_f64(series)?;
    let filled: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_str = series.cast(&DataType::String)?;
    let filled: Vec<Option<String>> = as_str
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================
