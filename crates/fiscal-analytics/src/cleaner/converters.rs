//! Type conversion functions for data cleaning.
//!
//! Conversions never fail on cell content: a value that cannot be parsed
//! becomes missing and is counted in [`Coerced::failed`].

use crate::utils::{
    canonical_datetime, is_datetime_dtype, is_missing_marker, is_numeric_dtype,
    parse_datetime_millis, parse_numeric_string,
};
use anyhow::Result;
use polars::prelude::*;

/// A converted column and the number of present cells that did not survive.
#[derive(Debug, Clone)]
pub(crate) struct Coerced {
    pub series: Series,
    pub failed: usize,
    /// How many of the failures were missing markers such as `N/A`.
    pub markers: usize,
}

/// Convert a column to `Float64`.
pub(crate) fn to_numeric(series: &Series) -> Result<Coerced> {
    if series.dtype() != &DataType::String {
        let cast = series.cast(&DataType::Float64)?;
        let failed = cast.null_count().saturating_sub(series.null_count());
        return Ok(Coerced {
            series: cast,
            failed,
            markers: 0,
        });
    }

    let str_series = series.str()?;
    let mut result_vec: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
    let mut failed = 0;
    let mut markers = 0;

    for opt_val in str_series.into_iter() {
        let Some(val) = opt_val else {
            result_vec.push(None);
            continue;
        };
        let parsed = parse_numeric_string(val);
        if parsed.is_none() {
            failed += 1;
            if is_missing_marker(val) {
                markers += 1;
            }
        }
        result_vec.push(parsed);
    }

    Ok(Coerced {
        series: Series::new(series.name().clone(), result_vec),
        failed,
        markers,
    })
}

/// Convert a column to the canonical millisecond datetime type.
///
/// Strings go through the lenient date parser, falling back to Unix
/// timestamps in seconds or milliseconds. Integer columns are read as Unix
/// timestamps.
pub(crate) fn to_datetime(series: &Series) -> Result<Coerced> {
    let dtype = series.dtype();
    if is_datetime_dtype(dtype) {
        return Ok(Coerced {
            series: series.cast(&canonical_datetime())?,
            failed: 0,
            markers: 0,
        });
    }

    let mut failed = 0;
    let mut markers = 0;
    let mut timestamps: Vec<Option<i64>> = Vec::with_capacity(series.len());

    if dtype == &DataType::String {
        for opt_val in series.str()?.into_iter() {
            let Some(val) = opt_val else {
                timestamps.push(None);
                continue;
            };
            let parsed = parse_datetime_millis(val).or_else(|| {
                val.trim().parse::<i64>().ok().and_then(epoch_millis)
            });
            if parsed.is_none() {
                failed += 1;
                if is_missing_marker(val) {
                    markers += 1;
                }
            }
            timestamps.push(parsed);
        }
    } else if is_numeric_dtype(dtype) {
        for opt_val in series.cast(&DataType::Int64)?.i64()?.into_iter() {
            let Some(val) = opt_val else {
                timestamps.push(None);
                continue;
            };
            let parsed = epoch_millis(val);
            if parsed.is_none() {
                failed += 1;
            }
            timestamps.push(parsed);
        }
    } else {
        failed = series.len() - series.null_count();
        timestamps = vec![None; series.len()];
    }

    let timestamp_series = Series::new(series.name().clone(), timestamps);
    Ok(Coerced {
        series: timestamp_series.cast(&canonical_datetime())?,
        failed,
        markers,
    })
}

/// Interpret an integer as a recent Unix timestamp.
///
/// Ten-digit values are seconds and thirteen-digit values milliseconds; anything
/// else is rejected so that plain amounts and years never turn into dates.
pub(crate) fn epoch_millis(value: i64) -> Option<i64> {
    if value > 1_000_000_000 && value < 2_000_000_000 {
        Some(value * 1000)
    } else if value > 1_000_000_000_000 && value < 2_000_000_000_000 {
        Some(value)
    } else {
        None
    }
}
