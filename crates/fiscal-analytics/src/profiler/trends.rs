//! Trend direction and calendar seasonality of numeric columns.

use crate::error::{AnalyticsError, Result};
use crate::utils::{canonical_datetime, column_f64, is_datetime_dtype, mean, present, sample_std};
use chrono::{DateTime, Datelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of the least-squares line through a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Increasing => "Increasing",
            Self::Decreasing => "Decreasing",
            Self::Stable => "Stable",
            Self::InsufficientData => "Insufficient data",
        }
    }
}

/// Slope of the ordinary least-squares fit of `values` against their index.
///
/// `None` for fewer than two values.
pub fn least_squares_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values)?;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    Some(num / den)
}

pub fn trend_direction(values: &[f64]) -> TrendDirection {
    match least_squares_slope(values) {
        None => TrendDirection::InsufficientData,
        Some(slope) if slope > 0.0 => TrendDirection::Increasing,
        Some(slope) if slope < 0.0 => TrendDirection::Decreasing,
        Some(_) => TrendDirection::Stable,
    }
}

/// Level, spread and direction of one numeric column in row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub column: String,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub direction: TrendDirection,
}

/// Summarize the trend of each listed column. Columns without values are skipped.
///
/// Missing cells are ignored; the slope runs over the remaining values in row order.
pub fn analyze_trends(df: &DataFrame, columns: &[String]) -> Result<Vec<TrendSummary>> {
    let mut summaries = Vec::with_capacity(columns.len());
    for column in columns {
        let values = present(&column_f64(df, column)?);
        let Some(mean) = mean(&values) else { continue };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        summaries.push(TrendSummary {
            column: column.clone(),
            mean,
            std: sample_std(&values).unwrap_or(0.0),
            min,
            max,
            direction: trend_direction(&values),
        });
    }
    Ok(summaries)
}

/// Mean of a value column per calendar month, quarter and year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityProfile {
    pub date_column: String,
    pub value_column: String,
    /// Month (1-12) to mean.
    pub monthly: BTreeMap<u32, f64>,
    /// Quarter (1-4) to mean.
    pub quarterly: BTreeMap<u32, f64>,
    pub yearly: BTreeMap<i32, f64>,
}

/// Group `value_col` by the calendar position of `date_col`.
///
/// Rows missing either side are ignored.
///
/// # Errors
///
/// [`AnalyticsError::ColumnNotFound`] if either column is absent and
/// [`AnalyticsError::NotTemporal`] if `date_col` is not a date/datetime column.
pub fn seasonality(df: &DataFrame, date_col: &str, value_col: &str) -> Result<SeasonalityProfile> {
    let dates = df
        .column(date_col)
        .map_err(|_| AnalyticsError::ColumnNotFound(date_col.to_string()))?
        .as_materialized_series();
    if df.column(value_col).is_err() {
        return Err(AnalyticsError::ColumnNotFound(value_col.to_string()));
    }
    if !is_datetime_dtype(dates.dtype()) {
        return Err(AnalyticsError::NotTemporal(date_col.to_string()));
    }

    let millis = dates.cast(&canonical_datetime())?.cast(&DataType::Int64)?;
    let values = column_f64(df, value_col)?;

    let mut monthly: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    let mut quarterly: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    let mut yearly: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for (ms, value) in millis.i64()?.into_iter().zip(values) {
        let (Some(ms), Some(value)) = (ms, value) else { continue };
        let Some(instant) = DateTime::from_timestamp_millis(ms) else { continue };

        let month = instant.month();
        accumulate(&mut monthly, month, value);
        accumulate(&mut quarterly, (month - 1) / 3 + 1, value);
        accumulate(&mut yearly, instant.year(), value);
    }

    Ok(SeasonalityProfile {
        date_column: date_col.to_string(),
        value_column: value_col.to_string(),
        monthly: finish(monthly),
        quarterly: finish(quarterly),
        yearly: finish(yearly),
    })
}

fn accumulate<K: Ord>(groups: &mut BTreeMap<K, (f64, usize)>, key: K, value: f64) {
    let entry = groups.entry(key).or_insert((0.0, 0));
    entry.0 += value;
    entry.1 += 1;
}

fn finish<K: Ord>(groups: BTreeMap<K, (f64, usize)>) -> BTreeMap<K, f64> {
    groups
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}
