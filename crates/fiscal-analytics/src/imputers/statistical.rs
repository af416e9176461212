//! Statistical imputation methods.
//!
//! Provides median, mean, mode and forward/backward fill imputation.
//! Every method fills one column in place and returns the log
//! entry describing what it filled, or `None` when the column had nothing to
//! fill (or no value to fill it with).

use crate::types::{CleaningLogEntry, CleaningOp, LogTarget};
use crate::utils::{
    canonical_datetime, fill_numeric_nulls, fill_string_nulls, is_datetime_dtype,
    is_numeric_dtype, mean, median, present, series_f64, string_mode,
};
use anyhow::Result;
use polars::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

/// Placeholder written into categorical columns that have no value to take a mode from.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill a numeric column with the median of its present values.
    pub fn fill_median(df: &mut DataFrame, col_name: &str) -> Result<Option<CleaningLogEntry>> {
        let Some(series) = Self::series_with_nulls(df, col_name)? else {
            return Ok(None);
        };
        match median(&present(&series_f64(&series)?)) {
            Some(value) => Self::fill_with_value(df, &series, value, "median"),
            None => Ok(None),
        }
    }

    /// Fill a numeric column with the mean of its present values.
    pub fn fill_mean(df: &mut DataFrame, col_name: &str) -> Result<Option<CleaningLogEntry>> {
        let Some(series) = Self::series_with_nulls(df, col_name)? else {
            return Ok(None);
        };
        match mean(&present(&series_f64(&series)?)) {
            Some(value) => Self::fill_with_value(df, &series, value, "mean"),
            None => Ok(None),
        }
    }

    /// Fill a column with its most frequent value.
    ///
    /// Ties go to the value seen first. String columns without any value
    /// receive `fallback` when one is given; other columns are left as they are.
    pub fn fill_mode(
        df: &mut DataFrame,
        col_name: &str,
        fallback: Option<&str>,
    ) -> Result<Option<CleaningLogEntry>> {
        let Some(series) = Self::series_with_nulls(df, col_name)? else {
            return Ok(None);
        };
        let dtype = series.dtype().clone();

        if is_numeric_dtype(&dtype) {
            return match first_mode(present(&series_f64(&series)?).iter().map(|v| v.to_bits())) {
                Some(bits) => Self::fill_with_value(df, &series, f64::from_bits(bits), "mode"),
                None => Ok(None),
            };
        }

        if is_datetime_dtype(&dtype) {
            let millis = series.cast(&canonical_datetime())?.cast(&DataType::Int64)?;
            let Some(mode) = first_mode(millis.i64()?.into_iter().flatten()) else {
                return Ok(None);
            };
            let filled: Vec<Option<i64>> = millis
                .i64()?
                .into_iter()
                .map(|v| Some(v.unwrap_or(mode)))
                .collect();
            let filled = Series::new(series.name().clone(), filled).cast(&canonical_datetime())?;
            return Self::replace_and_log(df, &series, filled, json!(mode), "mode");
        }

        let (value, method) = match (string_mode(&series), fallback) {
            (Some(mode), _) => (mode, "mode"),
            (None, Some(fallback)) => (fallback.to_string(), "placeholder"),
            (None, None) => return Ok(None),
        };
        let filled = fill_string_nulls(&series, &value)?;
        Self::replace_and_log(df, &series, filled, json!(value), method)
    }

    /// Propagate the last present value forward. A leading run of missing values stays missing.
    pub fn fill_forward(df: &mut DataFrame, col_name: &str) -> Result<Option<CleaningLogEntry>> {
        let Some(series) = Self::series_with_nulls(df, col_name)? else {
            return Ok(None);
        };
        let filled = series.fill_null(FillNullStrategy::Forward(None))?;
        Self::replace_and_log(df, &series, filled, serde_json::Value::Null, "forward_fill")
    }

    /// Propagate the next present value backward. A trailing run of missing values stays missing.
    pub fn fill_backward(df: &mut DataFrame, col_name: &str) -> Result<Option<CleaningLogEntry>> {
        let Some(series) = Self::series_with_nulls(df, col_name)? else {
            return Ok(None);
        };
        let filled = series.fill_null(FillNullStrategy::Backward(None))?;
        Self::replace_and_log(df, &series, filled, serde_json::Value::Null, "backward_fill")
    }

    /// The column, if it exists and has at least one missing value.
    fn series_with_nulls(df: &DataFrame, col_name: &str) -> Result<Option<Series>> {
        let Ok(column) = df.column(col_name) else {
            return Ok(None);
        };
        let series = column.as_materialized_series();
        if series.null_count() == 0 {
            return Ok(None);
        }
        Ok(Some(series.clone()))
    }

    /// Fill numeric column with a specific value.
    fn fill_with_value(
        df: &mut DataFrame,
        original: &Series,
        fill_value: f64,
        method: &str,
    ) -> Result<Option<CleaningLogEntry>> {
        let filled = fill_numeric_nulls(original, fill_value)?;
        Self::replace_and_log(df, original, filled, json!(fill_value), method)
    }

    fn replace_and_log(
        df: &mut DataFrame,
        original: &Series,
        filled: Series,
        fill_value: serde_json::Value,
        method: &str,
    ) -> Result<Option<CleaningLogEntry>> {
        let imputed = original.null_count() - filled.null_count();
        let name = original.name().to_string();
        df.replace(&name, filled)?;

        if imputed == 0 {
            return Ok(None);
        }
        debug!("Imputed {} values in '{}' ({})", imputed, name, method);

        let summary = match &fill_value {
            serde_json::Value::Null => format!("Filled {imputed} missing values in '{name}' by {method}"),
            value => format!("Filled {imputed} missing values in '{name}' with {method} {value}"),
        };
        Ok(Some(
            CleaningLogEntry::new(CleaningOp::Impute, LogTarget::Column(name), summary)
                .with_params(json!({ "method": method }))
                .with_effect(json!({ "imputed": imputed, "fill_value": fill_value })),
        ))
    }
}

/// Most frequent item; ties go to the item seen first.
fn first_mode<T, I>(items: I) -> Option<T>
where
    T: std::hash::Hash + Eq + Copy,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (position, item) in items.into_iter().enumerate() {
        counts.entry(item).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_at(df: &DataFrame, col: &str, idx: usize) -> f64 {
        df.column(col).unwrap().get(idx).unwrap().try_extract::<f64>().unwrap()
    }

    // ========================================================================
    // fill_median() / fill_mean() tests
    // ========================================================================

    #[test]
    fn test_fill_median_basic() {
        let mut df = df![
            "values" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
        ]
        .unwrap();

        let entry = StatisticalImputer::fill_median(&mut df, "values").unwrap().unwrap();

        assert_eq!(df.column("values").unwrap().null_count(), 0);
        assert_eq!(f64_at(&df, "values", 1), 3.0);
        assert_eq!(f64_at(&df, "values", 3), 3.0);
        assert_eq!(entry.operation, CleaningOp::Impute);
        assert_eq!(entry.effect["imputed"], 2);
        assert_eq!(entry.effect["fill_value"], 3.0);
        assert_eq!(entry.params["method"], "median");
    }

    #[test]
    fn test_fill_median_without_nulls_logs_nothing() {
        let mut df = df!["values" => [1.0, 2.0, 3.0]].unwrap();
        assert!(StatisticalImputer::fill_median(&mut df, "values").unwrap().is_none());
    }

    #[test]
    fn test_fill_median_all_nulls_is_left_alone() {
        let mut df = df!["values" => [Option::<f64>::None, None, None]].unwrap();
        assert!(StatisticalImputer::fill_median(&mut df, "values").unwrap().is_none());
        assert_eq!(df.column("values").unwrap().null_count(), 3);
    }

    #[test]
    fn test_fill_median_nonexistent_column() {
        let mut df = df!["other" => [1.0, 2.0, 3.0]].unwrap();
        assert!(StatisticalImputer::fill_median(&mut df, "values").unwrap().is_none());
    }

    #[test]
    fn test_fill_mean() {
        let mut df = df!["values" => [Some(1.0), None, Some(5.0)]].unwrap();
        StatisticalImputer::fill_mean(&mut df, "values").unwrap();
        assert_eq!(f64_at(&df, "values", 1), 3.0);
    }

    // ========================================================================
    // fill_mode() tests
    // ========================================================================

    #[test]
    fn test_fill_mode_strings_tie_break() {
        let mut df = df![
            "region" => [Some("South"), Some("North"), None, Some("North"), Some("South")],
        ]
        .unwrap();

        let entry = StatisticalImputer::fill_mode(&mut df, "region", None)
            .unwrap()
            .unwrap();

        let region = df.column("region").unwrap().as_materialized_series().clone();
        assert_eq!(region.str().unwrap().get(2), Some("South"));
        assert_eq!(entry.effect["fill_value"], "South");
    }

    #[test]
    fn test_fill_mode_falls_back_to_placeholder() {
        let mut df = df!["notes" => [None::<&str>, None]].unwrap();
        let entry = StatisticalImputer::fill_mode(&mut df, "notes", Some(UNKNOWN_PLACEHOLDER))
            .unwrap()
            .unwrap();

        let notes = df.column("notes").unwrap().as_materialized_series().clone();
        assert_eq!(notes.str().unwrap().get(0), Some("Unknown"));
        assert_eq!(entry.params["method"], "placeholder");
    }

    #[test]
    fn test_fill_mode_numeric() {
        let mut df = df!["units" => [Some(2.0), Some(7.0), Some(7.0), None]].unwrap();
        StatisticalImputer::fill_mode(&mut df, "units", None).unwrap();
        assert_eq!(f64_at(&df, "units", 3), 7.0);
    }

    // ========================================================================
    // fill_forward() / fill_backward() tests
    // ========================================================================

    #[test]
    fn test_fill_forward_keeps_leading_missing() {
        let mut df = df!["x" => [None, Some(1.0), None, Some(4.0), None]].unwrap();

        let entry = StatisticalImputer::fill_forward(&mut df, "x").unwrap().unwrap();

        let x = df.column("x").unwrap();
        assert_eq!(x.null_count(), 1);
        assert!(x.get(0).unwrap().is_null());
        assert_eq!(f64_at(&df, "x", 2), 1.0);
        assert_eq!(f64_at(&df, "x", 4), 4.0);
        assert_eq!(entry.effect["imputed"], 2);
    }

    #[test]
    fn test_fill_backward() {
        let mut df = df!["x" => [None, Some(1.0), None, Some(4.0), None]].unwrap();
        StatisticalImputer::fill_backward(&mut df, "x").unwrap();

        assert_eq!(f64_at(&df, "x", 0), 1.0);
        assert_eq!(f64_at(&df, "x", 2), 4.0);
        assert!(df.column("x").unwrap().get(4).unwrap().is_null());
    }

    #[test]
    fn test_first_mode() {
        assert_eq!(first_mode([3, 1, 1, 3]), Some(3));
        assert_eq!(first_mode([5, 2, 2]), Some(2));
        assert_eq!(first_mode(Vec::<i32>::new()), None);
    }
}
