//! Feature engineering on a clean table.
//!
//! [`FeatureEngineer`] works on its own copy of the table and remembers the
//! name of every column it adds. Columns that are not in the table are
//! skipped with a warning; columns of the wrong type are an error.

use crate::error::{AnalyticsError, Result};
use crate::utils::{
    canonical_datetime, column_f64, is_datetime_dtype, is_numeric_dtype, mean, sample_std,
};
use chrono::{DateTime, Datelike, Utc};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Added to every denominator of a ratio feature.
pub const RATIO_EPSILON: f64 = 1e-6;

pub const DEFAULT_LAGS: [usize; 4] = [1, 3, 6, 12];
pub const DEFAULT_WINDOWS: [usize; 3] = [3, 6, 12];

#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    df: DataFrame,
    engineered: Vec<String>,
}

impl FeatureEngineer {
    /// Start from a copy of `df`; the caller's table is never modified.
    pub fn new(df: &DataFrame) -> Self {
        Self {
            df: df.clone(),
            engineered: Vec::new(),
        }
    }

    /// Names of the added columns, in the order they were added.
    pub fn engineered_features(&self) -> &[String] {
        &self.engineered
    }

    pub fn table(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_table(self) -> DataFrame {
        self.df
    }

    /// `year`, `month`, `quarter`, `day_of_week` (Monday = 0), `day_of_year`
    /// and `is_weekend` from a date/datetime column.
    pub fn add_time_features(&mut self, date_column: &str) -> Result<&mut Self> {
        let Ok(column) = self.df.column(date_column) else {
            warn!("Time features skipped: no column '{}'", date_column);
            return Ok(self);
        };
        let series = column.as_materialized_series();
        if !is_datetime_dtype(series.dtype()) {
            return Err(AnalyticsError::NotTemporal(date_column.to_string()));
        }

        let millis = series.cast(&canonical_datetime())?.cast(&DataType::Int64)?;
        let instants: Vec<Option<DateTime<Utc>>> = millis
            .i64()?
            .into_iter()
            .map(|ms| ms.and_then(DateTime::from_timestamp_millis))
            .collect();

        let features = [
            ("year", time_part(&instants, |d| d.year())),
            ("month", time_part(&instants, |d| d.month() as i32)),
            ("quarter", time_part(&instants, |d| ((d.month() - 1) / 3 + 1) as i32)),
            (
                "day_of_week",
                time_part(&instants, |d| d.weekday().num_days_from_monday() as i32),
            ),
            ("day_of_year", time_part(&instants, |d| d.ordinal() as i32)),
            (
                "is_weekend",
                time_part(&instants, |d| {
                    i32::from(d.weekday().num_days_from_monday() >= 5)
                }),
            ),
        ];

        for (name, values) in features {
            self.push(Series::new(name.into(), values))?;
        }
        info!("Added time features from '{}'", date_column);
        Ok(self)
    }

    /// `{col}_lag_{k}`: the value `k` rows earlier; the first `k` rows are missing.
    pub fn add_lag_features(&mut self, columns: &[String], lags: &[usize]) -> Result<&mut Self> {
        for name in columns {
            let Some(values) = self.numeric(name)? else { continue };
            for &lag in lags {
                let shifted: Vec<Option<f64>> = (0..values.len())
                    .map(|row| row.checked_sub(lag).and_then(|src| values[src]))
                    .collect();
                self.push(Series::new(format!("{name}_lag_{lag}").into(), shifted))?;
            }
        }
        Ok(self)
    }

    /// `{col}_rolling_{mean|std|max|min}_{w}` over trailing windows.
    ///
    /// A window is missing until it is full or while it contains a missing value.
    pub fn add_rolling_features(
        &mut self,
        columns: &[String],
        windows: &[usize],
    ) -> Result<&mut Self> {
        for name in columns {
            let Some(values) = self.numeric(name)? else { continue };
            for &window in windows.iter().filter(|w| **w > 0) {
                let frames: Vec<Option<Vec<f64>>> = (0..values.len())
                    .map(|row| {
                        let start = (row + 1).checked_sub(window)?;
                        values[start..=row].iter().copied().collect()
                    })
                    .collect();

                let stat = |f: fn(&[f64]) -> Option<f64>| -> Vec<Option<f64>> {
                    frames.iter().map(|w| w.as_deref().and_then(f)).collect()
                };
                let stats = [
                    ("mean", stat(mean)),
                    ("std", stat(sample_std)),
                    ("max", stat(|w| w.iter().copied().reduce(f64::max))),
                    ("min", stat(|w| w.iter().copied().reduce(f64::min))),
                ];
                for (kind, series) in stats {
                    let feature = format!("{name}_rolling_{kind}_{window}");
                    self.push(Series::new(feature.into(), series))?;
                }
            }
        }
        Ok(self)
    }

    /// `{num}_to_{den}_ratio = num / (den + 1e-6)` for every pair.
    pub fn add_ratio_features(
        &mut self,
        numerators: &[String],
        denominators: &[String],
    ) -> Result<&mut Self> {
        for num in numerators {
            for den in denominators {
                let (Some(top), Some(bottom)) = (self.numeric(num)?, self.numeric(den)?) else {
                    continue;
                };
                let ratio = combine(&top, &bottom, |a, b| a / (b + RATIO_EPSILON));
                self.push(Series::new(format!("{num}_to_{den}_ratio").into(), ratio))?;
            }
        }
        Ok(self)
    }

    /// `{a}_x_{b} = a * b` for each unordered pair of `columns`.
    pub fn add_interaction_features(&mut self, columns: &[String]) -> Result<&mut Self> {
        for (i, first) in columns.iter().enumerate() {
            for second in &columns[i + 1..] {
                let (Some(a), Some(b)) = (self.numeric(first)?, self.numeric(second)?) else {
                    continue;
                };
                let product = combine(&a, &b, |x, y| x * y);
                self.push(Series::new(format!("{first}_x_{second}").into(), product))?;
            }
        }
        Ok(self)
    }

    fn numeric(&self, name: &str) -> Result<Option<Vec<Option<f64>>>> {
        let Ok(column) = self.df.column(name) else {
            warn!("Feature source '{}' not in table, skipping", name);
            return Ok(None);
        };
        if !is_numeric_dtype(column.dtype()) {
            return Err(AnalyticsError::NotNumeric(name.to_string()));
        }
        Ok(Some(column_f64(&self.df, name)?))
    }

    fn push(&mut self, series: Series) -> Result<()> {
        let name = series.name().to_string();
        self.df.with_column(series)?;
        debug!("Added feature '{}'", name);
        if !self.engineered.contains(&name) {
            self.engineered.push(name);
        }
        Ok(())
    }
}

fn time_part(
    instants: &[Option<DateTime<Utc>>],
    f: impl Fn(&DateTime<Utc>) -> i32,
) -> Vec<Option<i32>> {
    instants.iter().map(|i| i.as_ref().map(&f)).collect()
}

fn combine(a: &[Option<f64>], b: &[Option<f64>], f: impl Fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| Some(f((*x)?, (*y)?)))
        .collect()
}
