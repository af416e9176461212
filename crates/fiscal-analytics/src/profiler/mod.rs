//! Data profiling module for dataset analysis.
//!
//! This module provides functionality for profiling datasets, including:
//! - Type inference for columns
//! - Descriptive statistics and outlier sets per numeric column
//! - Pairwise correlation structure
//! - Trend and seasonality summaries

mod correlation;
mod statistics;
mod summary;
mod trends;
mod type_inference;

pub use correlation::{
    CorrelationMatrix, CorrelationPair, MIN_PAIRED_OBSERVATIONS, STRONG_CORRELATION, paired,
    pearson,
};
pub use statistics::{
    detect_outliers, iqr_outliers, kurtosis, profile_column, skewness, zscore_outliers,
};
pub use summary::{DatasetSummary, MissingCount};
pub use trends::{
    SeasonalityProfile, TrendDirection, TrendSummary, analyze_trends, least_squares_slope,
    seasonality, trend_direction,
};
pub use type_inference::{TEMPORAL_NAME_TOKENS, TypeInferencer, has_temporal_name};

use crate::config::{AnalyticsConfig, OutlierMethod};
use crate::error::{AnalyticsError, Result};
use crate::types::{ColumnProfile, ColumnTypes, SemanticType};
use crate::utils::column_f64;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Number of numeric columns covered by the trend summary.
const TREND_COLUMNS: usize = 5;

/// Number of most frequent values kept per categorical column.
const TOP_VALUES: usize = 5;

/// Frequency overview of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub name: String,
    pub unique_count: usize,
    /// Most frequent values with their counts, most frequent first.
    pub top_values: Vec<(String, usize)>,
    pub mode: Option<String>,
}

/// Everything the profiler computes for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// (rows, columns)
    pub shape: (usize, usize),
    pub columns: Vec<ColumnProfile>,
    pub categorical: Vec<CategoricalSummary>,
    pub correlations: CorrelationMatrix,
    /// Missing cells over all cells.
    pub missing_fraction: f64,
    /// Present only when the table has a temporal column.
    pub trends: Vec<TrendSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<SeasonalityProfile>,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Per-column statistics and correlation structure over a clean table.
#[derive(Debug, Clone)]
pub struct StatisticalProfiler {
    outlier_method: OutlierMethod,
    zscore_threshold: f64,
}

impl Default for StatisticalProfiler {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::Iqr,
            zscore_threshold: 3.0,
        }
    }
}

impl StatisticalProfiler {
    pub fn new(outlier_method: OutlierMethod, zscore_threshold: f64) -> Self {
        Self {
            outlier_method,
            zscore_threshold,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.outlier_method, config.zscore_threshold)
    }

    /// Profile every numeric and categorical column of `df`.
    ///
    /// The table is only read. Numeric columns with no values are skipped.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::NoColumns`] for a table without columns.
    pub fn profile(&self, df: &DataFrame, types: &ColumnTypes) -> Result<DatasetProfile> {
        if df.width() == 0 {
            return Err(AnalyticsError::NoColumns);
        }
        info!(
            "Profiling {} rows x {} columns ({} outliers)",
            df.height(),
            df.width(),
            self.outlier_method.as_str()
        );

        let numeric = present_columns(df, &types.numeric_columns());

        let mut columns = Vec::with_capacity(numeric.len());
        for name in &numeric {
            let values = column_f64(df, name)?;
            match profile_column(name, &values, self.outlier_method, self.zscore_threshold) {
                Some(profile) => {
                    debug!(
                        "Column '{}': mean={:.3}, skew={:.3}, {} outliers",
                        name,
                        profile.mean,
                        profile.skewness,
                        profile.outliers.count()
                    );
                    columns.push(profile);
                }
                None => debug!("Column '{}' has no values, skipping", name),
            }
        }

        let categorical = present_columns(df, &types.columns_of(SemanticType::Categorical))
            .iter()
            .map(|name| summarize_categorical(df, name))
            .collect::<Result<Vec<_>>>()?;

        let correlations = CorrelationMatrix::compute(df, &numeric)?;
        let strong = correlations.strong_pairs(STRONG_CORRELATION);
        if !strong.is_empty() {
            info!("Found {} strong correlations (|r| > {})", strong.len(), STRONG_CORRELATION);
        }

        let temporal = present_columns(df, &types.columns_of(SemanticType::Temporal));
        let (trends, seasonality) = match temporal.first() {
            Some(date_col) => {
                let head: Vec<String> = numeric.iter().take(TREND_COLUMNS).cloned().collect();
                let trends = analyze_trends(df, &head)?;
                let seasonal = match numeric.first() {
                    Some(value_col) => match seasonality(df, date_col, value_col) {
                        Ok(profile) => Some(profile),
                        Err(e) => {
                            warn!("Seasonality of '{}' skipped: {}", value_col, e);
                            None
                        }
                    },
                    None => None,
                };
                (trends, seasonal)
            }
            None => (Vec::new(), None),
        };

        Ok(DatasetProfile {
            shape: (df.height(), df.width()),
            columns,
            categorical,
            correlations,
            missing_fraction: missing_fraction(df),
            trends,
            seasonality,
        })
    }
}

/// Missing cells divided by all cells; zero for an empty table.
pub fn missing_fraction(df: &DataFrame) -> f64 {
    let cells = df.height() * df.width();
    if cells == 0 {
        return 0.0;
    }
    let missing: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
    missing as f64 / cells as f64
}

// Type maps can outlive dropped columns; only keep names the table still has.
fn present_columns(df: &DataFrame, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|n| df.column(n.as_str()).is_ok())
        .cloned()
        .collect()
}

fn summarize_categorical(df: &DataFrame, name: &str) -> Result<CategoricalSummary> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in series.str()?.into_iter().flatten().enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first))| (value, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    Ok(CategoricalSummary {
        name: name.to_string(),
        unique_count: ranked.len(),
        mode: ranked.first().map(|(value, _, _)| value.to_string()),
        top_values: ranked
            .iter()
            .take(TOP_VALUES)
            .map(|(value, count, _)| (value.to_string(), *count))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DistributionClass;

    fn types(entries: &[(&str, SemanticType)]) -> ColumnTypes {
        let mut types = ColumnTypes::new();
        for (name, semantic) in entries {
            types.insert(*name, *semantic);
        }
        types
    }

    #[test]
    fn test_profile_numeric_and_categorical() {
        let df = df![
            "revenue" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0],
            "spend" => [2.0, 4.0, 6.0, 8.0, 10.0, 12.0],
            "region" => ["North", "South", "South", "East", "North", "South"],
        ]
        .unwrap();
        let types = types(&[
            ("revenue", SemanticType::Numeric),
            ("spend", SemanticType::Numeric),
            ("region", SemanticType::Categorical),
        ]);

        let profile = StatisticalProfiler::default().profile(&df, &types).unwrap();

        assert_eq!(profile.shape, (6, 3));
        assert_eq!(profile.columns.len(), 2);
        let revenue = profile.column("revenue").unwrap();
        assert_eq!(revenue.outliers.indices, vec![5]);
        assert_eq!(revenue.distribution, DistributionClass::RightSkewed);

        let region = &profile.categorical[0];
        assert_eq!(region.unique_count, 3);
        assert_eq!(region.mode.as_deref(), Some("South"));
        assert_eq!(
            region.top_values,
            vec![
                ("South".to_string(), 3),
                ("North".to_string(), 2),
                ("East".to_string(), 1)
            ]
        );

        assert_eq!(profile.correlations.get("spend", "revenue"), profile.correlations.get("revenue", "spend"));
        assert_eq!(profile.missing_fraction, 0.0);
        assert!(profile.trends.is_empty());
        assert!(profile.seasonality.is_none());
    }

    #[test]
    fn test_profile_uses_selected_outlier_method() {
        let mut raw = vec![10.0; 20];
        raw.push(60.0);
        let df = df!["x" => raw].unwrap();
        let types = types(&[("x", SemanticType::Numeric)]);

        let profile = StatisticalProfiler::new(OutlierMethod::Zscore, 3.0)
            .profile(&df, &types)
            .unwrap();
        let outliers = &profile.columns[0].outliers;
        assert_eq!(outliers.method, OutlierMethod::Zscore);
        assert_eq!(outliers.indices, vec![20]);
    }

    #[test]
    fn test_missing_fraction() {
        let df = df![
            "a" => [Some(1.0), None],
            "b" => [None::<f64>, None],
        ]
        .unwrap();
        assert_eq!(missing_fraction(&df), 0.75);
        assert_eq!(missing_fraction(&DataFrame::empty()), 0.0);
    }

    #[test]
    fn test_profile_rejects_table_without_columns() {
        let err = StatisticalProfiler::default()
            .profile(&DataFrame::empty(), &ColumnTypes::new())
            .unwrap_err();
        assert!(err.is_structural());
    }
}
