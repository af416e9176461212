//! Univariate z-score detector.

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::profiler::zscore_outliers;
use crate::utils::{column_f64, is_numeric_dtype};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Z-score findings for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnomalies {
    pub column: String,
    pub n_anomalies: usize,
    /// Flagged share of the non-missing values, 0-100.
    pub anomaly_percentage: f64,
    /// Flagged rows, ascending.
    pub rows: Vec<usize>,
    /// The first flagged values in row order, at most `sample_cap` of them.
    pub anomaly_values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    threshold: f64,
    sample_cap: usize,
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            sample_cap: 10,
        }
    }
}

impl ZScoreDetector {
    pub fn new(threshold: f64, sample_cap: usize) -> Self {
        Self {
            threshold,
            sample_cap,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.zscore_threshold, config.zscore_sample_cap)
    }

    /// Run the detector on each listed column independently.
    pub fn detect(&self, df: &DataFrame, columns: &[String]) -> Result<Vec<ColumnAnomalies>> {
        columns
            .iter()
            .map(|name| {
                let column = df
                    .column(name)
                    .map_err(|_| AnalyticsError::ColumnNotFound(name.clone()))?;
                if !is_numeric_dtype(column.dtype()) {
                    return Err(AnalyticsError::NotNumeric(name.clone()));
                }
                let values = column_f64(df, name)?;
                Ok(self.detect_values(name, &values))
            })
            .collect()
    }

    pub fn detect_values(&self, column: &str, values: &[Option<f64>]) -> ColumnAnomalies {
        let set = zscore_outliers(values, self.threshold);
        debug!(
            "Z-score |z| > {} on '{}': {} values",
            self.threshold,
            column,
            set.count()
        );

        ColumnAnomalies {
            column: column.to_string(),
            n_anomalies: set.count(),
            anomaly_percentage: set.percentage,
            anomaly_values: set.values.iter().take(self.sample_cap).copied().collect(),
            rows: set.indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_values_beyond_threshold() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 3) as f64)).collect();
        values.push(Some(100.0));
        values.push(None);

        let result = ZScoreDetector::default().detect_values("revenue", &values);

        assert_eq!(result.n_anomalies, 1);
        assert_eq!(result.rows, vec![20]);
        assert_eq!(result.anomaly_values, vec![100.0]);
        assert!((result.anomaly_percentage - 100.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_is_capped() {
        let values: Vec<Option<f64>> = [0.0, 0.0, 0.0, 0.0, 10.0, -10.0, 10.0]
            .into_iter()
            .map(Some)
            .collect();

        let result = ZScoreDetector::new(0.5, 2).detect_values("x", &values);

        assert_eq!(result.n_anomalies, 3);
        assert_eq!(result.anomaly_values, vec![10.0, -10.0]);
        assert_eq!(result.rows, vec![4, 5, 6]);
    }

    #[test]
    fn test_detect_checks_columns() {
        let df = df![
            "revenue" => [1.0, 2.0, 3.0],
            "region" => ["a", "b", "c"],
        ]
        .unwrap();
        let detector = ZScoreDetector::default();

        let ok = detector.detect(&df, &["revenue".to_string()]).unwrap();
        assert_eq!(ok[0].n_anomalies, 0);

        let err = detector.detect(&df, &["region".to_string()]).unwrap_err();
        assert_eq!(err.error_code(), "NOT_NUMERIC");
    }
}
