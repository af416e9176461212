//! Anomaly detection over a clean table.
//!
//! The multivariate [`IsolationForest`] and the per-column [`ZScoreDetector`]
//! answer different questions and are reported side by side; their flags are
//! never merged into one field.

mod isolation_forest;
mod zscore;

pub use isolation_forest::{AnomalyScore, IsolationForest, IsolationResult};
pub use zscore::{ColumnAnomalies, ZScoreDetector};

use serde::{Deserialize, Serialize};

/// Both detectors' results for one table. Each detector runs on its own, so
/// either side may be absent while the other is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Needs at least two numeric columns.
    pub isolation: Option<IsolationResult>,
    /// Needs at least one numeric column.
    pub zscore: Option<Vec<ColumnAnomalies>>,
}

impl AnomalyReport {
    /// Rows flagged by the isolation detector and by the z-score detector on
    /// at least one column. Empty unless both detectors ran.
    pub fn flagged_by_both(&self) -> Vec<usize> {
        let (Some(isolation), Some(zscore)) = (&self.isolation, &self.zscore) else {
            return Vec::new();
        };
        isolation
            .anomaly_rows()
            .into_iter()
            .filter(|row| zscore.iter().any(|c| c.rows.contains(row)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.isolation.is_none() && self.zscore.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_detectors_run_side_by_side() {
        let mut revenue: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let mut spend: Vec<f64> = (0..30).map(|i| 50.0 + (i % 4) as f64).collect();
        revenue.push(1000.0);
        spend.push(52.0);
        let df = df!["revenue" => revenue, "spend" => spend].unwrap();
        let columns = vec!["revenue".to_string(), "spend".to_string()];

        let report = AnomalyReport {
            isolation: IsolationForest::new(100, 256, 0.1, 42)
                .detect(&df, &columns)
                .ok(),
            zscore: ZScoreDetector::default().detect(&df, &columns).ok(),
        };

        // ceil(0.1 * 31) rows are always flagged by the ensemble.
        assert_eq!(report.isolation.as_ref().unwrap().n_anomalies, 4);
        let zscore = report.zscore.as_ref().unwrap();
        assert_eq!(zscore[0].rows, vec![30]);
        assert!(zscore[1].rows.is_empty());
        assert_eq!(report.flagged_by_both(), vec![30]);
    }

    #[test]
    fn test_zscore_stands_without_isolation() {
        let mut revenue: Vec<f64> = (0..19).map(|i| 10.0 + i as f64 * 0.1).collect();
        revenue.push(100.0);
        let df = df!["revenue" => revenue].unwrap();

        let report = AnomalyReport {
            isolation: None,
            zscore: ZScoreDetector::default()
                .detect(&df, &["revenue".to_string()])
                .ok(),
        };

        assert!(!report.is_empty());
        assert_eq!(report.zscore.as_ref().unwrap()[0].rows, vec![19]);
        assert!(report.flagged_by_both().is_empty());
        assert!(AnomalyReport::default().is_empty());
    }
}
