//! Forecasting strategy trait.
//!
//! A strategy is anything that can fit a univariate history and extend it by a
//! number of periods. Optional backends report themselves through
//! [`ForecastStrategy::is_available`] so the registry can skip them cleanly.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// In-sample fit quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Percent; `None` when every actual value is zero.
    pub mape: Option<f64>,
}

impl ForecastMetrics {
    /// Compare fitted values against actuals. Zero actuals are left out of MAPE.
    pub fn from_residuals(actual: &[f64], fitted: &[f64]) -> Self {
        let n = actual.len().min(fitted.len());
        if n == 0 {
            return Self {
                mae: 0.0,
                mse: 0.0,
                rmse: 0.0,
                mape: None,
            };
        }

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut pct_sum = 0.0;
        let mut pct_count = 0usize;
        for (a, f) in actual.iter().zip(fitted).take(n) {
            let err = a - f;
            abs_sum += err.abs();
            sq_sum += err * err;
            if *a != 0.0 {
                pct_sum += (err / a).abs();
                pct_count += 1;
            }
        }

        let mse = sq_sum / n as f64;
        Self {
            mae: abs_sum / n as f64,
            mse,
            rmse: mse.sqrt(),
            mape: (pct_count > 0).then(|| pct_sum / pct_count as f64 * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub strategy: String,
    /// The `periods` values following the history.
    pub predictions: Vec<f64>,
    pub metrics: ForecastMetrics,
}

/// A forecasting backend.
///
/// Implementations must be `Send + Sync` so one registry can serve several
/// analyses at once.
pub trait ForecastStrategy: Send + Sync {
    /// Registry key, e.g. `"linear_trend"`.
    fn name(&self) -> &str;

    /// Whether the backend can run in this build.
    fn is_available(&self) -> bool {
        true
    }

    /// Shortest history the strategy accepts.
    fn min_history(&self) -> usize {
        2
    }

    fn fit_predict(&self, history: &[f64], periods: usize) -> Result<Forecast>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_skip_zero_actuals_in_mape() {
        let metrics = ForecastMetrics::from_residuals(&[0.0, 10.0, 20.0], &[1.0, 11.0, 18.0]);
        assert!((metrics.mae - 4.0 / 3.0).abs() < 1e-12);
        assert!((metrics.mse - 2.0).abs() < 1e-12);
        assert!((metrics.rmse - 2f64.sqrt()).abs() < 1e-12);
        // (10% + 10%) / 2
        assert!((metrics.mape.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_actuals_have_no_mape() {
        let metrics = ForecastMetrics::from_residuals(&[0.0, 0.0], &[1.0, -1.0]);
        assert_eq!(metrics.mape, None);
        assert_eq!(metrics.mae, 1.0);
    }
}
