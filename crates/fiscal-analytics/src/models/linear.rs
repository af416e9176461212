//! Least-squares trend line forecaster.

use super::strategy::{Forecast, ForecastMetrics, ForecastStrategy};
use crate::error::{AnalyticsError, Result};
use crate::profiler::least_squares_slope;
use crate::utils::mean;
use tracing::debug;

/// Fits `y = a + b * t` over the row index and extends the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendForecaster;

impl LinearTrendForecaster {
    pub const NAME: &'static str = "linear_trend";

    /// Intercept and slope of the fitted line.
    fn fit(history: &[f64]) -> Option<(f64, f64)> {
        let slope = least_squares_slope(history)?;
        let x_mean = (history.len() - 1) as f64 / 2.0;
        let intercept = mean(history)? - slope * x_mean;
        Some((intercept, slope))
    }
}

impl ForecastStrategy for LinearTrendForecaster {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fit_predict(&self, history: &[f64], periods: usize) -> Result<Forecast> {
        if history.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::InvalidConfig(
                "forecast history must not contain missing or non-finite values".to_string(),
            ));
        }
        let (intercept, slope) = Self::fit(history).ok_or_else(|| {
            AnalyticsError::InvalidConfig(format!(
                "linear trend needs at least {} observations, got {}",
                self.min_history(),
                history.len()
            ))
        })?;
        debug!("Linear trend: intercept={:.4}, slope={:.4}", intercept, slope);

        let line = |t: usize| intercept + slope * t as f64;
        let fitted: Vec<f64> = (0..history.len()).map(line).collect();
        let predictions = (history.len()..history.len() + periods).map(line).collect();

        Ok(Forecast {
            strategy: Self::NAME.to_string(),
            predictions,
            metrics: ForecastMetrics::from_residuals(history, &fitted),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line_is_extended() {
        let forecast = LinearTrendForecaster
            .fit_predict(&[3.0, 5.0, 7.0, 9.0], 3)
            .unwrap();

        assert_eq!(forecast.strategy, "linear_trend");
        assert_eq!(forecast.predictions.len(), 3);
        for (got, want) in forecast.predictions.iter().zip([11.0, 13.0, 15.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        assert!(forecast.metrics.rmse < 1e-9);
        assert!(forecast.metrics.mape.unwrap() < 1e-9);
    }

    #[test]
    fn test_noisy_history_has_positive_error() {
        let forecast = LinearTrendForecaster
            .fit_predict(&[1.0, 3.0, 2.0, 4.0], 1)
            .unwrap();
        // slope 0.8, intercept 1.3
        assert!((forecast.predictions[0] - 4.5).abs() < 1e-9);
        assert!(forecast.metrics.mae > 0.0);
    }

    #[test]
    fn test_short_history_is_rejected() {
        let err = LinearTrendForecaster.fit_predict(&[1.0], 2).unwrap_err();
        assert!(err.is_configuration());
    }
}
