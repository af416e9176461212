//! Forecasting strategies and trend recommendations.
//!
//! Strategies are looked up by name in a [`ModelRegistry`]. A strategy that
//! is not registered, or that reports itself unavailable, produces
//! [`ForecastOutcome::Unavailable`] rather than an error, so callers can
//! degrade to whatever backends the build ships with.

mod linear;
mod strategy;

pub use linear::LinearTrendForecaster;
pub use strategy::{Forecast, ForecastMetrics, ForecastStrategy};

use crate::error::{AnalyticsError, Result};
use crate::profiler::{TrendDirection, trend_direction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Placeholder for an optional backend that this build does not include.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    name: String,
}

impl UnavailableBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ForecastStrategy for UnavailableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        false
    }

    fn fit_predict(&self, _history: &[f64], _periods: usize) -> Result<Forecast> {
        Err(AnalyticsError::InvalidConfig(format!(
            "forecast backend '{}' is not available in this build",
            self.name
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Forecast(Forecast),
    Unavailable { strategy: String, reason: String },
    InsufficientData { strategy: String, observations: usize },
}

impl ForecastOutcome {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            Self::Forecast(forecast) => Some(forecast),
            _ => None,
        }
    }
}

/// Named forecasting strategies.
pub struct ModelRegistry {
    strategies: BTreeMap<String, Arc<dyn ForecastStrategy>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ModelRegistry {
    /// The linear trend forecaster plus placeholders for the optional
    /// `prophet` and `arima` backends.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(LinearTrendForecaster);
        registry.register(UnavailableBackend::new("prophet"));
        registry.register(UnavailableBackend::new("arima"));
        registry
    }
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Add or replace a strategy under its own name.
    pub fn register(&mut self, strategy: impl ForecastStrategy + 'static) -> &mut Self {
        self.strategies
            .insert(strategy.name().to_string(), Arc::new(strategy));
        self
    }

    /// Names of the strategies that can run.
    pub fn available(&self) -> Vec<&str> {
        self.strategies
            .values()
            .filter(|s| s.is_available())
            .map(|s| s.name())
            .collect()
    }

    /// Forecast `periods` values after `history` with the named strategy.
    ///
    /// # Errors
    ///
    /// Only errors raised by an available strategy's own fit are returned.
    pub fn forecast(&self, name: &str, history: &[f64], periods: usize) -> Result<ForecastOutcome> {
        let Some(strategy) = self.strategies.get(name) else {
            warn!("Forecast strategy '{}' is not registered", name);
            return Ok(ForecastOutcome::Unavailable {
                strategy: name.to_string(),
                reason: "not registered".to_string(),
            });
        };
        if !strategy.is_available() {
            warn!("Forecast strategy '{}' is not available", name);
            return Ok(ForecastOutcome::Unavailable {
                strategy: name.to_string(),
                reason: "backend not available in this build".to_string(),
            });
        }
        if history.len() < strategy.min_history() {
            warn!(
                "Forecast with '{}' skipped: {} observations",
                name,
                history.len()
            );
            return Ok(ForecastOutcome::InsufficientData {
                strategy: name.to_string(),
                observations: history.len(),
            });
        }

        let forecast = strategy.fit_predict(history, periods)?;
        info!(
            "Forecast '{}': {} periods, RMSE {:.4}",
            name, periods, forecast.metrics.rmse
        );
        Ok(ForecastOutcome::Forecast(forecast))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: String,
    pub category: String,
    pub recommendation: String,
    pub expected_impact: String,
    pub implementation: String,
}

/// Trend-based recommendation for `metric` from its values in row order.
///
/// Flat and too-short series get the growth recommendation.
pub fn recommend(values: &[f64], metric: &str) -> Recommendation {
    let text = match trend_direction(values) {
        TrendDirection::Decreasing => {
            format!("Implement intervention strategies to reverse declining trend in {metric}")
        }
        TrendDirection::Increasing => {
            format!("Maintain current policies to sustain positive trend in {metric}")
        }
        TrendDirection::Stable | TrendDirection::InsufficientData => {
            format!("Explore opportunities to accelerate growth in {metric}")
        }
    };
    Recommendation {
        priority: "High".to_string(),
        category: "Trend Optimization".to_string(),
        recommendation: text,
        expected_impact: "Medium to High".to_string(),
        implementation: "Short-term".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = ModelRegistry::default();
        assert_eq!(registry.available(), vec!["linear_trend"]);

        let outcome = registry.forecast("linear_trend", &[1.0, 2.0, 3.0], 2).unwrap();
        let forecast = outcome.forecast().unwrap();
        assert!((forecast.predictions[1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_and_unknown_strategies() {
        let registry = ModelRegistry::default();

        let prophet = registry.forecast("prophet", &[1.0, 2.0, 3.0], 2).unwrap();
        assert!(matches!(
            prophet,
            ForecastOutcome::Unavailable { ref strategy, .. } if strategy == "prophet"
        ));

        let unknown = registry.forecast("lstm", &[1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(
            unknown,
            ForecastOutcome::Unavailable {
                strategy: "lstm".to_string(),
                reason: "not registered".to_string(),
            }
        );
    }

    #[test]
    fn test_short_history_is_an_outcome() {
        let outcome = ModelRegistry::default()
            .forecast("linear_trend", &[4.0], 3)
            .unwrap();
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientData {
                strategy: "linear_trend".to_string(),
                observations: 1,
            }
        );
    }

    #[test]
    fn test_recommendation_text_follows_trend() {
        assert_eq!(
            recommend(&[5.0, 4.0, 2.0], "revenue").recommendation,
            "Implement intervention strategies to reverse declining trend in revenue"
        );
        assert_eq!(
            recommend(&[1.0, 2.0, 4.0], "revenue").recommendation,
            "Maintain current policies to sustain positive trend in revenue"
        );
        assert_eq!(
            recommend(&[3.0, 3.0, 3.0], "revenue").recommendation,
            "Explore opportunities to accelerate growth in revenue"
        );
        assert_eq!(
            recommend(&[3.0], "revenue").recommendation,
            "Explore opportunities to accelerate growth in revenue"
        );
    }
}
