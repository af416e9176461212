//! Configuration types for the analytics pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Every option has a default,
//! so a JSON document only needs to name the options it changes.

use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy for resolving missing values after high-missing columns are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingStrategy {
    /// Per-type defaults: numeric median, categorical mode, temporal forward fill.
    #[default]
    Auto,
    /// Drop every row that still has a missing value.
    Drop,
    /// Propagate the last valid value forward in every column.
    ForwardFill,
    /// Propagate the next valid value backward in every column.
    BackwardFill,
    /// Fill numeric columns with their mean.
    Mean,
    /// Fill numeric columns with their median.
    Median,
    /// Fill every column with its most frequent value.
    Mode,
}

impl MissingStrategy {
    const NAMES: &'static str = "auto, drop, forward_fill, backward_fill, mean, median, mode";

    /// Name used in configuration files and the cleaning log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Drop => "drop",
            Self::ForwardFill => "forward_fill",
            Self::BackwardFill => "backward_fill",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
        }
    }
}

impl FromStr for MissingStrategy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "drop" => Ok(Self::Drop),
            "forward_fill" | "ffill" => Ok(Self::ForwardFill),
            "backward_fill" | "bfill" => Ok(Self::BackwardFill),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "mode" => Ok(Self::Mode),
            _ => Err(AnalyticsError::UnknownStrategy {
                kind: "missing strategy",
                value: s.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

/// Method used to flag univariate outliers in the profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Values outside Q1 - 1.5*IQR and Q3 + 1.5*IQR
    #[default]
    Iqr,
    /// Values whose absolute z-score exceeds the configured threshold
    Zscore,
}

impl OutlierMethod {
    /// Name used in configuration files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iqr => "iqr",
            Self::Zscore => "zscore",
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" | "z_score" | "z-score" => Ok(Self::Zscore),
            _ => Err(AnalyticsError::UnknownStrategy {
                kind: "outlier method",
                value: s.to_string(),
                expected: "iqr, zscore",
            }),
        }
    }
}

/// Toggles for the four cleaning stages. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningStages {
    pub normalize_names: bool,
    pub coerce_types: bool,
    pub deduplicate: bool,
    pub resolve_missing: bool,
}

impl Default for CleaningStages {
    fn default() -> Self {
        Self {
            normalize_names: true,
            coerce_types: true,
            deduplicate: true,
            resolve_missing: true,
        }
    }
}

/// Configuration for the analytics pipeline.
///
/// Use [`AnalyticsConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use fiscal_analytics::config::{AnalyticsConfig, MissingStrategy};
///
/// let config = AnalyticsConfig::builder()
///     .missing_threshold(0.4)
///     .missing_strategy(MissingStrategy::Median)
///     .cluster_k(4)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// How missing values are resolved once high-missing columns are gone.
    /// Default: Auto
    pub missing_strategy: MissingStrategy,

    /// Columns whose missing fraction is strictly above this are dropped.
    /// Default: 0.5
    pub missing_threshold: f64,

    /// Outlier method used by the profiler.
    /// Default: Iqr
    pub outlier_method: OutlierMethod,

    /// Number of partitional clusters.
    /// Default: 3
    pub cluster_k: usize,

    /// Number of k-means restarts; the lowest-inertia run wins.
    /// Default: 10
    pub kmeans_restarts: usize,

    /// Neighborhood radius for density clustering (in standardized units).
    /// Default: 0.5
    pub dbscan_eps: f64,

    /// Minimum neighborhood size (including the point) for a core point.
    /// Default: 5
    pub dbscan_min_samples: usize,

    /// Expected fraction of anomalous rows for the isolation detector.
    /// Default: 0.1
    pub contamination: f64,

    /// Number of isolation trees.
    /// Default: 100
    pub isolation_trees: usize,

    /// Rows sampled per isolation tree.
    /// Default: 256
    pub isolation_sample_size: usize,

    /// Absolute z-score above which a value is flagged.
    /// Default: 3.0
    pub zscore_threshold: f64,

    /// Maximum number of extreme values kept per column in z-score reports.
    /// Default: 10
    pub zscore_sample_cap: usize,

    /// Maximum number of ranked insights returned.
    /// Default: 10
    pub top_n_insights: usize,

    /// Number of leading numeric columns checked by the skewness rule.
    /// Default: 3
    pub max_skew_insights: usize,

    /// Number of leading numeric columns used for segmentation and anomaly insights.
    /// Default: 5
    pub max_segmentation_features: usize,

    /// Number of non-missing values inspected when deciding if a column is numeric.
    /// Default: 100
    pub numeric_sample_size: usize,

    /// Fraction of non-missing values that must parse as dates for a column
    /// to be temporal without a date-like name.
    /// Default: 0.5
    pub temporal_parse_ratio: f64,

    /// Seed for every randomized engine.
    /// Default: 42
    pub seed: u64,

    /// Which cleaning stages run.
    pub stages: CleaningStages,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            missing_strategy: MissingStrategy::default(),
            missing_threshold: 0.5,
            outlier_method: OutlierMethod::default(),
            cluster_k: 3,
            kmeans_restarts: 10,
            dbscan_eps: 0.5,
            dbscan_min_samples: 5,
            contamination: 0.1,
            isolation_trees: 100,
            isolation_sample_size: 256,
            zscore_threshold: 3.0,
            zscore_sample_cap: 10,
            top_n_insights: 10,
            max_skew_insights: 3,
            max_segmentation_features: 5,
            numeric_sample_size: 100,
            temporal_parse_ratio: 0.5,
            seed: 42,
            stages: CleaningStages::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalyticsConfigBuilder {
        AnalyticsConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_unit_interval("missing_threshold", self.missing_threshold)?;
        check_unit_interval("temporal_parse_ratio", self.temporal_parse_ratio)?;

        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigValidationError::InvalidContamination(self.contamination));
        }

        for (field, value) in [
            ("cluster_k", self.cluster_k),
            ("kmeans_restarts", self.kmeans_restarts),
            ("dbscan_min_samples", self.dbscan_min_samples),
            ("isolation_trees", self.isolation_trees),
            ("isolation_sample_size", self.isolation_sample_size),
            ("top_n_insights", self.top_n_insights),
            ("numeric_sample_size", self.numeric_sample_size),
            ("max_segmentation_features", self.max_segmentation_features),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        for (field, value) in [
            ("dbscan_eps", self.dbscan_eps),
            ("zscore_threshold", self.zscore_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigValidationError::NonPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigValidationError::InvalidThreshold {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid contamination: {0} (must be in (0.0, 0.5])")]
    InvalidContamination(f64),

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroCount(String),

    #[error("Invalid value for '{field}': {value} (must be positive)")]
    NonPositive { field: String, value: f64 },
}

impl From<ConfigValidationError> for AnalyticsError {
    fn from(err: ConfigValidationError) -> Self {
        AnalyticsError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`AnalyticsConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalyticsConfigBuilder {
    missing_strategy: Option<MissingStrategy>,
    missing_threshold: Option<f64>,
    outlier_method: Option<OutlierMethod>,
    cluster_k: Option<usize>,
    kmeans_restarts: Option<usize>,
    dbscan_eps: Option<f64>,
    dbscan_min_samples: Option<usize>,
    contamination: Option<f64>,
    isolation_trees: Option<usize>,
    isolation_sample_size: Option<usize>,
    zscore_threshold: Option<f64>,
    zscore_sample_cap: Option<usize>,
    top_n_insights: Option<usize>,
    max_skew_insights: Option<usize>,
    max_segmentation_features: Option<usize>,
    numeric_sample_size: Option<usize>,
    temporal_parse_ratio: Option<f64>,
    seed: Option<u64>,
    stages: Option<CleaningStages>,
}

impl AnalyticsConfigBuilder {
    /// Set the missing-value strategy.
    pub fn missing_strategy(mut self, strategy: MissingStrategy) -> Self {
        self.missing_strategy = Some(strategy);
        self
    }

    /// Set the threshold for dropping columns with missing values.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = Some(threshold);
        self
    }

    /// Set the profiler's outlier method.
    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Set the number of k-means clusters.
    pub fn cluster_k(mut self, k: usize) -> Self {
        self.cluster_k = Some(k);
        self
    }

    /// Set the number of k-means restarts.
    pub fn kmeans_restarts(mut self, restarts: usize) -> Self {
        self.kmeans_restarts = Some(restarts);
        self
    }

    /// Set the DBSCAN neighborhood radius.
    pub fn dbscan_eps(mut self, eps: f64) -> Self {
        self.dbscan_eps = Some(eps);
        self
    }

    /// Set the DBSCAN minimum neighborhood size.
    pub fn dbscan_min_samples(mut self, min_samples: usize) -> Self {
        self.dbscan_min_samples = Some(min_samples);
        self
    }

    /// Set the expected anomaly fraction.
    pub fn contamination(mut self, contamination: f64) -> Self {
        self.contamination = Some(contamination);
        self
    }

    /// Set the number of isolation trees.
    pub fn isolation_trees(mut self, trees: usize) -> Self {
        self.isolation_trees = Some(trees);
        self
    }

    /// Set the number of rows sampled per isolation tree.
    pub fn isolation_sample_size(mut self, size: usize) -> Self {
        self.isolation_sample_size = Some(size);
        self
    }

    /// Set the z-score threshold.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = Some(threshold);
        self
    }

    /// Set how many extreme values a z-score report keeps per column.
    pub fn zscore_sample_cap(mut self, cap: usize) -> Self {
        self.zscore_sample_cap = Some(cap);
        self
    }

    /// Set the number of insights returned by the ranker.
    pub fn top_n_insights(mut self, n: usize) -> Self {
        self.top_n_insights = Some(n);
        self
    }

    /// Set how many leading numeric columns the skewness rule inspects.
    pub fn max_skew_insights(mut self, n: usize) -> Self {
        self.max_skew_insights = Some(n);
        self
    }

    /// Set how many leading numeric columns feed segmentation and anomaly insights.
    pub fn max_segmentation_features(mut self, n: usize) -> Self {
        self.max_segmentation_features = Some(n);
        self
    }

    /// Set the numeric inference sample size.
    pub fn numeric_sample_size(mut self, n: usize) -> Self {
        self.numeric_sample_size = Some(n);
        self
    }

    /// Set the fraction of values that must parse as dates.
    pub fn temporal_parse_ratio(mut self, ratio: f64) -> Self {
        self.temporal_parse_ratio = Some(ratio);
        self
    }

    /// Set the seed used by k-means and the isolation forest.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Choose which cleaning stages run.
    pub fn stages(mut self, stages: CleaningStages) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalyticsConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalyticsConfig, ConfigValidationError> {
        let defaults = AnalyticsConfig::default();
        let config = AnalyticsConfig {
            missing_strategy: self.missing_strategy.unwrap_or_default(),
            missing_threshold: self.missing_threshold.unwrap_or(defaults.missing_threshold),
            outlier_method: self.outlier_method.unwrap_or_default(),
            cluster_k: self.cluster_k.unwrap_or(defaults.cluster_k),
            kmeans_restarts: self.kmeans_restarts.unwrap_or(defaults.kmeans_restarts),
            dbscan_eps: self.dbscan_eps.unwrap_or(defaults.dbscan_eps),
            dbscan_min_samples: self
                .dbscan_min_samples
                .unwrap_or(defaults.dbscan_min_samples),
            contamination: self.contamination.unwrap_or(defaults.contamination),
            isolation_trees: self.isolation_trees.unwrap_or(defaults.isolation_trees),
            isolation_sample_size: self
                .isolation_sample_size
                .unwrap_or(defaults.isolation_sample_size),
            zscore_threshold: self.zscore_threshold.unwrap_or(defaults.zscore_threshold),
            zscore_sample_cap: self.zscore_sample_cap.unwrap_or(defaults.zscore_sample_cap),
            top_n_insights: self.top_n_insights.unwrap_or(defaults.top_n_insights),
            max_skew_insights: self.max_skew_insights.unwrap_or(defaults.max_skew_insights),
            max_segmentation_features: self
                .max_segmentation_features
                .unwrap_or(defaults.max_segmentation_features),
            numeric_sample_size: self
                .numeric_sample_size
                .unwrap_or(defaults.numeric_sample_size),
            temporal_parse_ratio: self
                .temporal_parse_ratio
                .unwrap_or(defaults.temporal_parse_ratio),
            seed: self.seed.unwrap_or(defaults.seed),
            stages: self.stages.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.missing_strategy, MissingStrategy::Auto);
        assert_eq!(config.missing_threshold, 0.5);
        assert_eq!(config.outlier_method, OutlierMethod::Iqr);
        assert_eq!(config.cluster_k, 3);
        assert_eq!(config.contamination, 0.1);
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.top_n_insights, 10);
        assert!(config.stages.normalize_names);
        assert!(config.stages.resolve_missing);
    }

    #[test]
    fn test_builder_defaults() {
        let config = AnalyticsConfig::builder().build().unwrap();
        assert_eq!(config.missing_threshold, 0.5);
        assert_eq!(config.dbscan_eps, 0.5);
        assert_eq!(config.dbscan_min_samples, 5);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AnalyticsConfig::builder()
            .missing_threshold(0.3)
            .missing_strategy(MissingStrategy::ForwardFill)
            .outlier_method(OutlierMethod::Zscore)
            .cluster_k(5)
            .contamination(0.05)
            .top_n_insights(4)
            .seed(7)
            .build()
            .unwrap();

        assert_eq!(config.missing_threshold, 0.3);
        assert_eq!(config.missing_strategy, MissingStrategy::ForwardFill);
        assert_eq!(config.outlier_method, OutlierMethod::Zscore);
        assert_eq!(config.cluster_k, 5);
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.top_n_insights, 4);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = AnalyticsConfig::builder().missing_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_zero_clusters() {
        let result = AnalyticsConfig::builder().cluster_k(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroCount(field) if field == "cluster_k"
        ));
    }

    #[test]
    fn test_validation_contamination_and_eps() {
        assert!(AnalyticsConfig::builder().contamination(0.0).build().is_err());
        assert!(AnalyticsConfig::builder().contamination(0.8).build().is_err());
        assert!(AnalyticsConfig::builder().dbscan_eps(-1.0).build().is_err());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("auto".parse::<MissingStrategy>().unwrap(), MissingStrategy::Auto);
        assert_eq!(
            "Forward_Fill".parse::<MissingStrategy>().unwrap(),
            MissingStrategy::ForwardFill
        );
        assert_eq!("zscore".parse::<OutlierMethod>().unwrap(), OutlierMethod::Zscore);

        let err = "interpolate".parse::<MissingStrategy>().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.error_code(), "UNKNOWN_STRATEGY");
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "missing_strategy": "backward_fill",
            "missing_threshold": 0.25,
            "outlier_method": "zscore",
            "dbscan_eps": 0.8,
            "stages": { "deduplicate": false }
        }"#;

        let config: AnalyticsConfig = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(config.missing_strategy, MissingStrategy::BackwardFill);
        assert_eq!(config.missing_threshold, 0.25);
        assert_eq!(config.outlier_method, OutlierMethod::Zscore);
        assert_eq!(config.dbscan_eps, 0.8);
        assert!(!config.stages.deduplicate);
        assert!(config.stages.coerce_types);
        assert_eq!(config.cluster_k, 3);
    }
}
