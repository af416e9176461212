//! Fiscal Analytics Library
//!
//! Cleaning, profiling and insight mining for tabular fiscal datasets, built
//! on Polars.
//!
//! # Overview
//!
//! Data flows strictly forward through seven components:
//!
//! - **Type inference**: Numeric, Temporal, Categorical or Unknown per column, without a schema
//! - **Cleaning**: name normalization, type coercion, deduplication and missing-value resolution,
//!   with an audit log of every mutation
//! - **Profiling**: moments, distribution shape, outliers and Pearson correlations
//! - **Segmentation**: seeded k-means and DBSCAN over standardized features
//! - **Anomaly detection**: isolation forest and per-column z-scores, reported side by side
//! - **Significance**: normality tests and correlation p-values
//! - **Insight ranking**: a deterministic, rule-ordered list of findings
//!
//! Feature engineering and capability-checked forecasting strategies sit next
//! to the core for callers that want them.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fiscal_analytics::{AnalysisPipeline, AnalyticsConfig};
//! use polars::prelude::*;
//!
//! let raw = CsvReadOptions::default()
//!     .try_into_reader_with_file_path(Some("budget.csv".into()))?
//!     .finish()?;
//!
//! let report = AnalysisPipeline::builder()
//!     .config(AnalyticsConfig::builder().top_n_insights(5).build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&raw)?;
//!
//! for insight in &report.insights.insights {
//!     println!("{}. [{}] {}", insight.rank, insight.category.display_name(), insight.description);
//! }
//! ```
//!
//! # Using the components directly
//!
//! ```rust,ignore
//! use fiscal_analytics::{AnalyticsConfig, CleaningPipeline, KMeans, StatisticalProfiler};
//!
//! let config = AnalyticsConfig::default();
//! let outcome = CleaningPipeline::new(config.clone()).clean(&raw)?;
//! let profile = StatisticalProfiler::from_config(&config)
//!     .profile(&outcome.table, &outcome.semantic_types)?;
//! let segments = KMeans::from_config(&config)
//!     .fit(&outcome.table, &outcome.semantic_types.numeric_columns())?;
//! ```

pub mod anomaly;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod insights;
pub mod models;
pub mod pipeline;
pub mod profiler;
pub mod segmentation;
pub mod significance;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use anomaly::{AnomalyReport, ColumnAnomalies, IsolationForest, IsolationResult, ZScoreDetector};
pub use cleaner::{CleaningOutcome, CleaningPipeline, CleaningReport};
pub use config::{
    AnalyticsConfig, AnalyticsConfigBuilder, CleaningStages, ConfigValidationError,
    MissingStrategy, OutlierMethod,
};
pub use error::{AnalyticsError, Result as AnalyticsResult, ResultExt};
pub use features::FeatureEngineer;
pub use imputers::StatisticalImputer;
pub use insights::{EngineOutputs, InsightRanker, InsightSummary};
pub use models::{
    Forecast, ForecastOutcome, ForecastStrategy, LinearTrendForecaster, ModelRegistry,
    UnavailableBackend, recommend,
};
pub use pipeline::{
    AnalysisPipeline, AnalysisPipelineBuilder, AnalysisReport, AnalysisStage,
    ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
pub use profiler::{
    CorrelationMatrix, DatasetProfile, DatasetSummary, StatisticalProfiler, TypeInferencer,
};
pub use segmentation::{Dbscan, DbscanResult, KMeans, KMeansResult};
pub use significance::{CorrelationOutcome, NormalityResult, SignificanceReport};
pub use types::{
    CleaningLogEntry, CleaningOp, ColumnProfile, ColumnTypes, DistributionClass, Insight,
    InsightCategory, SemanticType, Severity,
};

// The engines read the clean table without mutating it and may be run from
// several threads at once.
static_assertions::assert_impl_all!(CleaningPipeline: Send, Sync);
static_assertions::assert_impl_all!(StatisticalProfiler: Send, Sync);
static_assertions::assert_impl_all!(KMeans: Send, Sync);
static_assertions::assert_impl_all!(Dbscan: Send, Sync);
static_assertions::assert_impl_all!(IsolationForest: Send, Sync);
static_assertions::assert_impl_all!(ZScoreDetector: Send, Sync);
static_assertions::assert_impl_all!(InsightRanker: Send, Sync);
static_assertions::assert_impl_all!(ModelRegistry: Send, Sync);
static_assertions::assert_impl_all!(KMeansResult: Send, Sync);
static_assertions::assert_impl_all!(IsolationResult: Send, Sync);
static_assertions::assert_impl_all!(SignificanceReport: Send, Sync);
