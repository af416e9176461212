//! The end-to-end analysis pipeline and its builder.

use super::progress::{AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
use super::{AnalysisReport, SegmentationReport};
use crate::anomaly::{AnomalyReport, IsolationForest, ZScoreDetector};
use crate::cleaner::CleaningPipeline;
use crate::config::{AnalyticsConfig, ConfigValidationError};
use crate::error::{AnalyticsError, Result, ResultExt};
use crate::insights::{EngineOutputs, InsightRanker, MIN_NUMERIC_COLUMNS};
use crate::profiler::{DatasetSummary, StatisticalProfiler, TypeInferencer};
use crate::segmentation::{Dbscan, KMeans};
use crate::significance;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs type inference, cleaning, the four engines and the insight ranker
/// over one table.
///
/// # Example
///
/// ```rust,ignore
/// use fiscal_analytics::{AnalysisPipeline, AnalyticsConfig};
///
/// let report = AnalysisPipeline::builder()
///     .config(AnalyticsConfig::builder().cluster_k(4).build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run(&raw)?;
///
/// for insight in &report.insights.insights {
///     println!("{}. {}", insight.rank, insight.title);
/// }
/// ```
pub struct AnalysisPipeline {
    config: AnalyticsConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(AnalysisPipeline: Send, Sync);

impl AnalysisPipeline {
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::default()
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Analyze `raw`. The caller's table is not modified.
    ///
    /// # Errors
    ///
    /// Only structural problems with the input fail the run:
    /// [`AnalyticsError::NoColumns`] and [`AnalyticsError::EmptyTable`].
    /// An engine that errors is left out of the report with a warning.
    pub fn run(&self, raw: &DataFrame) -> Result<AnalysisReport> {
        match self.run_internal(raw) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Analysis complete: {} insights",
                    report.insights.total_insights
                )));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Analysis failed: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage(&self, stage: AnalysisStage, done: bool, message: impl Into<String>) {
        self.report_progress(ProgressUpdate::new(stage, if done { 1.0 } else { 0.0 }, message));
    }

    fn run_internal(&self, raw: &DataFrame) -> Result<AnalysisReport> {
        let start = Instant::now();
        self.stage(AnalysisStage::Initializing, false, "Starting analysis...");

        if raw.width() == 0 {
            return Err(AnalyticsError::NoColumns);
        }
        if raw.height() == 0 {
            return Err(AnalyticsError::EmptyTable);
        }

        // Step 1: raw types and shape
        self.stage(AnalysisStage::TypeInference, false, "Inferring column types...");
        let raw_types = TypeInferencer::from_config(&self.config)
            .infer(raw)
            .context("type inference")?;
        let raw_summary = DatasetSummary::from_table(raw, &raw_types)?;
        self.stage(
            AnalysisStage::TypeInference,
            true,
            format!("Inferred types for {} columns", raw_types.len()),
        );

        // Step 2: cleaning
        self.stage(AnalysisStage::Cleaning, false, "Cleaning data...");
        let cleaning = CleaningPipeline::new(self.config.clone()).clean(raw)?;
        let clean = &cleaning.table;
        let types = &cleaning.semantic_types;
        self.stage(
            AnalysisStage::Cleaning,
            true,
            format!("Cleaning wrote {} log entries", cleaning.log.len()),
        );

        let numeric: Vec<String> = types
            .numeric_columns()
            .into_iter()
            .filter(|c| clean.column(c).is_ok())
            .collect();
        let ranker = InsightRanker::new(self.config.clone());
        let features = ranker.feature_columns(&numeric);
        let multivariate = numeric.len() >= MIN_NUMERIC_COLUMNS;
        debug!("Numeric columns: {:?}, features: {:?}", numeric, features);

        // Step 3: profile
        self.stage(AnalysisStage::Profiling, false, "Profiling columns...");
        let profile = StatisticalProfiler::from_config(&self.config).profile(clean, types)?;
        self.stage(AnalysisStage::Profiling, true, "Profiling complete");

        // Step 4: segmentation
        self.stage(AnalysisStage::Segmentation, false, "Clustering rows...");
        let segmentation = if multivariate {
            Some(SegmentationReport {
                kmeans: skip_on_error(
                    "k-means",
                    KMeans::from_config(&self.config).fit(clean, &features),
                ),
                dbscan: skip_on_error(
                    "DBSCAN",
                    Dbscan::from_config(&self.config).fit(clean, &features),
                ),
            })
        } else {
            debug!("Segmentation skipped: {} numeric columns", numeric.len());
            None
        };
        self.stage(AnalysisStage::Segmentation, true, "Segmentation complete");

        // Step 5: anomalies
        self.stage(AnalysisStage::AnomalyDetection, false, "Scoring anomalies...");
        let anomalies = AnomalyReport {
            isolation: if multivariate {
                skip_on_error(
                    "isolation forest",
                    IsolationForest::from_config(&self.config).detect(clean, &features),
                )
            } else {
                None
            },
            zscore: if numeric.is_empty() {
                None
            } else {
                skip_on_error(
                    "z-score",
                    ZScoreDetector::from_config(&self.config).detect(clean, &numeric),
                )
            },
        };
        self.stage(AnalysisStage::AnomalyDetection, true, "Anomaly scoring complete");

        // Step 6: significance
        self.stage(AnalysisStage::Significance, false, "Running significance tests...");
        let significance =
            skip_on_error("significance", significance::analyze(clean, &numeric));
        self.stage(AnalysisStage::Significance, true, "Significance tests complete");

        // Step 7: insights
        self.stage(AnalysisStage::InsightRanking, false, "Ranking insights...");
        let insights = ranker.rank(EngineOutputs {
            profile: &profile,
            numeric_columns: &numeric,
            segmentation: segmentation.as_ref().and_then(|s| s.kmeans.as_ref()),
            anomalies: anomalies.isolation.as_ref(),
            correlation: significance.as_ref().and_then(|s| s.correlation.as_ref()),
        });
        self.stage(
            AnalysisStage::InsightRanking,
            true,
            format!("Ranked {} insights", insights.total_insights),
        );

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Analysis finished in {} ms", duration_ms);

        Ok(AnalysisReport {
            raw_summary,
            cleaning_log: cleaning.log.clone(),
            cleaning: cleaning.report(),
            semantic_types: cleaning.semantic_types.clone(),
            profile,
            segmentation,
            anomalies,
            significance,
            insights,
            duration_ms,
            clean_table: cleaning.table,
        })
    }
}

fn skip_on_error<T>(engine: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Engine '{}' skipped: {}", engine, e);
            None
        }
    }
}

/// Builder for [`AnalysisPipeline`].
#[derive(Default)]
pub struct AnalysisPipelineBuilder {
    config: Option<AnalyticsConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl AnalysisPipelineBuilder {
    pub fn config(mut self, config: AnalyticsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Report progress to a closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<AnalysisPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(AnalysisPipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InsightCategory;
    use polars::prelude::*;
    use std::sync::Mutex;

    fn fiscal_table() -> DataFrame {
        df![
            "Revenue ($)" => ["100", "120", "95", "130", "110", "400", "105", "125", "n/a", "115"],
            "Spend" => [80.0, 90.0, 70.0, 100.0, 85.0, 320.0, 82.0, 95.0, 88.0, 90.0],
            "Region" => ["N", "S", "N", "S", "N", "E", "N", "S", "N", "S"],
        ]
        .unwrap()
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = AnalyticsConfig::default();
        config.cluster_k = 0;
        assert!(AnalysisPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_run_reports_every_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let pipeline = AnalysisPipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let raw = fiscal_table();
        let report = pipeline.run(&raw).unwrap();

        let seen = stages.lock().unwrap();
        assert_eq!(seen.first(), Some(&AnalysisStage::Initializing));
        assert_eq!(seen.last(), Some(&AnalysisStage::Complete));
        assert!(seen.contains(&AnalysisStage::Significance));

        assert_eq!(raw.get_column_names()[0].as_str(), "Revenue ($)");
        assert!(report.clean_table.column("revenue_$").is_ok());
        assert!(report.segmentation.as_ref().unwrap().kmeans.is_some());
        assert!(report.anomalies.isolation.is_some());
        assert!(report.anomalies.zscore.is_some());
        assert!(
            report
                .insights
                .insights
                .iter()
                .any(|i| i.category == InsightCategory::Segmentation)
        );
    }

    #[test]
    fn test_structural_errors_fail_the_run() {
        let failed = Arc::new(Mutex::new(false));
        let flag = failed.clone();
        let pipeline = AnalysisPipeline::builder()
            .on_progress(move |update| {
                if update.stage == AnalysisStage::Failed {
                    *flag.lock().unwrap() = true;
                }
            })
            .build()
            .unwrap();

        let empty = DataFrame::new(vec![Series::new_empty("a".into(), &DataType::Float64).into()])
            .unwrap();
        let err = pipeline.run(&empty).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_TABLE");
        assert!(*failed.lock().unwrap());

        let err = pipeline.run(&DataFrame::empty()).unwrap_err();
        assert_eq!(err.error_code(), "NO_COLUMNS");
    }

    #[test]
    fn test_single_numeric_column_skips_multivariate_engines() {
        let raw = df![
            "revenue" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "region" => ["N", "S", "N", "S", "E"],
        ]
        .unwrap();
        let report = AnalysisPipeline::builder().build().unwrap().run(&raw).unwrap();

        assert!(report.segmentation.is_none());
        assert!(report.anomalies.isolation.is_none());
        assert_eq!(report.anomalies.zscore.as_ref().unwrap().len(), 1);
        let significance = report.significance.unwrap();
        assert_eq!(significance.normality.len(), 1);
        assert!(significance.correlation.is_none());
    }

    #[test]
    fn test_zscore_flags_outlier_in_single_numeric_column() {
        let mut revenue: Vec<f64> = (0..19).map(|i| 10.0 + i as f64 * 0.1).collect();
        revenue.push(100.0);
        let region: Vec<&str> = (0..20).map(|i| if i % 2 == 0 { "N" } else { "S" }).collect();
        let raw = df!["revenue" => revenue, "region" => region].unwrap();

        let report = AnalysisPipeline::builder().build().unwrap().run(&raw).unwrap();

        assert!(report.anomalies.isolation.is_none());
        let zscore = report.anomalies.zscore.unwrap();
        assert_eq!(zscore.len(), 1);
        assert_eq!(zscore[0].column, "revenue");
        assert_eq!(zscore[0].rows, vec![19]);
        assert_eq!(zscore[0].anomaly_values, vec![100.0]);
    }
}
