//! Progress reporting for the analysis pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use fiscal_analytics::AnalysisPipeline;
//!
//! let report = AnalysisPipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of an analysis run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Initializing,
    /// Semantic types and shape of the raw table
    TypeInference,
    /// Name normalization, coercion, deduplication, missing values
    Cleaning,
    Profiling,
    /// k-means and DBSCAN
    Segmentation,
    /// Isolation forest and per-column z-scores
    AnomalyDetection,
    /// Normality and correlation tests
    Significance,
    InsightRanking,
    Complete,
    Failed,
}

impl AnalysisStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::TypeInference => "Inferring Types",
            Self::Cleaning => "Cleaning Data",
            Self::Profiling => "Profiling Columns",
            Self::Segmentation => "Segmenting Rows",
            Self::AnomalyDetection => "Detecting Anomalies",
            Self::Significance => "Testing Significance",
            Self::InsightRanking => "Ranking Insights",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage. Working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::TypeInference => 0.08,
            Self::Cleaning => 0.20,
            Self::Profiling => 0.15,
            Self::Segmentation => 0.15,
            Self::AnomalyDetection => 0.15,
            Self::Significance => 0.15,
            Self::InsightRanking => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Overall progress when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::TypeInference => 0.02,
            Self::Cleaning => 0.10,
            Self::Profiling => 0.30,
            Self::Segmentation => 0.45,
            Self::AnomalyDetection => 0.60,
            Self::Significance => 0.75,
            Self::InsightRanking => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: AnalysisStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        let progress = stage.base_progress() + stage.weight() * stage_progress;
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline can be run on a
/// worker thread while the updates are consumed elsewhere.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage. Keep it cheap.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WORKING_STAGES: [AnalysisStage; 8] = [
        AnalysisStage::Initializing,
        AnalysisStage::TypeInference,
        AnalysisStage::Cleaning,
        AnalysisStage::Profiling,
        AnalysisStage::Segmentation,
        AnalysisStage::AnomalyDetection,
        AnalysisStage::Significance,
        AnalysisStage::InsightRanking,
    ];

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = WORKING_STAGES.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0f32;
        for stage in WORKING_STAGES {
            assert!(
                (stage.base_progress() - expected).abs() < 1e-4,
                "{:?} starts at {}",
                stage,
                stage.base_progress()
            );
            expected += stage.weight();
        }
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(AnalysisStage::Cleaning, 0.5, "Cleaning...");
        assert_eq!(update.stage, AnalysisStage::Cleaning);
        assert!((update.progress - 0.20).abs() < 1e-6);
        assert_eq!(update.stage_progress, 0.5);

        let clamped = ProgressUpdate::new(AnalysisStage::InsightRanking, 3.0, "");
        assert_eq!(clamped.stage_progress, 1.0);
        assert!((clamped.progress - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&AnalysisStage::AnomalyDetection).unwrap();
        assert_eq!(json, "\"anomaly_detection\"");
        assert_eq!(AnalysisStage::Significance.display_name(), "Testing Significance");
    }

    #[test]
    fn test_closure_reporter_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let worker = reporter.clone();
        std::thread::spawn(move || {
            worker.report(ProgressUpdate::new(AnalysisStage::Profiling, 0.0, "start"));
        })
        .join()
        .unwrap();
        reporter.report(ProgressUpdate::complete("done"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
