//! Pipeline module.
//!
//! [`AnalysisPipeline`] chains the components in their fixed order and
//! collects every result into one [`AnalysisReport`].

mod builder;
pub mod progress;

pub use builder::{AnalysisPipeline, AnalysisPipelineBuilder};
pub use progress::{AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};

use crate::anomaly::AnomalyReport;
use crate::cleaner::CleaningReport;
use crate::insights::InsightSummary;
use crate::profiler::{DatasetProfile, DatasetSummary};
use crate::segmentation::{DbscanResult, KMeansResult};
use crate::significance::SignificanceReport;
use crate::types::{CleaningLogEntry, ColumnTypes};
use polars::prelude::DataFrame;
use serde::Serialize;

/// Both clustering strategies over the same feature columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationReport {
    pub kmeans: Option<KMeansResult>,
    pub dbscan: Option<DbscanResult>,
}

/// Everything one analysis run produced.
///
/// Engines that had too few numeric columns, or that failed, are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// The input as loaded, before cleaning.
    pub raw_summary: DatasetSummary,
    pub cleaning_log: Vec<CleaningLogEntry>,
    pub cleaning: CleaningReport,
    pub semantic_types: ColumnTypes,
    pub profile: DatasetProfile,
    pub segmentation: Option<SegmentationReport>,
    pub anomalies: AnomalyReport,
    pub significance: Option<SignificanceReport>,
    pub insights: InsightSummary,
    pub duration_ms: u64,
    #[serde(skip)]
    pub clean_table: DataFrame,
}

static_assertions::assert_impl_all!(AnalysisReport: Send, Sync);
