//! Insight ranking.
//!
//! Turns the profiler, segmentation, anomaly and significance results into a
//! short ranked list of findings. The order is fixed by rule, not by score:
//!
//! 1. missing-data severity
//! 2. skewed distributions of the leading numeric columns
//! 3. the strongest correlation below 1.0
//! 4. k-means segments
//! 5. isolation-forest anomaly count
//! 6. correlation significance of the first two numeric columns
//!
//! Rules without enough data stay silent. The list is deduplicated, cut to
//! `top_n_insights`, and only then numbered.

mod rules;

pub use rules::{
    CORRELATION_THRESHOLD, MIN_NUMERIC_COLUMNS, MISSING_DATA_THRESHOLD, SKEW_THRESHOLD,
};

use crate::anomaly::{IsolationForest, IsolationResult};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::profiler::DatasetProfile;
use crate::segmentation::{KMeans, KMeansResult};
use crate::significance::{CorrelationOutcome, correlation_significance};
use crate::types::{ColumnTypes, Insight, InsightCategory};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Engine results the ranker reads. Missing entries silence their rule.
#[derive(Debug, Clone, Copy)]
pub struct EngineOutputs<'a> {
    pub profile: &'a DatasetProfile,
    /// Numeric columns of the clean table, in column order.
    pub numeric_columns: &'a [String],
    pub segmentation: Option<&'a KMeansResult>,
    pub anomalies: Option<&'a IsolationResult>,
    pub correlation: Option<&'a CorrelationOutcome>,
}

/// Ranks belonging to one category, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: InsightCategory,
    pub ranks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub total_insights: usize,
    /// Categories in order of first appearance.
    pub by_category: Vec<CategoryGroup>,
    pub insights: Vec<Insight>,
}

impl InsightSummary {
    pub fn from_insights(insights: Vec<Insight>) -> Self {
        let mut by_category: Vec<CategoryGroup> = Vec::new();
        for insight in &insights {
            match by_category.iter_mut().find(|g| g.category == insight.category) {
                Some(group) => group.ranks.push(insight.rank),
                None => by_category.push(CategoryGroup {
                    category: insight.category,
                    ranks: vec![insight.rank],
                }),
            }
        }
        Self {
            total_insights: insights.len(),
            by_category,
            insights,
        }
    }
}

/// Deterministic rule-ordered insight ranker.
#[derive(Debug, Clone)]
pub struct InsightRanker {
    config: AnalyticsConfig,
}

impl InsightRanker {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Columns the multivariate rules work on.
    pub fn feature_columns(&self, numeric_columns: &[String]) -> Vec<String> {
        numeric_columns
            .iter()
            .take(self.config.max_segmentation_features)
            .cloned()
            .collect()
    }

    /// Rank already computed engine results.
    pub fn rank(&self, outputs: EngineOutputs<'_>) -> InsightSummary {
        let mut candidates: Vec<Insight> = Vec::new();

        candidates.extend(rules::missing_data(outputs.profile));
        candidates.extend(rules::skewness(
            outputs.profile,
            self.config.max_skew_insights,
        ));
        candidates.extend(rules::strongest_correlation(outputs.profile));

        if outputs.numeric_columns.len() >= MIN_NUMERIC_COLUMNS {
            candidates.extend(outputs.segmentation.map(rules::segmentation));
            candidates.extend(outputs.anomalies.map(rules::anomalies));
            candidates.extend(
                outputs
                    .correlation
                    .and_then(rules::correlation_significance),
            );
        } else {
            debug!(
                "Multivariate insight rules skipped: {} numeric columns",
                outputs.numeric_columns.len()
            );
        }

        let ranked = self.finalize(candidates);
        info!("Ranked {} insights", ranked.len());
        InsightSummary::from_insights(ranked)
    }

    /// Run the engines the rules need on `df`, then rank.
    ///
    /// An engine error silences its rule with a warning; it never fails the ranking.
    pub fn mine(
        &self,
        df: &DataFrame,
        types: &ColumnTypes,
        profile: &DatasetProfile,
    ) -> InsightSummary {
        let numeric: Vec<String> = types
            .numeric_columns()
            .into_iter()
            .filter(|c| df.column(c).is_ok())
            .collect();
        let features = self.feature_columns(&numeric);

        let (segmentation, anomalies, correlation) = if numeric.len() >= MIN_NUMERIC_COLUMNS {
            (
                skip_on_error(
                    "segmentation",
                    KMeans::from_config(&self.config).fit(df, &features),
                ),
                skip_on_error(
                    "anomaly",
                    IsolationForest::from_config(&self.config).detect(df, &features),
                ),
                skip_on_error(
                    "correlation significance",
                    correlation_significance(df, &numeric[0], &numeric[1]),
                ),
            )
        } else {
            (None, None, None)
        };

        self.rank(EngineOutputs {
            profile,
            numeric_columns: &numeric,
            segmentation: segmentation.as_ref(),
            anomalies: anomalies.as_ref(),
            correlation: correlation.as_ref(),
        })
    }

    fn finalize(&self, candidates: Vec<Insight>) -> Vec<Insight> {
        let mut seen: HashSet<(InsightCategory, String, String)> = HashSet::new();
        let mut ranked: Vec<Insight> = candidates
            .into_iter()
            .filter(|i| seen.insert((i.category, i.title.clone(), i.description.clone())))
            .take(self.config.top_n_insights)
            .collect();
        for (idx, insight) in ranked.iter_mut().enumerate() {
            insight.rank = idx + 1;
        }
        ranked
    }
}

pub(crate) fn skip_on_error<T>(rule: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Insight rule '{}' skipped: {}", rule, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::{CorrelationMatrix, StatisticalProfiler};
    use crate::types::{SemanticType, Severity};
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn empty_profile(missing_fraction: f64) -> DatasetProfile {
        DatasetProfile {
            shape: (0, 0),
            columns: Vec::new(),
            categorical: Vec::new(),
            correlations: CorrelationMatrix::default(),
            missing_fraction,
            trends: Vec::new(),
            seasonality: None,
        }
    }

    fn profile_only(profile: &DatasetProfile) -> EngineOutputs<'_> {
        EngineOutputs {
            profile,
            numeric_columns: &[],
            segmentation: None,
            anomalies: None,
            correlation: None,
        }
    }

    fn numeric_types(names: &[&str]) -> ColumnTypes {
        let mut types = ColumnTypes::new();
        for name in names {
            types.insert(*name, SemanticType::Numeric);
        }
        types
    }

    #[test]
    fn test_missing_data_rule_gate() {
        let ranker = InsightRanker::new(AnalyticsConfig::default());

        let quiet = ranker.rank(profile_only(&empty_profile(0.10)));
        assert_eq!(quiet.total_insights, 0);

        let noisy = ranker.rank(profile_only(&empty_profile(0.125)));
        assert_eq!(noisy.total_insights, 1);
        let insight = &noisy.insights[0];
        assert_eq!(insight.rank, 1);
        assert_eq!(insight.category, InsightCategory::DataQuality);
        assert_eq!(insight.severity, Severity::High);
        assert_eq!(
            insight.description,
            "Dataset has 12.5% missing values, indicating potential data collection gaps"
        );
    }

    #[test]
    fn test_rule_order_and_truncation() {
        let df = df![
            "revenue" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
            "spend" => [1.1, 2.0, 3.2, 3.9, 5.1, 6.0, 6.8, 8.1, 9.0, 95.0],
            "headcount" => [1.0, 1.0, 1.0, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 30.0],
        ]
        .unwrap();
        let types = numeric_types(&["revenue", "spend", "headcount"]);
        let config = AnalyticsConfig::default();
        let profile = StatisticalProfiler::from_config(&config)
            .profile(&df, &types)
            .unwrap();

        let full = InsightRanker::new(config.clone()).mine(&df, &types, &profile);
        let categories: Vec<InsightCategory> =
            full.insights.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                InsightCategory::Distribution,
                InsightCategory::Distribution,
                InsightCategory::Distribution,
                InsightCategory::Relationships,
                InsightCategory::Segmentation,
                InsightCategory::AnomalyDetection,
                InsightCategory::Relationships,
            ]
        );
        assert_eq!(
            full.insights[4].description,
            "K-Means clustering revealed 3 distinct segments in the data"
        );
        assert_eq!(full.insights[5].description, "Identified 1 anomalous data points (10.0%)");
        assert_eq!(
            full.insights[6].description,
            "Found strong positive correlation between key variables"
        );
        assert_eq!(full.by_category[0].ranks, vec![1, 2, 3]);
        assert_eq!(full.by_category[1].category, InsightCategory::Relationships);
        assert_eq!(full.by_category[1].ranks, vec![4, 7]);

        let mut short = config;
        short.top_n_insights = 2;
        let truncated = InsightRanker::new(short).mine(&df, &types, &profile);
        assert_eq!(truncated.total_insights, 2);
        assert_eq!(truncated.insights[1].rank, 2);
        assert_eq!(truncated.insights[1].category, InsightCategory::Distribution);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let ranker = InsightRanker::new(AnalyticsConfig::default());
        let base = rules::segmentation(&KMeansResult {
            k: 2,
            inertia: 0.0,
            assignments: Vec::new(),
            clusters: Vec::new(),
        });
        let ranked = ranker.finalize(vec![base.clone(), base]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_engine_errors_silence_rules() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [4.0, 3.0, 1.0, 2.0],
        ]
        .unwrap();
        let types = numeric_types(&["a", "b"]);
        let profile = empty_profile(0.0);
        let mut config = AnalyticsConfig::default();
        config.contamination = 0.9;

        let summary = InsightRanker::new(config).mine(&df, &types, &profile);

        assert!(
            summary
                .insights
                .iter()
                .all(|i| i.category != InsightCategory::AnomalyDetection)
        );
        assert!(
            summary
                .insights
                .iter()
                .any(|i| i.category == InsightCategory::Segmentation)
        );
    }
}
