//! The individual insight rules.
//!
//! Each rule is gated by its own precondition and returns `None` when it has
//! nothing to say. Ranks are assigned later by the ranker.

use crate::anomaly::IsolationResult;
use crate::profiler::DatasetProfile;
use crate::segmentation::KMeansResult;
use crate::significance::CorrelationOutcome;
use crate::types::{Insight, InsightCategory, Severity};
use serde::Serialize;
use serde_json::{Value, json};

/// Aggregate missing fraction above which the data quality rule fires.
pub const MISSING_DATA_THRESHOLD: f64 = 0.10;

/// |skewness| above which a column is called out.
pub const SKEW_THRESHOLD: f64 = 1.0;

/// |r| above which the strongest pair is called out.
pub const CORRELATION_THRESHOLD: f64 = 0.8;

/// Numeric columns needed by the multivariate rules.
pub const MIN_NUMERIC_COLUMNS: usize = 2;

fn insight(
    category: InsightCategory,
    severity: Severity,
    title: impl Into<String>,
    description: String,
    impact: &str,
    evidence: Value,
) -> Insight {
    Insight {
        rank: 0,
        category,
        severity,
        title: title.into(),
        description,
        impact: impact.to_string(),
        evidence,
    }
}

fn evidence<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

pub(crate) fn missing_data(profile: &DatasetProfile) -> Option<Insight> {
    if profile.missing_fraction <= MISSING_DATA_THRESHOLD {
        return None;
    }
    let percentage = profile.missing_fraction * 100.0;
    Some(insight(
        InsightCategory::DataQuality,
        Severity::High,
        "Significant Missing Data",
        format!(
            "Dataset has {percentage:.1}% missing values, indicating potential data collection gaps"
        ),
        "High - affects reliability of analysis",
        json!({ "missing_percentage": percentage }),
    ))
}

/// Skewness flags for the first `limit` profiled numeric columns, in column order.
pub(crate) fn skewness(profile: &DatasetProfile, limit: usize) -> Vec<Insight> {
    profile
        .columns
        .iter()
        .take(limit)
        .filter(|c| c.skewness.abs() > SKEW_THRESHOLD)
        .map(|c| {
            insight(
                InsightCategory::Distribution,
                Severity::Medium,
                format!("Skewed Distribution in {}", c.name),
                format!(
                    "{} shows significant skewness ({:.2}), indicating non-normal distribution",
                    c.name, c.skewness
                ),
                "Medium - may require transformation for modeling",
                json!({
                    "column": c.name,
                    "skewness": c.skewness,
                    "distribution": c.distribution.display_name(),
                }),
            )
        })
        .collect()
}

pub(crate) fn strongest_correlation(profile: &DatasetProfile) -> Option<Insight> {
    let pair = profile.correlations.strongest_below_one()?;
    if pair.coefficient.abs() <= CORRELATION_THRESHOLD {
        return None;
    }
    Some(insight(
        InsightCategory::Relationships,
        Severity::High,
        "Strong Correlation Detected",
        format!(
            "Strong correlation ({:.2}) between {} and {}",
            pair.coefficient, pair.first, pair.second
        ),
        "High - potential multicollinearity or causal relationship",
        evidence(&pair),
    ))
}

pub(crate) fn segmentation(result: &KMeansResult) -> Insight {
    insight(
        InsightCategory::Segmentation,
        Severity::Medium,
        "Natural Data Segments Identified",
        format!(
            "K-Means clustering revealed {} distinct segments in the data",
            result.k
        ),
        "Enables targeted fiscal policies for different segments",
        evidence(&result.clusters),
    )
}

pub(crate) fn anomalies(result: &IsolationResult) -> Insight {
    insight(
        InsightCategory::AnomalyDetection,
        Severity::High,
        "Anomalous Patterns Detected",
        format!(
            "Identified {} anomalous data points ({:.1}%)",
            result.n_anomalies, result.anomaly_percentage
        ),
        "Highlights potential errors, fraud, or exceptional events requiring investigation",
        json!({
            "anomaly_count": result.n_anomalies,
            "percentage": result.anomaly_percentage,
        }),
    )
}

pub(crate) fn correlation_significance(outcome: &CorrelationOutcome) -> Option<Insight> {
    let test = outcome.test()?;
    Some(insight(
        InsightCategory::Relationships,
        Severity::Medium,
        "Statistically Significant Relationships",
        format!("Found {} between key variables", test.interpretation),
        "Reveals causal or predictive relationships for better decision-making",
        evidence(test),
    ))
}
