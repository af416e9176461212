//! Pearson correlation with a two-sided Student-t significance test.

use super::normality::ALPHA;
use crate::error::{AnalyticsError, Result};
use crate::profiler::{MIN_PAIRED_OBSERVATIONS, paired, pearson};
use crate::utils::{column_f64, is_numeric_dtype};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTest {
    pub first: String,
    pub second: String,
    /// Rows where both columns have a value.
    pub paired_observations: usize,
    pub correlation_coefficient: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    Tested(CorrelationTest),
    /// Fewer than three paired observations, or a column without spread.
    InsufficientData {
        first: String,
        second: String,
        paired_observations: usize,
    },
}

impl CorrelationOutcome {
    pub fn test(&self) -> Option<&CorrelationTest> {
        match self {
            Self::Tested(test) => Some(test),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Test the correlation between two numeric columns of `df`.
///
/// # Errors
///
/// [`AnalyticsError::ColumnNotFound`] or [`AnalyticsError::NotNumeric`] for
/// an unusable column. Too little data is an outcome, not an error.
pub fn correlation_significance(
    df: &DataFrame,
    first: &str,
    second: &str,
) -> Result<CorrelationOutcome> {
    for name in [first, second] {
        let column = df
            .column(name)
            .map_err(|_| AnalyticsError::ColumnNotFound(name.to_string()))?;
        if !is_numeric_dtype(column.dtype()) {
            return Err(AnalyticsError::NotNumeric(name.to_string()));
        }
    }
    let (x, y) = paired(&column_f64(df, first)?, &column_f64(df, second)?);
    Ok(test_pair(first, second, &x, &y))
}

/// Test already-paired observations.
pub fn test_pair(first: &str, second: &str, x: &[f64], y: &[f64]) -> CorrelationOutcome {
    let n = x.len().min(y.len());
    let insufficient = || CorrelationOutcome::InsufficientData {
        first: first.to_string(),
        second: second.to_string(),
        paired_observations: n,
    };

    if n < MIN_PAIRED_OBSERVATIONS {
        warn!(
            "Correlation test '{}' vs '{}' skipped: {} paired observations",
            first, second, n
        );
        return insufficient();
    }
    let Some(r) = pearson(&x[..n], &y[..n]) else {
        warn!(
            "Correlation test '{}' vs '{}' skipped: a column has no spread",
            first, second
        );
        return insufficient();
    };
    let Some(p_value) = correlation_p_value(r, n) else {
        return insufficient();
    };
    debug!("Correlation '{}' vs '{}': r={:.4}, p={:.4}", first, second, r, p_value);

    CorrelationOutcome::Tested(CorrelationTest {
        first: first.to_string(),
        second: second.to_string(),
        paired_observations: n,
        correlation_coefficient: r,
        p_value,
        is_significant: p_value < ALPHA,
        interpretation: interpret_correlation(r, p_value),
    })
}

/// Two-sided p-value of `r` over `n` pairs, `t = r * sqrt((n - 2) / (1 - r^2))`.
pub fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < MIN_PAIRED_OBSERVATIONS {
        return None;
    }
    if r.abs() >= 1.0 {
        return Some(0.0);
    }
    let dof = (n - 2) as f64;
    let t = r * (dof / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, dof).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Plain-language reading of a correlation; insignificant results get no
/// strength or direction.
pub fn interpret_correlation(r: f64, p_value: f64) -> String {
    if p_value >= ALPHA {
        return "Not statistically significant".to_string();
    }
    let strength = match r.abs() {
        s if s < 0.3 => "weak",
        s if s < 0.7 => "moderate",
        _ => "strong",
    };
    let direction = if r > 0.0 { "positive" } else { "negative" };
    format!("{strength} {direction} correlation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_interpretation_labels() {
        assert_eq!(interpret_correlation(0.95, 0.001), "strong positive correlation");
        assert_eq!(interpret_correlation(-0.5, 0.01), "moderate negative correlation");
        assert_eq!(interpret_correlation(0.2, 0.04), "weak positive correlation");
    }

    #[test]
    fn test_insignificant_overrides_strength() {
        assert_eq!(interpret_correlation(0.99, 0.05), "Not statistically significant");
        assert_eq!(interpret_correlation(-0.9, 0.2), "Not statistically significant");
    }

    #[test]
    fn test_strong_correlation_with_few_points_is_not_significant() {
        // r = 0.76 over three pairs has p of about 0.45.
        let outcome = test_pair("a", "b", &[1.0, 2.0, 3.0], &[1.0, 3.0, 2.6]);
        let test = outcome.test().unwrap();

        assert!(test.correlation_coefficient > 0.7);
        assert!(test.p_value >= ALPHA);
        assert!(!test.is_significant);
        assert_eq!(test.interpretation, "Not statistically significant");
    }

    #[test]
    fn test_p_value_matches_reference() {
        // r = 0.5, n = 20: t = 2.449, two-sided p = 0.0248
        let p = correlation_p_value(0.5, 20).unwrap();
        assert!((p - 0.0248).abs() < 5e-4);
        assert_eq!(correlation_p_value(1.0, 5), Some(0.0));
        assert_eq!(correlation_p_value(-1.0, 5), Some(0.0));
    }

    #[test]
    fn test_insufficient_pairs() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), None],
            "b" => [Some(2.0), Some(4.0), None, Some(1.0)],
        ]
        .unwrap();
        let outcome = correlation_significance(&df, "a", "b").unwrap();

        assert_eq!(
            outcome,
            CorrelationOutcome::InsufficientData {
                first: "a".to_string(),
                second: "b".to_string(),
                paired_observations: 1,
            }
        );
    }

    #[test]
    fn test_unknown_column() {
        let df = df!["a" => [1.0, 2.0, 3.0]].unwrap();
        let err = correlation_significance(&df, "a", "zzz").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
