//! Hypothesis tests over a clean table.
//!
//! Every test uses a fixed significance level of [`ALPHA`]. Samples that are
//! too small produce an insufficient-data result instead of an error.

mod correlation;
mod normality;

pub use correlation::{
    CorrelationOutcome, CorrelationTest, correlation_p_value, correlation_significance,
    interpret_correlation, test_pair,
};
pub use self::normality::{
    ALPHA, NormalityResult, NormalityTest, SHAPIRO_MAX_SAMPLE, test_normality,
};

use crate::error::{AnalyticsError, Result};
use crate::utils::{column_f64, is_numeric_dtype, present};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Normality of every numeric column plus the correlation test of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceReport {
    pub normality: Vec<NormalityResult>,
    /// Present when at least two numeric columns were available.
    pub correlation: Option<CorrelationOutcome>,
}

/// Run a normality test on each listed column.
pub fn normality_tests(df: &DataFrame, columns: &[String]) -> Result<Vec<NormalityResult>> {
    let results = columns
        .iter()
        .map(|name| {
            let column = df
                .column(name)
                .map_err(|_| AnalyticsError::ColumnNotFound(name.clone()))?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(AnalyticsError::NotNumeric(name.clone()));
            }
            Ok(test_normality(name, &present(&column_f64(df, name)?)))
        })
        .collect::<Result<Vec<_>>>()?;

    let normal = results.iter().filter(|r| r.is_normal).count();
    info!(
        "Normality: {} of {} columns look normal (alpha {})",
        normal,
        results.len(),
        ALPHA
    );
    Ok(results)
}

/// Normality for every column in `numeric`, correlation for its first two.
pub fn analyze(df: &DataFrame, numeric: &[String]) -> Result<SignificanceReport> {
    let normality = normality_tests(df, numeric)?;
    let correlation = match numeric {
        [first, second, ..] => Some(correlation_significance(df, first, second)?),
        _ => None,
    };
    Ok(SignificanceReport {
        normality,
        correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_analyze_first_pair() {
        let df = df![
            "revenue" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            "spend" => [2.1, 3.9, 6.2, 8.1, 9.8, 12.2, 13.9, 16.1],
            "headcount" => [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0],
        ]
        .unwrap();
        let numeric = vec![
            "revenue".to_string(),
            "spend".to_string(),
            "headcount".to_string(),
        ];

        let report = analyze(&df, &numeric).unwrap();

        assert_eq!(report.normality.len(), 3);
        let test = report.correlation.as_ref().and_then(|c| c.test()).unwrap();
        assert_eq!(test.first, "revenue");
        assert_eq!(test.second, "spend");
        assert_eq!(test.interpretation, "strong positive correlation");
    }

    #[test]
    fn test_single_column_has_no_correlation() {
        let df = df!["revenue" => [1.0, 2.0, 3.0, 4.0]].unwrap();
        let report = analyze(&df, &["revenue".to_string()]).unwrap();
        assert!(report.correlation.is_none());
    }
}
