//! Normality tests.
//!
//! Shapiro-Wilk for samples of 4 to 4999 values, Lilliefors (Kolmogorov-Smirnov
//! with estimated mean and variance) from 5000 values on. Both come from the
//! `normality` crate.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Significance level for every test in this module.
pub const ALPHA: f64 = 0.05;

/// Samples at or above this size use Lilliefors.
pub const SHAPIRO_MAX_SAMPLE: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTest {
    ShapiroWilk,
    Lilliefors,
    /// Too few values, or no spread to test.
    InsufficientData,
}

impl NormalityTest {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ShapiroWilk => "Shapiro-Wilk",
            Self::Lilliefors => "Lilliefors (KS)",
            Self::InsufficientData => "Insufficient data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityResult {
    pub column: String,
    pub sample_size: usize,
    pub test: NormalityTest,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// `p_value > ALPHA`; false when the test could not run.
    pub is_normal: bool,
}

/// Test the non-missing values of one column.
pub fn test_normality(column: &str, values: &[f64]) -> NormalityResult {
    let n = values.len();
    let outcome = if n <= 3 || is_constant(values) {
        None
    } else if n < SHAPIRO_MAX_SAMPLE {
        let result = ::normality::shapiro_wilk(values.to_vec()).map(|r| (r.statistic, r.p_value));
        run(column, NormalityTest::ShapiroWilk, result)
    } else {
        let result = ::normality::lilliefors(values.to_vec()).map(|r| (r.statistic, r.p_value));
        run(column, NormalityTest::Lilliefors, result)
    };

    match outcome {
        Some((test, statistic, p_value)) => NormalityResult {
            column: column.to_string(),
            sample_size: n,
            test,
            statistic: Some(statistic),
            p_value: Some(p_value),
            is_normal: p_value > ALPHA,
        },
        None => NormalityResult {
            column: column.to_string(),
            sample_size: n,
            test: NormalityTest::InsufficientData,
            statistic: None,
            p_value: None,
            is_normal: false,
        },
    }
}

fn run<E: std::fmt::Debug>(
    column: &str,
    test: NormalityTest,
    result: Result<(f64, f64), E>,
) -> Option<(NormalityTest, f64, f64)> {
    match result {
        Ok((statistic, p_value)) if statistic.is_finite() && p_value.is_finite() => {
            Some((test, statistic, p_value.clamp(0.0, 1.0)))
        }
        Ok(_) => {
            debug!("{} on '{}' returned a non-finite result", test.display_name(), column);
            None
        }
        Err(e) => {
            debug!("{} on '{}' failed: {:?}", test.display_name(), column, e);
            None
        }
    }
}

fn is_constant(values: &[f64]) -> bool {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    max - min <= f64::EPSILON * max.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{ContinuousCDF, Normal};

    fn normal_like(n: usize) -> Vec<f64> {
        let standard = Normal::new(0.0, 1.0).unwrap();
        (1..=n)
            .map(|i| standard.inverse_cdf(i as f64 / (n as f64 + 1.0)))
            .collect()
    }

    #[test]
    fn test_shapiro_wilk_accepts_normal_quantiles() {
        let result = test_normality("revenue", &normal_like(50));

        assert_eq!(result.test, NormalityTest::ShapiroWilk);
        assert!(result.statistic.unwrap() > 0.98);
        assert!(result.is_normal);
    }

    #[test]
    fn test_shapiro_wilk_rejects_exponential_growth() {
        let values: Vec<f64> = (0..40).map(|i| 1.3f64.powi(i)).collect();
        let result = test_normality("revenue", &values);

        assert_eq!(result.test, NormalityTest::ShapiroWilk);
        assert!(result.p_value.unwrap() < ALPHA);
        assert!(!result.is_normal);
    }

    #[test]
    fn test_small_and_constant_samples_are_insufficient() {
        let small = test_normality("x", &[1.0, 2.0, 3.0]);
        assert_eq!(small.test, NormalityTest::InsufficientData);
        assert_eq!(small.p_value, None);
        assert!(!small.is_normal);

        let constant = test_normality("x", &[4.0; 10]);
        assert_eq!(constant.test, NormalityTest::InsufficientData);
    }

    #[test]
    fn test_large_samples_use_lilliefors() {
        let result = test_normality("x", &normal_like(SHAPIRO_MAX_SAMPLE));

        assert_eq!(result.test, NormalityTest::Lilliefors);
        assert!(result.statistic.unwrap() < 0.01);
        assert!(result.is_normal);
    }

    #[test]
    fn test_test_choice_switches_at_sample_limit() {
        let below = test_normality("x", &normal_like(SHAPIRO_MAX_SAMPLE - 1));
        assert_eq!(below.test, NormalityTest::ShapiroWilk);
        assert_eq!(below.sample_size, SHAPIRO_MAX_SAMPLE - 1);
    }
}
