//! Descriptive statistics and outlier detection for numeric columns.

use crate::config::OutlierMethod;
use crate::types::{ColumnProfile, DistributionClass, OutlierSet};
use crate::utils::{mean, present, quantile_sorted, sample_std, sorted};

/// Bias-adjusted sample skewness (the estimator spreadsheet tools report).
///
/// Zero for fewer than three values or a constant column.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let (Some(m), Some(s)) = (mean(values), sample_std(values)) else {
        return 0.0;
    };
    if s == 0.0 {
        return 0.0;
    }

    let n = n as f64;
    let sum_cubed: f64 = values.iter().map(|v| ((v - m) / s).powi(3)).sum();
    n / ((n - 1.0) * (n - 2.0)) * sum_cubed
}

/// Bias-adjusted sample excess kurtosis.
///
/// Zero for fewer than four values or a constant column.
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 {
        return 0.0;
    }
    let (Some(m), Some(s)) = (mean(values), sample_std(values)) else {
        return 0.0;
    };
    if s == 0.0 {
        return 0.0;
    }

    let n = n as f64;
    let sum_fourth: f64 = values.iter().map(|v| ((v - m) / s).powi(4)).sum();
    let scale = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
    let correction = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    scale * sum_fourth - correction
}

/// Flag values outside `Q1 - 1.5*IQR` and `Q3 + 1.5*IQR`.
pub fn iqr_outliers(values: &[Option<f64>]) -> OutlierSet {
    let observed = sorted(&present(values));
    let bounds = quantile_sorted(&observed, 0.25)
        .zip(quantile_sorted(&observed, 0.75))
        .map(|(q1, q3)| {
            let iqr = q3 - q1;
            (q1 - 1.5 * iqr, q3 + 1.5 * iqr)
        });

    let mut set = collect_outliers(OutlierMethod::Iqr, values, |v| match bounds {
        Some((lower, upper)) => v < lower || v > upper,
        None => false,
    });
    if let Some((lower, upper)) = bounds {
        set.lower_bound = Some(lower);
        set.upper_bound = Some(upper);
    }
    set
}

/// Flag values whose absolute z-score exceeds `threshold`.
///
/// Uses the sample standard deviation; a constant column has no outliers.
pub fn zscore_outliers(values: &[Option<f64>], threshold: f64) -> OutlierSet {
    let observed = present(values);
    let centre = mean(&observed);
    let spread = sample_std(&observed).filter(|s| *s > 0.0);

    collect_outliers(OutlierMethod::Zscore, values, |v| match (centre, spread) {
        (Some(m), Some(s)) => ((v - m) / s).abs() > threshold,
        _ => false,
    })
}

/// Dispatch to the selected outlier method.
pub fn detect_outliers(values: &[Option<f64>], method: OutlierMethod, threshold: f64) -> OutlierSet {
    match method {
        OutlierMethod::Iqr => iqr_outliers(values),
        OutlierMethod::Zscore => zscore_outliers(values, threshold),
    }
}

fn collect_outliers(
    method: OutlierMethod,
    values: &[Option<f64>],
    is_outlier: impl Fn(f64) -> bool,
) -> OutlierSet {
    let mut indices = Vec::new();
    let mut flagged = Vec::new();
    let mut observed = 0usize;

    for (row, value) in values.iter().enumerate() {
        let Some(v) = value else { continue };
        observed += 1;
        if is_outlier(*v) {
            indices.push(row);
            flagged.push(*v);
        }
    }

    let percentage = if observed == 0 {
        0.0
    } else {
        flagged.len() as f64 / observed as f64 * 100.0
    };

    OutlierSet {
        method,
        lower_bound: None,
        upper_bound: None,
        indices,
        values: flagged,
        percentage,
    }
}

/// Build the profile of one numeric column. `None` when it has no values.
pub fn profile_column(
    name: &str,
    values: &[Option<f64>],
    method: OutlierMethod,
    zscore_threshold: f64,
) -> Option<ColumnProfile> {
    let observed = present(values);
    let ordered = sorted(&observed);

    let mean = mean(&observed)?;
    let median = quantile_sorted(&ordered, 0.5)?;
    let skewness = skewness(&observed);
    let kurtosis = kurtosis(&observed);

    Some(ColumnProfile {
        name: name.to_string(),
        count: observed.len(),
        mean,
        median,
        std: sample_std(&observed).unwrap_or(0.0),
        skewness,
        kurtosis,
        min: ordered[0],
        max: ordered[ordered.len() - 1],
        q1: quantile_sorted(&ordered, 0.25)?,
        q3: quantile_sorted(&ordered, 0.75)?,
        distribution: DistributionClass::classify(skewness, kurtosis),
        outliers: detect_outliers(values, method, zscore_threshold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opt(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_iqr_flags_only_extreme_value() {
        let values = opt(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        let set = iqr_outliers(&values);

        assert_eq!(set.indices, vec![5]);
        assert_eq!(set.values, vec![100.0]);
        assert_eq!(set.lower_bound, Some(-1.5));
        assert_eq!(set.upper_bound, Some(8.5));
        assert!((set.percentage - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_iqr_indices_skip_missing_rows() {
        let values = vec![Some(1.0), None, Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0)];
        let set = iqr_outliers(&values);
        assert_eq!(set.indices, vec![6]);
    }

    #[test]
    fn test_zscore_threshold() {
        let mut raw = vec![10.0; 20];
        raw[3] = 11.0;
        raw.push(60.0);
        let values = opt(&raw);

        let strict = zscore_outliers(&values, 3.0);
        assert_eq!(strict.indices, vec![20]);

        let loose = zscore_outliers(&values, 10.0);
        assert!(loose.indices.is_empty());
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let values = opt(&[5.0, 5.0, 5.0, 5.0]);
        assert_eq!(zscore_outliers(&values, 3.0).count(), 0);
        assert_eq!(iqr_outliers(&values).count(), 0);
    }

    #[test]
    fn test_skewness_and_kurtosis() {
        let symmetric = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&symmetric).abs() < 1e-12);
        // Bias-adjusted excess kurtosis of 1..5 is -1.2
        assert!((kurtosis(&symmetric) + 1.2).abs() < 1e-9);

        let right = [1.0, 1.0, 1.0, 2.0, 10.0];
        assert!(skewness(&right) > 1.0);

        assert_eq!(skewness(&[1.0, 2.0]), 0.0);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_profile_column() {
        let values = vec![Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0), Some(100.0)];
        let profile = profile_column("spend", &values, OutlierMethod::Iqr, 3.0).unwrap();

        assert_eq!(profile.count, 6);
        assert_eq!(profile.median, 3.5);
        assert_eq!(profile.min, 1.0);
        assert_eq!(profile.max, 100.0);
        assert_eq!(profile.distribution, DistributionClass::RightSkewed);
        assert_eq!(profile.outliers.indices, vec![6]);
    }

    #[test]
    fn test_profile_column_without_values() {
        let values = vec![None, None];
        assert!(profile_column("empty", &values, OutlierMethod::Iqr, 3.0).is_none());
    }
}
