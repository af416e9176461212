//! Pairwise Pearson correlation over numeric columns.

use crate::utils::column_f64;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum number of paired observations for a coefficient to be reported.
pub const MIN_PAIRED_OBSERVATIONS: usize = 3;

/// |r| above which a pair counts as strongly correlated.
pub const STRONG_CORRELATION: f64 = 0.7;

/// One unordered column pair and its coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

/// Symmetric correlation matrix with an exact unit diagonal.
///
/// Pairs without enough paired observations, or where one side is constant,
/// have no coefficient.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Compute the matrix using pairwise-complete observations.
    pub fn compute(df: &DataFrame, columns: &[String]) -> PolarsResult<Self> {
        let data: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|c| column_f64(df, c))
            .collect::<PolarsResult<_>>()?;

        let k = columns.len();
        let mut values = vec![vec![None; k]; k];

        for i in 0..k {
            values[i][i] = Some(1.0);
            for j in (i + 1)..k {
                let (x, y) = paired(&data[i], &data[j]);
                let r = if x.len() >= MIN_PAIRED_OBSERVATIONS {
                    pearson(&x, &y)
                } else {
                    None
                };
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            values,
        })
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// All defined off-diagonal pairs, upper triangle in column order.
    pub fn pairs(&self) -> Vec<CorrelationPair> {
        let mut out = Vec::new();
        for i in 0..self.columns.len() {
            for j in (i + 1)..self.columns.len() {
                if let Some(r) = self.values[i][j] {
                    out.push(CorrelationPair {
                        first: self.columns[i].clone(),
                        second: self.columns[j].clone(),
                        coefficient: r,
                    });
                }
            }
        }
        out
    }

    /// Pairs with |r| strictly above `threshold`.
    pub fn strong_pairs(&self, threshold: f64) -> Vec<CorrelationPair> {
        self.pairs()
            .into_iter()
            .filter(|p| p.coefficient.abs() > threshold)
            .collect()
    }

    /// The pair with the largest |r| that is still below 1.0.
    ///
    /// Perfectly (anti-)correlated pairs are usually duplicated measures and are skipped.
    /// Ties keep the first pair in column order.
    pub fn strongest_below_one(&self) -> Option<CorrelationPair> {
        let mut best: Option<CorrelationPair> = None;
        for pair in self.pairs() {
            if pair.coefficient.abs() >= 1.0 {
                continue;
            }
            let stronger = best
                .as_ref()
                .is_none_or(|b| pair.coefficient.abs() > b.coefficient.abs());
            if stronger {
                best = Some(pair);
            }
        }
        best
    }
}

/// Values where both sides are present.
pub fn paired(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip()
}

/// Pearson correlation coefficient, clamped to [-1, 1].
///
/// `None` for fewer than two pairs or when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [2.0, 4.1, 5.9, 8.2, 9.9],
            "c" => [5.0, 3.0, 4.0, 1.0, 2.0],
        ]
        .unwrap();
        let cols = names(&["a", "b", "c"]);
        let matrix = CorrelationMatrix::compute(&df, &cols).unwrap();

        for x in &cols {
            assert_eq!(matrix.get(x, x), Some(1.0));
            for y in &cols {
                assert_eq!(matrix.get(x, y), matrix.get(y, x));
            }
        }
        assert!(matrix.get("a", "b").unwrap() > 0.99);
        assert!(matrix.get("a", "c").unwrap() < -0.7);
    }

    #[test]
    fn test_pairwise_complete_and_constant_columns() {
        let df = df![
            "a" => [Some(1.0), Some(2.0), None, Some(4.0)],
            "b" => [Some(1.0), Some(2.0), Some(3.0), None],
            "flat" => [Some(7.0), Some(7.0), Some(7.0), Some(7.0)],
        ]
        .unwrap();
        let matrix = CorrelationMatrix::compute(&df, &names(&["a", "b", "flat"])).unwrap();

        // Only two complete pairs for (a, b)
        assert_eq!(matrix.get("a", "b"), None);
        assert_eq!(matrix.get("a", "flat"), None);
        assert_eq!(matrix.get("flat", "flat"), Some(1.0));
    }

    #[test]
    fn test_strong_pairs_and_strongest_below_one() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "dup" => [2.0, 4.0, 6.0, 8.0, 10.0],
            "b" => [1.2, 1.9, 3.2, 3.8, 5.1],
            "c" => [3.0, 1.0, 4.0, 1.0, 5.0],
        ]
        .unwrap();
        let matrix = CorrelationMatrix::compute(&df, &names(&["a", "dup", "b", "c"])).unwrap();

        let strong = matrix.strong_pairs(STRONG_CORRELATION);
        assert!(strong.iter().any(|p| p.first == "a" && p.second == "dup"));

        let best = matrix.strongest_below_one().unwrap();
        assert!(best.coefficient.abs() < 1.0);
        assert!(best.coefficient > 0.95);
        assert!(best.first == "a" || best.first == "dup");
        assert_eq!(best.second, "b");
    }

    #[test]
    fn test_pearson_edge_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }
}
