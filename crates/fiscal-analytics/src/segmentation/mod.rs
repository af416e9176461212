//! Segmentation of a clean table into clusters.
//!
//! Two strategies are available and never mixed in one call:
//! - [`KMeans`]: partitional clustering into `k` segments, seeded k-means++
//! - [`Dbscan`]: density-based clustering that leaves sparse rows as noise
//!
//! Both read the selected numeric columns, drop rows with a missing value in
//! any of them, and standardize each feature before fitting. Row indices in
//! the results refer to the table that was passed in.

mod dbscan;
mod kmeans;

pub use dbscan::{Dbscan, DbscanResult};
pub use kmeans::{ClusterSummary, FeatureStats, KMeans, KMeansResult};

use crate::error::{AnalyticsError, Result};
use crate::utils::{complete_rows, is_numeric_dtype, mean};
use polars::prelude::*;

/// Complete rows of a set of numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub features: Vec<String>,
    /// Table row index of each entry in `values`.
    pub rows: Vec<usize>,
    /// One feature vector per complete row, in `features` order.
    pub values: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Collect the rows of `df` that have a value in every listed column.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::ColumnNotFound`] or [`AnalyticsError::NotNumeric`]
    /// when a listed column cannot be used as a feature.
    pub fn from_table(df: &DataFrame, columns: &[String]) -> Result<Self> {
        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| AnalyticsError::ColumnNotFound(name.clone()))?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(AnalyticsError::NotNumeric(name.clone()));
            }
        }

        let (rows, values): (Vec<usize>, Vec<Vec<f64>>) = complete_rows(df, columns)?.into_iter().unzip();
        Ok(Self {
            features: columns.to_vec(),
            rows,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature vectors scaled to zero mean and unit variance.
    pub fn standardized(&self) -> Vec<Vec<f64>> {
        standardize(&self.values)
    }
}

/// Scale every feature to zero mean and unit (population) variance.
///
/// A constant feature carries no information and becomes all zeros.
pub fn standardize(values: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    let dims = first.len();

    let mut scales = Vec::with_capacity(dims);
    for d in 0..dims {
        let column: Vec<f64> = values.iter().map(|row| row[d]).collect();
        let centre = mean(&column).unwrap_or(0.0);
        let variance =
            column.iter().map(|v| (v - centre).powi(2)).sum::<f64>() / column.len() as f64;
        scales.push((centre, variance.sqrt()));
    }

    values
        .iter()
        .map(|row| {
            row.iter()
                .zip(&scales)
                .map(|(v, (centre, spread))| {
                    if *spread > 0.0 {
                        (v - centre) / spread
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
