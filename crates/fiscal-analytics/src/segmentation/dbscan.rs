//! Density-based clustering.

use super::{FeatureMatrix, squared_distance};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbscanResult {
    pub n_clusters: usize,
    pub n_noise_points: usize,
    /// Noise share of the clustered rows, 0-100.
    pub noise_percentage: f64,
    /// (table row, cluster id); `None` marks noise.
    pub labels: Vec<(usize, Option<usize>)>,
}

impl DbscanResult {
    pub fn noise_rows(&self) -> Vec<usize> {
        self.labels
            .iter()
            .filter(|(_, label)| label.is_none())
            .map(|(row, _)| *row)
            .collect()
    }
}

/// DBSCAN over standardized features.
///
/// A point is a core point when at least `min_samples` points, itself
/// included, lie within `eps`. Clusters are numbered in the order their first
/// core point appears; a border point joins the first cluster that reaches it.
#[derive(Debug, Clone)]
pub struct Dbscan {
    eps: f64,
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.dbscan_eps, config.dbscan_min_samples)
    }

    pub fn fit(&self, df: &DataFrame, columns: &[String]) -> Result<DbscanResult> {
        if self.eps.is_nan() || self.eps <= 0.0 || self.min_samples == 0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "DBSCAN needs eps > 0 and min_samples >= 1 (got eps={}, min_samples={})",
                self.eps, self.min_samples
            )));
        }
        let matrix = FeatureMatrix::from_table(df, columns)?;
        let points = matrix.standardized();
        let labels = self.cluster(&points);

        let n_clusters = labels.iter().flatten().max().map_or(0, |m| m + 1);
        let n_noise_points = labels.iter().filter(|l| l.is_none()).count();
        let noise_percentage = if labels.is_empty() {
            0.0
        } else {
            n_noise_points as f64 / labels.len() as f64 * 100.0
        };
        info!(
            "DBSCAN (eps={}, min_samples={}): {} clusters, {} noise points",
            self.eps, self.min_samples, n_clusters, n_noise_points
        );

        Ok(DbscanResult {
            n_clusters,
            n_noise_points,
            noise_percentage,
            labels: matrix.rows.iter().copied().zip(labels).collect(),
        })
    }

    fn cluster(&self, points: &[Vec<f64>]) -> Vec<Option<usize>> {
        let eps_sq = self.eps * self.eps;
        let neighbors: Vec<Vec<usize>> = points
            .iter()
            .map(|p| {
                points
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| squared_distance(p, q) <= eps_sq)
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighbors
            .iter()
            .map(|n| n.len() >= self.min_samples)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; points.len()];
        let mut next_cluster = 0;

        for start in 0..points.len() {
            if labels[start].is_some() || !is_core[start] {
                continue;
            }
            let cluster = next_cluster;
            next_cluster += 1;
            labels[start] = Some(cluster);

            let mut queue: VecDeque<usize> = VecDeque::from([start]);
            while let Some(point) = queue.pop_front() {
                if !is_core[point] {
                    continue;
                }
                for &neighbor in &neighbors[point] {
                    if labels[neighbor].is_none() {
                        labels[neighbor] = Some(cluster);
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        labels
    }
}
