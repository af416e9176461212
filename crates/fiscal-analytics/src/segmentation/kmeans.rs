//! Partitional clustering with seeded k-means++ and Lloyd iterations.

use super::{FeatureMatrix, squared_distance};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::utils::{mean, sample_std};
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Lloyd iterations per restart stop here even if assignments still move.
const MAX_ITERATIONS: usize = 300;

/// Mean and spread of one feature inside a cluster, in original units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub feature: String,
    pub mean: f64,
    /// Sample standard deviation; zero for a single-row cluster.
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: usize,
    pub size: usize,
    /// Share of the clustered rows, 0-100.
    pub percentage: f64,
    /// Per-feature centroid and dispersion.
    pub features: Vec<FeatureStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansResult {
    /// Number of non-empty clusters. At most the requested k, which is
    /// clamped to the row count; duplicate rows can leave clusters empty.
    pub k: usize,
    /// Sum of squared distances to the assigned centroid, standardized space.
    pub inertia: f64,
    /// (table row, cluster id) for every clustered row.
    pub assignments: Vec<(usize, usize)>,
    pub clusters: Vec<ClusterSummary>,
}

impl KMeansResult {
    /// Cluster id of a table row, `None` if the row was not clustered.
    pub fn cluster_of(&self, row: usize) -> Option<usize> {
        self.assignments
            .iter()
            .find(|(r, _)| *r == row)
            .map(|(_, cluster)| *cluster)
    }
}

/// K-means segmentation, deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    restarts: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, restarts: usize, seed: u64) -> Self {
        Self {
            k,
            restarts: restarts.max(1),
            seed,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.cluster_k, config.kmeans_restarts, config.seed)
    }

    /// Cluster the complete rows of `columns`.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidConfig`] for `k == 0`, and the column errors
    /// of [`FeatureMatrix::from_table`].
    pub fn fit(&self, df: &DataFrame, columns: &[String]) -> Result<KMeansResult> {
        if self.k == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "k-means needs at least one cluster".to_string(),
            ));
        }
        let matrix = FeatureMatrix::from_table(df, columns)?;
        if matrix.is_empty() {
            info!("K-means skipped: no complete rows in {:?}", columns);
            return Ok(KMeansResult {
                k: 0,
                inertia: 0.0,
                assignments: Vec::new(),
                clusters: Vec::new(),
            });
        }

        let k = self.k.min(matrix.len());
        let points = matrix.standardized();

        let mut best: Option<Run> = None;
        for restart in 0..self.restarts {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(restart as u64));
            let run = lloyd(&points, seed_centroids(&points, k, &mut rng));
            debug!(
                "K-means restart {}: inertia {:.4} after {} iterations",
                restart, run.inertia, run.iterations
            );
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        let Some(best) = best else {
            return Err(AnalyticsError::InvalidConfig(
                "k-means needs at least one restart".to_string(),
            ));
        };

        let (labels, fitted) = relabel_by_appearance(&best.labels, k);
        if fitted < k {
            debug!("K-means: {} of {} clusters ended up empty", k - fitted, k);
        }
        let clusters = summarize(&matrix, &labels, fitted);
        info!(
            "K-means: {} clusters over {} rows, inertia {:.4}",
            fitted,
            matrix.len(),
            best.inertia
        );

        Ok(KMeansResult {
            k: fitted,
            inertia: best.inertia,
            assignments: matrix.rows.iter().copied().zip(labels).collect(),
            clusters,
        })
    }
}

struct Run {
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn seed_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = points.len() - 1;
            for (idx, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = idx;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            // Every point already coincides with a centroid.
            rng.gen_range(0..points.len())
        };
        centroids.push(points[next].clone());
    }
    centroids
}

fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> Run {
    let mut labels = assign(points, &centroids);
    let mut iterations = 1;

    while iterations < MAX_ITERATIONS {
        centroids = update_centroids(points, &labels, &centroids);
        let next = assign(points, &centroids);
        iterations += 1;
        if next == labels {
            break;
        }
        labels = next;
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_distance(p, &centroids[l]))
        .sum();
    Run {
        labels,
        inertia,
        iterations,
    }
}

// Ties go to the lower centroid index.
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (idx, c) in centroids.iter().enumerate() {
                let dist = squared_distance(p, c);
                if dist < best_dist {
                    best = idx;
                    best_dist = dist;
                }
            }
            best
        })
        .collect()
}

// An emptied cluster keeps its previous centroid.
fn update_centroids(points: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (p, &l) in points.iter().zip(labels) {
        counts[l] += 1;
        for (s, v) in sums[l].iter_mut().zip(p) {
            *s += v;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

/// Renumber clusters in order of first appearance so ids do not depend on
/// which seed point happened to win. Empty clusters get no id; the second
/// value is the number of ids handed out.
fn relabel_by_appearance(labels: &[usize], k: usize) -> (Vec<usize>, usize) {
    let mut mapping: Vec<Option<usize>> = vec![None; k];
    let mut next = 0;
    let relabeled = labels
        .iter()
        .map(|&l| {
            *mapping[l].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect();
    (relabeled, next)
}

fn summarize(matrix: &FeatureMatrix, labels: &[usize], k: usize) -> Vec<ClusterSummary> {
    let total = matrix.len();
    (0..k)
        .map(|id| {
            let members: Vec<&Vec<f64>> = matrix
                .values
                .iter()
                .zip(labels)
                .filter(|(_, l)| **l == id)
                .map(|(v, _)| v)
                .collect();

            let features = matrix
                .features
                .iter()
                .enumerate()
                .map(|(d, feature)| {
                    let column: Vec<f64> = members.iter().map(|row| row[d]).collect();
                    FeatureStats {
                        feature: feature.clone(),
                        mean: mean(&column).unwrap_or(0.0),
                        std: sample_std(&column).unwrap_or(0.0),
                    }
                })
                .collect();

            ClusterSummary {
                id,
                size: members.len(),
                percentage: members.len() as f64 / total as f64 * 100.0,
                features,
            }
        })
        .collect()
}
