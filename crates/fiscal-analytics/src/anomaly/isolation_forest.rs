//! Ensemble isolation detector.
//!
//! Each tree isolates a random subsample by recursive random splits; rows that
//! are isolated after few splits are unusual. The anomaly score of a row is
//! `2^(-E[h(x)] / c(psi))`, where `h` is the path length in a tree and `c` the
//! average path length of an unsuccessful search in a binary tree of `psi`
//! points. Scores near 1 are anomalous, scores well below 0.5 are normal.

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::segmentation::FeatureMatrix;
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score and flag of one table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub row: usize,
    pub score: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationResult {
    pub n_anomalies: usize,
    /// Flagged share of the scored rows, 0-100.
    pub anomaly_percentage: f64,
    /// One entry per complete row, in table order.
    pub scores: Vec<AnomalyScore>,
}

impl IsolationResult {
    pub fn anomaly_rows(&self) -> Vec<usize> {
        self.scores
            .iter()
            .filter(|s| s.is_anomaly)
            .map(|s| s.row)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    pub fn new(n_trees: usize, sample_size: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_trees,
            sample_size,
            contamination,
            seed,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(
            config.isolation_trees,
            config.isolation_sample_size,
            config.contamination,
            config.seed,
        )
    }

    /// Score the complete rows of `columns` and flag the
    /// `ceil(contamination * n)` highest scores.
    pub fn detect(&self, df: &DataFrame, columns: &[String]) -> Result<IsolationResult> {
        if self.n_trees == 0 || self.sample_size == 0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "isolation forest needs at least one tree and one sampled row (got {} trees, sample size {})",
                self.n_trees, self.sample_size
            )));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "contamination must be within (0, 0.5], got {}",
                self.contamination
            )));
        }

        let matrix = FeatureMatrix::from_table(df, columns)?;
        let n = matrix.len();
        if n == 0 {
            info!("Isolation forest skipped: no complete rows in {:?}", columns);
            return Ok(IsolationResult {
                n_anomalies: 0,
                anomaly_percentage: 0.0,
                scores: Vec::new(),
            });
        }

        let scores = self.score(&matrix.values);
        let flagged = flagged_rows(&scores, self.contamination);

        let n_anomalies = flagged.iter().filter(|f| **f).count();
        info!(
            "Isolation forest: {} of {} rows flagged ({} trees)",
            n_anomalies, n, self.n_trees
        );

        Ok(IsolationResult {
            n_anomalies,
            anomaly_percentage: n_anomalies as f64 / n as f64 * 100.0,
            scores: matrix
                .rows
                .iter()
                .zip(scores)
                .zip(flagged)
                .map(|((row, score), is_anomaly)| AnomalyScore {
                    row: *row,
                    score,
                    is_anomaly,
                })
                .collect(),
        })
    }

    fn score(&self, points: &[Vec<f64>]) -> Vec<f64> {
        let n = points.len();
        let psi = self.sample_size.min(n);
        let depth_limit = (psi as f64).log2().ceil() as usize;
        let normalizer = average_path_length(psi);
        debug!(
            "Isolation forest: subsample {}, depth limit {}",
            psi, depth_limit
        );

        let mut path_sums = vec![0.0; n];
        for t in 0..self.n_trees {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
            let subsample = sample(&mut rng, n, psi).into_vec();
            let tree = grow(points, subsample, 0, depth_limit, &mut rng);
            for (sum, point) in path_sums.iter_mut().zip(points) {
                *sum += tree.path_length(point);
            }
        }

        path_sums
            .into_iter()
            .map(|sum| {
                if normalizer > 0.0 {
                    let expected = sum / self.n_trees as f64;
                    2f64.powf(-expected / normalizer)
                } else {
                    0.5
                }
            })
            .collect()
    }
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] < *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow(
    points: &[Vec<f64>],
    members: Vec<usize>,
    depth: usize,
    depth_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= depth_limit || members.len() <= 1 {
        return Node::Leaf {
            size: members.len(),
        };
    }

    // Only features that still vary inside this node can split it.
    let dims = points[members[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..dims)
        .filter_map(|d| {
            let (lo, hi) = members.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
                (lo.min(points[m][d]), hi.max(points[m][d]))
            });
            (hi > lo).then_some((d, lo, hi))
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf {
            size: members.len(),
        };
    }

    let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) = members
        .into_iter()
        .partition(|&m| points[m][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(points, left, depth + 1, depth_limit, rng)),
        right: Box::new(grow(points, right, depth + 1, depth_limit, rng)),
    }
}

/// Average path length of an unsuccessful binary-search-tree lookup among `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Flag the `ceil(contamination * n)` highest scores; equal scores go to the
/// lower row first.
fn flagged_rows(scores: &[f64], contamination: f64) -> Vec<bool> {
    let n = scores.len();
    let quota = ((contamination * n as f64).ceil() as usize).min(n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let mut flagged = vec![false; n];
    for &idx in order.iter().take(quota) {
        flagged[idx] = true;
    }
    flagged
}
