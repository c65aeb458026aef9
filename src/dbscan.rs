// Density-based clustering (DBSCAN) with an explicit breadth-first worklist.

use std::collections::VecDeque;

use log::{debug, trace};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::data::validate_matrix;
use crate::distance::euclidean_distance;
use crate::error::{MultivariateError, Result};

/// Label assigned to points not reachable from any core point.
pub const NOISE: i64 = -1;

/// Configuration for [`dbscan`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DbscanConfig {
    /// Neighborhood radius. Points at distance `<= eps` are neighbors.
    pub eps: f64,
    /// Minimum neighborhood size (the point itself included) for a core point.
    pub min_points: usize,
}

impl DbscanConfig {
    pub fn new(eps: f64, min_points: usize) -> Self {
        DbscanConfig { eps, min_points }
    }
}

impl Default for DbscanConfig {
    fn default() -> Self {
        DbscanConfig {
            eps: 0.5,
            min_points: 5,
        }
    }
}

/// Outcome of a DBSCAN run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbscanResult {
    /// Cluster id (>= 0, in creation order) or [`NOISE`] for each input row.
    pub labels: Vec<i64>,
    /// Number of clusters found.
    pub n_clusters: usize,
    /// Indices of core points, ascending.
    pub core_sample_indices: Vec<usize>,
}

impl DbscanResult {
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PointLabel {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// Brute-force eps-neighborhood of `idx`, including `idx` itself.
fn region_query(data: &ArrayView2<f64>, idx: usize, eps: f64) -> Vec<usize> {
    let point = data.row(idx);
    data.outer_iter()
        .enumerate()
        .filter(|(_, other)| euclidean_distance(&point, other) <= eps)
        .map(|(i, _)| i)
        .collect()
}

/// Clusters the rows of `data` by density.
///
/// Points are visited in index order. An unvisited point with fewer than
/// `min_points` neighbors is provisionally marked as noise; otherwise it opens a
/// new cluster that is grown breadth-first. Every dequeued point recomputes its
/// neighborhood, and only core points spread the cluster id to neighbors that
/// are unvisited or noise. A point that already belongs to a cluster is never
/// relabeled, while noise can still be absorbed later in the run.
///
/// Neighborhood queries are O(n) each, so a run is O(n^2) distance evaluations.
///
/// # Errors
/// `EmptyData` / `NonFiniteValue` for malformed data and `InvalidParameter`
/// when `eps` is not a positive finite number. A neighborhood always contains
/// the point itself, so `min_points` of 0 behaves like 1.
pub fn dbscan(data: &ArrayView2<f64>, config: &DbscanConfig) -> Result<DbscanResult> {
    validate_matrix(data)?;
    if !(config.eps.is_finite() && config.eps > 0.0) {
        return Err(MultivariateError::invalid_parameter(
            "eps",
            format!("must be positive and finite, got {}", config.eps),
        ));
    }

    let n_samples = data.nrows();
    let mut labels = vec![PointLabel::Unvisited; n_samples];
    let mut is_core = vec![false; n_samples];
    let mut next_cluster = 0usize;
    let mut queue = VecDeque::new();

    for start in 0..n_samples {
        if labels[start] != PointLabel::Unvisited {
            continue;
        }
        let neighbors = region_query(data, start, config.eps);
        if neighbors.len() < config.min_points {
            labels[start] = PointLabel::Noise;
            continue;
        }

        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[start] = PointLabel::Cluster(cluster_id);
        queue.push_back(start);
        let mut cluster_size = 1usize;

        while let Some(current) = queue.pop_front() {
            let current_neighbors = region_query(data, current, config.eps);
            if current_neighbors.len() < config.min_points {
                continue;
            }
            is_core[current] = true;
            for neighbor in current_neighbors {
                match labels[neighbor] {
                    PointLabel::Unvisited => {
                        labels[neighbor] = PointLabel::Cluster(cluster_id);
                        queue.push_back(neighbor);
                        cluster_size += 1;
                    }
                    PointLabel::Noise => {
                        labels[neighbor] = PointLabel::Cluster(cluster_id);
                        cluster_size += 1;
                    }
                    PointLabel::Cluster(_) => {}
                }
            }
        }
        trace!("DBSCAN cluster {} grown to {} points.", cluster_id, cluster_size);
    }

    let labels: Vec<i64> = labels
        .into_iter()
        .map(|label| match label {
            PointLabel::Cluster(id) => id as i64,
            PointLabel::Noise | PointLabel::Unvisited => NOISE,
        })
        .collect();
    let core_sample_indices: Vec<usize> = is_core
        .iter()
        .enumerate()
        .filter_map(|(i, &core)| core.then_some(i))
        .collect();

    let result = DbscanResult {
        labels,
        n_clusters: next_cluster,
        core_sample_indices,
    };
    debug!(
        "DBSCAN (eps={}, min_points={}) found {} clusters and {} noise points among {} samples.",
        config.eps,
        config.min_points,
        result.n_clusters,
        result.noise_count(),
        n_samples
    );
    Ok(result)
}
