// K-means clustering with deterministic first-k-rows initialization.

use log::{debug, trace, warn};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::validate_matrix;
use crate::distance::{euclidean_distance, squared_euclidean_distance};
use crate::error::{MultivariateError, Result};

/// Configuration for [`kmeans`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters k. Must satisfy `1 <= k <= n_samples`.
    pub n_clusters: usize,
    /// Upper bound on assignment/update rounds. Reaching it is not an error.
    pub max_iterations: usize,
}

impl KMeansConfig {
    /// Config for `n_clusters` clusters with the default iteration cap.
    pub fn new(n_clusters: usize) -> Self {
        KMeansConfig {
            n_clusters,
            ..Default::default()
        }
    }
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            n_clusters: 2,
            max_iterations: 100,
        }
    }
}

/// Outcome of a K-means run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansResult {
    /// Cluster index in `[0, k)` for each input row, index-aligned with the data.
    pub labels: Vec<usize>,
    /// Final centroids. Shape: (k, n_features)
    pub centroids: Array2<f64>,
    /// Number of assignment rounds performed.
    pub iterations: usize,
    /// `true` if a round produced no membership change before the cap.
    pub converged: bool,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
}

impl KMeansResult {
    /// Number of points assigned to each cluster. Empty clusters report 0.
    /// Labels without a matching centroid row are not counted.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.nrows()];
        for &label in &self.labels {
            if let Some(size) = sizes.get_mut(label) {
                *size += 1;
            }
        }
        sizes
    }

    /// Assigns each row of `points` to its nearest final centroid, breaking
    /// ties toward the lowest cluster index.
    pub fn predict(&self, points: &ArrayView2<f64>) -> Result<Vec<usize>> {
        validate_matrix(points)?;
        if points.ncols() != self.centroids.ncols() {
            return Err(MultivariateError::DimensionMismatch {
                context: "k-means predict features",
                expected: self.centroids.ncols(),
                found: points.ncols(),
            });
        }
        Ok(points
            .outer_iter()
            .map(|row| nearest_centroid(&row, &self.centroids.view()))
            .collect())
    }
}

/// Working state of a single K-means invocation. Discarded when the call returns.
struct KMeansState {
    centroids: Array2<f64>,
    labels: Vec<Option<usize>>,
}

impl KMeansState {
    fn new(data: &ArrayView2<f64>, n_clusters: usize) -> Self {
        KMeansState {
            centroids: data.slice(s![..n_clusters, ..]).to_owned(),
            labels: vec![None; data.nrows()],
        }
    }

    /// Moves every point to its nearest centroid. Returns the number of points
    /// whose membership changed.
    fn assign(&mut self, data: &ArrayView2<f64>) -> usize {
        let mut changed = 0;
        for (label, row) in self.labels.iter_mut().zip(data.outer_iter()) {
            let best = nearest_centroid(&row, &self.centroids.view());
            if *label != Some(best) {
                *label = Some(best);
                changed += 1;
            }
        }
        changed
    }

    /// Recomputes each centroid as the mean of its members. A cluster with no
    /// members keeps its previous centroid.
    fn update(&mut self, data: &ArrayView2<f64>) {
        let n_clusters = self.centroids.nrows();
        let mut sums = Array2::<f64>::zeros(self.centroids.raw_dim());
        let mut counts = vec![0usize; n_clusters];
        for (label, row) in self.labels.iter().zip(data.outer_iter()) {
            if let Some(c) = *label {
                let mut sum = sums.row_mut(c);
                sum += &row;
                counts[c] += 1;
            }
        }
        for (c, (mut centroid, sum)) in self
            .centroids
            .axis_iter_mut(Axis(0))
            .zip(sums.axis_iter(Axis(0)))
            .enumerate()
        {
            if counts[c] == 0 {
                trace!("Cluster {} is empty; keeping its previous centroid.", c);
                continue;
            }
            let count = counts[c] as f64;
            centroid.assign(&sum.mapv(|v| v / count));
        }
    }

    fn into_result(self, data: &ArrayView2<f64>, iterations: usize, converged: bool) -> KMeansResult {
        let labels: Vec<usize> = self.labels.into_iter().map(|l| l.unwrap_or(0)).collect();
        let inertia = labels
            .iter()
            .zip(data.outer_iter())
            .map(|(&c, row)| squared_euclidean_distance(&row, &self.centroids.row(c)))
            .sum();
        KMeansResult {
            labels,
            centroids: self.centroids,
            iterations,
            converged,
            inertia,
        }
    }
}

fn nearest_centroid(point: &ArrayView1<f64>, centroids: &ArrayView2<f64>) -> usize {
    let mut best_cluster = 0;
    let mut best_distance = f64::INFINITY;
    for (c, centroid) in centroids.outer_iter().enumerate() {
        let distance = euclidean_distance(point, &centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = c;
        }
    }
    best_cluster
}

/// Partitions the rows of `data` into `config.n_clusters` clusters.
///
/// The first k rows seed the centroids, so identical input always yields
/// identical labels. Each round assigns every point to its nearest centroid
/// (ties go to the lowest index) and stops as soon as no membership changes;
/// otherwise centroids move to the mean of their members. A cluster that loses
/// all its members keeps its stale centroid and is never reseeded, which can
/// leave it empty for the rest of the run. Duplicate rows among the first k can
/// produce such clusters.
///
/// # Errors
/// `EmptyData` / `NonFiniteValue` for malformed data, `InvalidParameter` when
/// `n_clusters` is outside `[1, n_samples]` or `max_iterations` is zero.
pub fn kmeans(data: &ArrayView2<f64>, config: &KMeansConfig) -> Result<KMeansResult> {
    validate_matrix(data)?;
    let n_samples = data.nrows();
    if config.n_clusters == 0 || config.n_clusters > n_samples {
        return Err(MultivariateError::invalid_parameter(
            "n_clusters",
            format!(
                "must be between 1 and the number of samples ({}), got {}",
                n_samples, config.n_clusters
            ),
        ));
    }
    if config.max_iterations == 0 {
        return Err(MultivariateError::invalid_parameter(
            "max_iterations",
            "must be at least 1",
        ));
    }

    let mut state = KMeansState::new(data, config.n_clusters);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let changed = state.assign(data);
        trace!("K-means round {}: {} points changed cluster.", iterations, changed);
        if changed == 0 {
            converged = true;
            break;
        }
        state.update(data);
    }

    if converged {
        debug!(
            "K-means with k={} converged after {} rounds on {} samples.",
            config.n_clusters, iterations, n_samples
        );
    } else {
        warn!(
            "K-means with k={} reached the cap of {} rounds without converging; returning best effort.",
            config.n_clusters, config.max_iterations
        );
    }

    Ok(state.into_result(data, iterations, converged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [8.0, 8.0], [8.0, 9.0], [9.0, 9.0]]
    }

    #[test]
    fn separates_two_blobs() {
        let data = two_blobs();
        let result = kmeans(&data.view(), &KMeansConfig::new(2)).unwrap();
        assert!(result.converged);
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[1], result.labels[2]);
        assert_eq!(result.labels[3], result.labels[4]);
        assert_eq!(result.labels[4], result.labels[5]);
        assert_ne!(result.labels[0], result.labels[3]);
        assert_eq!(result.cluster_sizes(), vec![3, 3]);

        // Centroids sit at the blob means.
        let c0 = result.centroids.row(result.labels[0]);
        assert_abs_diff_eq!(c0[0], 4.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c0[1], 5.0 / 3.0, epsilon = 1e-12);
        let c1 = result.centroids.row(result.labels[3]);
        assert_abs_diff_eq!(c1[0], 25.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c1[1], 26.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn first_rows_seed_the_centroids() {
        // With max_iterations = 1 only the first assignment runs, against the
        // seeds (rows 0 and 1), and then centroids are updated once.
        let data = two_blobs();
        let config = KMeansConfig {
            n_clusters: 2,
            max_iterations: 1,
        };
        let result = kmeans(&data.view(), &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        // Row 0 is the seed of cluster 0; every other point is closer to row 1.
        assert_eq!(result.labels, vec![0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        // The middle point is equidistant from both seeds.
        let data = array![[0.0], [2.0], [1.0]];
        let config = KMeansConfig {
            n_clusters: 2,
            max_iterations: 1,
        };
        let result = kmeans(&data.view(), &config).unwrap();
        assert_eq!(result.labels, vec![0, 1, 0]);
    }

    #[test]
    fn deterministic() {
        let data = array![
            [2.5, 2.4, 1.0],
            [0.5, 0.7, 0.5],
            [2.2, 2.9, 1.2],
            [1.9, 2.2, 0.9],
            [3.1, 3.0, 1.1],
            [2.3, 2.7, 1.3]
        ];
        let a = kmeans(&data.view(), &KMeansConfig::new(2)).unwrap();
        let b = kmeans(&data.view(), &KMeansConfig::new(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stable_after_convergence() {
        let data = two_blobs();
        let result = kmeans(&data.view(), &KMeansConfig::new(3)).unwrap();
        assert!(result.converged);
        assert_eq!(result.predict(&data.view()).unwrap(), result.labels);
    }

    #[test]
    fn duplicate_seeds_leave_an_empty_cluster() {
        // Rows 0 and 1 are identical, so cluster 1 only ever ties with cluster 0
        // and keeps its stale centroid.
        let data = array![[0.0, 0.0], [0.0, 0.0], [10.0, 10.0], [10.0, 10.0]];
        let result = kmeans(&data.view(), &KMeansConfig::new(3)).unwrap();
        assert!(result.converged);
        assert_eq!(result.labels, vec![0, 0, 2, 2]);
        assert_eq!(result.cluster_sizes(), vec![2, 0, 2]);
        assert_eq!(result.centroids.row(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn cluster_sizes_skips_labels_without_a_centroid() {
        let result = KMeansResult {
            labels: vec![0, 1, 5, 1],
            centroids: Array2::zeros((2, 2)),
            iterations: 1,
            converged: true,
            inertia: 0.0,
        };
        assert_eq!(result.cluster_sizes(), vec![1, 2]);
    }

    #[test]
    fn k_equal_to_n_gives_singletons() {
        let data = two_blobs();
        let result = kmeans(&data.view(), &KMeansConfig::new(6)).unwrap();
        assert_eq!(result.labels, vec![0, 1, 2, 3, 4, 5]);
        assert_abs_diff_eq!(result.inertia, 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let data = two_blobs();
        for k in [0, 7] {
            assert!(matches!(
                kmeans(&data.view(), &KMeansConfig::new(k)),
                Err(MultivariateError::InvalidParameter { name: "n_clusters", .. })
            ));
        }
        let config = KMeansConfig {
            n_clusters: 2,
            max_iterations: 0,
        };
        assert!(matches!(
            kmeans(&data.view(), &config),
            Err(MultivariateError::InvalidParameter { name: "max_iterations", .. })
        ));
        let result = kmeans(&data.view(), &KMeansConfig::new(2)).unwrap();
        let wrong_width = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            result.predict(&wrong_width.view()),
            Err(MultivariateError::DimensionMismatch { .. })
        ));
    }
}
