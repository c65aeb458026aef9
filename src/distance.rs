// Euclidean distances between feature vectors.

use ndarray::ArrayView1;

/// Squared Euclidean distance between two feature vectors of equal length.
#[inline]
pub fn squared_euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "feature vectors must have equal length");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Euclidean distance between two feature vectors of equal length.
#[inline]
pub fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    squared_euclidean_distance(a, b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn three_four_five() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert_abs_diff_eq!(euclidean_distance(&a.view(), &b.view()), 5.0);
        assert_abs_diff_eq!(squared_euclidean_distance(&a.view(), &b.view()), 25.0);
        assert_abs_diff_eq!(euclidean_distance(&b.view(), &a.view()), 5.0);
        assert_abs_diff_eq!(euclidean_distance(&b.view(), &b.view()), 0.0);
    }
}
