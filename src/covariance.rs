// Sample covariance estimation.

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::data::{column_means, validate_matrix};
use crate::error::{MultivariateError, Result};

/// Computes the sample covariance matrix of `data`.
///
/// * `data` - Input data, shape (n_samples, n_features).
///
/// Entries are `sum_k (x_ki - mean_i)(x_kj - mean_j) / (n - 1)`. Only the upper
/// triangle is accumulated and then mirrored, so the result is exactly
/// symmetric; the diagonal holds the per-feature variances.
///
/// # Errors
/// Returns `EmptyData` / `NonFiniteValue` for malformed input and
/// `InsufficientData` when there are fewer than two samples.
pub fn covariance_matrix(data: &ArrayView2<f64>) -> Result<Array2<f64>> {
    validate_matrix(data)?;
    let n_samples = data.nrows();
    let n_features = data.ncols();
    if n_samples < 2 {
        return Err(MultivariateError::InsufficientData {
            required: 2,
            found: n_samples,
        });
    }

    let means = column_means(data)?;
    let centered = data.to_owned() - &means;
    let denom = (n_samples - 1) as f64;

    let mut cov = Array2::<f64>::zeros((n_features, n_features));
    for i in 0..n_features {
        let col_i = centered.column(i);
        for j in i..n_features {
            let value = col_i.dot(&centered.column(j)) / denom;
            cov[[i, j]] = value;
            cov[[j, i]] = value;
        }
    }

    debug!(
        "Computed {}x{} covariance matrix from {} samples.",
        n_features, n_features, n_samples
    );
    Ok(cov)
}
