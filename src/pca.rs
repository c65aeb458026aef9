// Principal component analysis (PCA), first component only

use log::debug;
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::covariance::covariance_matrix;
use crate::data::validate_matrix;
use crate::eigen::{power_iteration, PowerIterationConfig};
use crate::error::{MultivariateError, Result};

/// The first principal component of a data matrix.
///
/// Holds the dominant eigenpair of the sample covariance matrix together with
/// the column means of the training data, so new samples can be projected with
/// [`PrincipalComponent::transform`]. Only one component is computed; no
/// deflation or orthogonalization is performed to extract further ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrincipalComponent {
    /// Unit-norm direction of maximal variance.
    /// Shape: (n_features)
    component: Array1<f64>,
    /// Variance of the data along `component` (the dominant eigenvalue).
    explained_variance: f64,
    /// Sum of all feature variances (trace of the covariance matrix).
    total_variance: f64,
    /// Mean vector of the training data.
    /// Shape: (n_features)
    mean: Array1<f64>,
    /// Whether power iteration met its tolerance.
    converged: bool,
}

impl PrincipalComponent {
    /// Returns the principal axis, a unit vector of length n_features.
    ///
    /// The sign is whatever power iteration settled on from the all-ones start
    /// vector; `-component` is an equally valid axis.
    pub fn component(&self) -> &Array1<f64> {
        &self.component
    }

    /// Returns the variance explained by the component.
    pub fn explained_variance(&self) -> f64 {
        self.explained_variance
    }

    /// Returns the total variance of the training data.
    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// Fraction of the total variance captured by the component, or 0.0 if the
    /// data has no variance at all.
    pub fn explained_variance_ratio(&self) -> f64 {
        if self.total_variance > 0.0 {
            self.explained_variance / self.total_variance
        } else {
            0.0
        }
    }

    /// Returns the mean vector of the training data.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Returns whether the eigensolver converged before its iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Projects `data` onto the component.
    ///
    /// Each row is centered with the training mean and dotted with the
    /// principal axis, giving one score per sample.
    ///
    /// * `data` - Input data, shape (m_samples, n_features).
    ///
    /// # Errors
    /// Returns an error if `data` is malformed or its feature dimension does
    /// not match the fitted component.
    pub fn transform(&self, data: &ArrayView2<f64>) -> Result<Array1<f64>> {
        validate_matrix(data)?;
        if data.ncols() != self.component.len() {
            return Err(MultivariateError::DimensionMismatch {
                context: "PCA transform features",
                expected: self.component.len(),
                found: data.ncols(),
            });
        }
        let mut centered = data.to_owned();
        for mut row in centered.axis_iter_mut(Axis(0)) {
            row -= &self.mean;
        }
        Ok(centered.dot(&self.component))
    }
}

/// Computes the first principal component of `data` with the default
/// power-iteration settings.
///
/// * `data` - Input data, shape (n_samples, n_features).
///
/// # Errors
/// Propagates covariance errors (fewer than 2 samples, malformed data) and
/// eigensolver errors. Data with zero variance in every feature produces a zero
/// covariance matrix and fails with `NumericalInstability`.
///
/// # Examples
///
/// ```
/// use multivariate_stats::pca::first_principal_component;
/// use ndarray::array;
///
/// let data = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
/// let pc = first_principal_component(&data.view()).unwrap();
/// assert!((pc.explained_variance() - 5.0).abs() < 1e-9);
/// ```
pub fn first_principal_component(data: &ArrayView2<f64>) -> Result<PrincipalComponent> {
    first_principal_component_with(data, &PowerIterationConfig::default())
}

/// Same as [`first_principal_component`] with explicit eigensolver settings.
pub fn first_principal_component_with(
    data: &ArrayView2<f64>,
    config: &PowerIterationConfig,
) -> Result<PrincipalComponent> {
    let cov = covariance_matrix(data)?;
    let total_variance = cov.diag().sum();
    let eigen = power_iteration(&cov.view(), config)?;
    let mean = data
        .mean_axis(Axis(0))
        .ok_or(MultivariateError::EmptyData)?;

    debug!(
        "First principal component explains {:.6} of total variance {:.6} ({} features).",
        eigen.eigenvalue,
        total_variance,
        data.ncols()
    );

    Ok(PrincipalComponent {
        component: eigen.eigenvector,
        explained_variance: eigen.eigenvalue,
        total_variance,
        mean,
        converged: eigen.converged,
    })
}
