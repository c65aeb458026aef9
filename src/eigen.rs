// Dominant eigenpair of a symmetric matrix via power iteration.

use log::{debug, trace, warn};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{MultivariateError, Result};

/// Relative factor for the collapse check: a step `w = M v` is treated as zero
/// when `‖w‖ <= NORM_EPSILON * ‖M‖_F * ‖v‖`.
pub const NORM_EPSILON: f64 = f64::EPSILON;

/// Relative tolerance used when checking that an input matrix is symmetric.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Configuration for [`power_iteration`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerIterationConfig {
    /// Upper bound on matrix-vector products. Reaching it is not an error.
    pub max_iterations: usize,
    /// Convergence threshold on the L1 norm of the change between successive
    /// unit-norm iterates.
    pub tolerance: f64,
}

impl Default for PowerIterationConfig {
    fn default() -> Self {
        PowerIterationConfig {
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

/// The dominant eigenpair found by power iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    /// Rayleigh quotient `v^T M v` of the returned unit vector.
    pub eigenvalue: f64,
    /// Eigenvector with unit Euclidean norm. Shape: (n)
    pub eigenvector: Array1<f64>,
    /// Number of matrix-vector products performed.
    pub iterations: usize,
    /// Whether the tolerance was met before `max_iterations`.
    pub converged: bool,
}

/// Computes the dominant eigenvalue and eigenvector of a symmetric matrix.
///
/// Starts from the all-ones vector, repeatedly multiplies by `matrix` and
/// renormalizes, and stops when the summed absolute change between successive
/// iterates falls below `config.tolerance` or after `config.max_iterations`
/// steps, whichever comes first. A capped run is returned as a best-effort
/// result with `converged == false`.
///
/// Convergence is only meaningful when the dominant eigenvalue is strictly
/// larger in magnitude than the others. With a dominant negative eigenvalue the
/// iterate flips sign every step and the run ends at the cap.
///
/// # Errors
/// - `EmptyData`, `DimensionMismatch` (non-square), `NonFiniteValue` or
///   `NotSymmetric` for malformed matrices.
/// - `InvalidParameter` for a zero iteration cap or non-positive tolerance.
/// - `NumericalInstability` when an iterate's norm vanishes relative to the
///   matrix scale, e.g. for the zero matrix or a start vector orthogonal to
///   every non-null eigenvector.
pub fn power_iteration(
    matrix: &ArrayView2<f64>,
    config: &PowerIterationConfig,
) -> Result<EigenPair> {
    validate_symmetric(matrix)?;
    if config.max_iterations == 0 {
        return Err(MultivariateError::invalid_parameter(
            "max_iterations",
            "must be at least 1",
        ));
    }
    if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
        return Err(MultivariateError::invalid_parameter(
            "tolerance",
            format!("must be positive and finite, got {}", config.tolerance),
        ));
    }

    let n = matrix.nrows();
    let matrix_scale = matrix
        .iter()
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt()
        .max(f64::MIN_POSITIVE);
    let mut eigenvector = Array1::<f64>::ones(n);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let mut next = matrix.dot(&eigenvector);
        let norm = next.dot(&next).sqrt();
        let floor = NORM_EPSILON * matrix_scale * eigenvector.dot(&eigenvector).sqrt();
        if !norm.is_finite() || norm <= floor {
            return Err(MultivariateError::NumericalInstability {
                reason: format!(
                    "power iteration norm {:e} at step {} cannot be normalized",
                    norm, iterations
                ),
            });
        }
        next.mapv_inplace(|x| x / norm);

        let delta: f64 = next
            .iter()
            .zip(eigenvector.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        eigenvector = next;
        trace!("Power iteration step {}: delta={:e}", iterations, delta);

        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        debug!("Power iteration converged after {} iterations.", iterations);
    } else {
        warn!(
            "Power iteration reached the cap of {} iterations without meeting tolerance {:e}; returning best effort.",
            config.max_iterations, config.tolerance
        );
    }

    let eigenvalue = eigenvector.dot(&matrix.dot(&eigenvector));

    Ok(EigenPair {
        eigenvalue,
        eigenvector,
        iterations,
        converged,
    })
}

fn validate_symmetric(matrix: &ArrayView2<f64>) -> Result<()> {
    let n = matrix.nrows();
    if n == 0 || matrix.ncols() == 0 {
        return Err(MultivariateError::EmptyData);
    }
    if matrix.ncols() != n {
        return Err(MultivariateError::DimensionMismatch {
            context: "square matrix columns",
            expected: n,
            found: matrix.ncols(),
        });
    }
    for i in 0..n {
        for j in i..n {
            let a = matrix[[i, j]];
            let b = matrix[[j, i]];
            if !a.is_finite() {
                return Err(MultivariateError::NonFiniteValue { row: i, col: j });
            }
            if !b.is_finite() {
                return Err(MultivariateError::NonFiniteValue { row: j, col: i });
            }
            let scale = a.abs().max(b.abs()).max(1.0);
            if (a - b).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(MultivariateError::NotSymmetric { row: i, col: j });
            }
        }
    }
    Ok(())
}
