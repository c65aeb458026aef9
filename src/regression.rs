// Ordinary least squares via the normal equations and Gaussian elimination
// with partial pivoting.

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::data::{validate_matrix, validate_vector};
use crate::error::{MultivariateError, Result};

/// Pivots with an absolute value below this threshold mark the system as singular.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// A fitted linear model `y ≈ X β` (no implicit intercept).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per feature. Shape: (n_features)
    pub coefficients: Array1<f64>,
}

impl LinearModel {
    /// Predicted targets `X β` for each row of `data`.
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<f64>> {
        validate_matrix(data)?;
        if data.ncols() != self.coefficients.len() {
            return Err(MultivariateError::DimensionMismatch {
                context: "regression predict features",
                expected: self.coefficients.len(),
                found: data.ncols(),
            });
        }
        Ok(data.dot(&self.coefficients))
    }

    /// Observed minus predicted targets.
    pub fn residuals(&self, data: &ArrayView2<f64>, target: &ArrayView1<f64>) -> Result<Array1<f64>> {
        let predicted = self.predict(data)?;
        validate_vector(target, data.nrows(), "regression target length")?;
        Ok(target - &predicted)
    }

    /// Coefficient of determination `1 - SS_res / SS_tot`.
    ///
    /// With a constant target SS_tot is zero (up to rounding relative to the
    /// target's magnitude); the result is then 1.0 for an exact fit and 0.0
    /// otherwise.
    pub fn r_squared(&self, data: &ArrayView2<f64>, target: &ArrayView1<f64>) -> Result<f64> {
        if target.len() < 2 {
            return Err(MultivariateError::InsufficientData {
                required: 2,
                found: target.len(),
            });
        }
        let residuals = self.residuals(data, target)?;
        let ss_res = residuals.dot(&residuals);
        let mean = target.sum() / target.len() as f64;
        let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
        // Constant relative to the target's own magnitude, not in absolute terms.
        let scale = target.dot(target) * f64::EPSILON;
        if ss_tot <= scale {
            return Ok(if ss_res <= scale { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }
}

/// Builds the normal equations `A = X^T X` and `b = X^T y`.
///
/// # Errors
/// Malformed data, or a target whose length differs from the number of rows
/// (`DimensionMismatch`).
pub fn normal_equations(
    data: &ArrayView2<f64>,
    target: &ArrayView1<f64>,
) -> Result<(Array2<f64>, Array1<f64>)> {
    validate_matrix(data)?;
    validate_vector(target, data.nrows(), "regression target length")?;
    let xtx = data.t().dot(data);
    let xty = data.t().dot(target);
    Ok((xtx, xty))
}

/// Solves the square system `A x = b` by Gaussian elimination with partial
/// pivoting followed by back substitution.
///
/// At each step the remaining row with the largest absolute value in the
/// pivot column is swapped into place (the first such row on ties). `a` and
/// `b` are copied; the caller's values are left untouched.
///
/// # Errors
/// - `EmptyData`, `DimensionMismatch` or `NonFiniteValue` for malformed input.
/// - `SingularMatrix` when a pivot's magnitude falls below [`PIVOT_EPSILON`].
pub fn solve_linear_system(a: &ArrayView2<f64>, b: &ArrayView1<f64>) -> Result<Array1<f64>> {
    validate_matrix(a)?;
    let n = a.nrows();
    if a.ncols() != n {
        return Err(MultivariateError::DimensionMismatch {
            context: "square system columns",
            expected: n,
            found: a.ncols(),
        });
    }
    validate_vector(b, n, "right-hand side length")?;

    let mut a = a.to_owned();
    let mut b = b.to_owned();

    for col in 0..n {
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if a[[row, col]].abs() > a[[pivot_row, col]].abs() {
                pivot_row = row;
            }
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
            }
            b.swap(col, pivot_row);
        }

        let pivot = a[[col, col]];
        if pivot.abs() < PIVOT_EPSILON {
            warn!(
                "Gaussian elimination hit pivot {:e} at column {}; system is singular.",
                pivot, col
            );
            return Err(MultivariateError::SingularMatrix {
                pivot_index: col,
                pivot,
            });
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[[row, k]] * x[k];
        }
        x[row] = acc / a[[row, row]];
    }
    Ok(x)
}

/// Fits ordinary least squares coefficients for `target ≈ data · β`.
///
/// No intercept column is added; include a constant feature in `data` if one is
/// wanted.
///
/// # Errors
/// See [`normal_equations`] and [`solve_linear_system`]. Collinear features
/// yield `SingularMatrix`.
///
/// # Examples
///
/// ```
/// use multivariate_stats::regression::multivariate_regression;
/// use ndarray::array;
///
/// let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
/// let y = array![1.0, 3.0, 5.0];
/// let model = multivariate_regression(&x.view(), &y.view()).unwrap();
/// assert!((model.coefficients[0] - 1.0).abs() < 1e-10);
/// assert!((model.coefficients[1] - 2.0).abs() < 1e-10);
/// ```
pub fn multivariate_regression(
    data: &ArrayView2<f64>,
    target: &ArrayView1<f64>,
) -> Result<LinearModel> {
    let (xtx, xty) = normal_equations(data, target)?;
    let coefficients = solve_linear_system(&xtx.view(), &xty.view())?;
    debug!(
        "Fitted {} regression coefficients from {} samples.",
        coefficients.len(),
        data.nrows()
    );
    Ok(LinearModel { coefficients })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn solves_system_requiring_a_pivot_swap() {
        // Zero in the leading position forces a row swap.
        let a = array![[0.0, 2.0, 1.0], [1.0, 1.0, 1.0], [2.0, 1.0, 3.0]];
        let b = array![5.0, 4.0, 7.0];
        let x = solve_linear_system(&a.view(), &b.view()).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[2], 1.0, epsilon = 1e-12);
        // Inputs are untouched.
        assert_eq!(a[[0, 0]], 0.0);
        assert_eq!(b[0], 5.0);
    }

    #[test]
    fn residual_of_random_well_conditioned_systems() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let n = 5;
            let mut a = Array2::from_shape_fn((n, n), |_| rng.gen_range(-1.0..1.0));
            // Diagonal dominance keeps the system well conditioned.
            for i in 0..n {
                a[[i, i]] += n as f64;
            }
            let b = Array1::from_shape_fn(n, |_| rng.gen_range(-10.0..10.0));
            let x = solve_linear_system(&a.view(), &b.view()).unwrap();
            let residual = &a.dot(&x) - &b;
            for r in residual.iter() {
                assert_abs_diff_eq!(*r, 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn singular_system_is_reported() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        let err = solve_linear_system(&a.view(), &b.view()).unwrap_err();
        assert!(matches!(err, MultivariateError::SingularMatrix { pivot_index: 1, .. }));
    }

    #[test]
    fn recovers_exact_coefficients() {
        let x = array![
            [1.0, 2.0, 0.5],
            [1.0, -1.0, 2.0],
            [1.0, 0.0, 1.0],
            [1.0, 3.0, -1.0],
            [1.0, 1.5, 0.0]
        ];
        let beta = array![0.5, -2.0, 3.0];
        let y = x.dot(&beta);
        let model = multivariate_regression(&x.view(), &y.view()).unwrap();
        for (est, truth) in model.coefficients.iter().zip(beta.iter()) {
            assert_abs_diff_eq!(*est, *truth, epsilon = 1e-10);
        }
        assert_abs_diff_eq!(model.r_squared(&x.view(), &y.view()).unwrap(), 1.0, epsilon = 1e-12);
        let residuals = model.residuals(&x.view(), &y.view()).unwrap();
        assert!(residuals.iter().all(|r| r.abs() < 1e-10));
    }

    #[test]
    fn duplicate_columns_are_singular() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![1.0, 2.0, 3.0];
        let err = multivariate_regression(&x.view(), &y.view()).unwrap_err();
        assert!(matches!(err, MultivariateError::SingularMatrix { .. }));
    }

    #[test]
    fn target_length_must_match() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0];
        assert_eq!(
            multivariate_regression(&x.view(), &y.view()),
            Err(MultivariateError::DimensionMismatch {
                context: "regression target length",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn no_implicit_intercept() {
        // y = 2x + 10; without a constant column the fit is forced through the origin.
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![12.0, 14.0, 16.0];
        let model = multivariate_regression(&x.view(), &y.view()).unwrap();
        // beta = sum(x*y) / sum(x^2) = 88 / 14
        assert_abs_diff_eq!(model.coefficients[0], 88.0 / 14.0, epsilon = 1e-12);
        assert!(model.r_squared(&x.view(), &y.view()).unwrap() < 1.0);
    }

    #[test]
    fn r_squared_does_not_depend_on_target_units() {
        let x = array![[1.0], [2.0], [3.0]];
        // beta = 17/14; SS_res = 70/196 and SS_tot = 42/9 in units of 1e-18.
        let expected = 1.0 - (70.0 / 196.0) / (42.0 / 9.0);
        for unit in [1.0, 1e-9] {
            let y = array![1.0, 2.0, 4.0] * unit;
            let model = multivariate_regression(&x.view(), &y.view()).unwrap();
            let r2 = model.r_squared(&x.view(), &y.view()).unwrap();
            assert_relative_eq!(r2, expected, max_relative = 1e-9);
        }
    }

    #[test]
    fn r_squared_with_constant_target() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![5e-10, 5e-10, 5e-10];
        let model = multivariate_regression(&x.view(), &y.view()).unwrap();
        assert_eq!(model.r_squared(&x.view(), &y.view()).unwrap(), 1.0);
        let off = LinearModel {
            coefficients: array![1e-10],
        };
        assert_eq!(off.r_squared(&x.view(), &y.view()).unwrap(), 0.0);
    }

    #[test]
    fn predict_checks_width() {
        let model = LinearModel {
            coefficients: array![1.0, 2.0],
        };
        let x = array![[1.0, 1.0, 1.0]];
        assert!(matches!(
            model.predict(&x.view()),
            Err(MultivariateError::DimensionMismatch { .. })
        ));
        let x = array![[1.0, 1.0]];
        assert_eq!(model.predict(&x.view()).unwrap(), array![3.0]);
    }
}
