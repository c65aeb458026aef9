// Data matrix boundary: conversion from caller-side rows and shared validation.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use num_traits::ToPrimitive;

use crate::error::{MultivariateError, Result};

/// Builds an owned `f64` data matrix from a list of rows.
///
/// Every row becomes one sample; all rows must have the same, non-zero width.
/// Any primitive numeric type is accepted and converted to `f64` here, so the
/// analysis routines only ever see a single precision.
///
/// # Errors
/// - `EmptyData` if there are no rows or the rows have zero width.
/// - `RaggedRows` if a row's width differs from the first row.
/// - `InvalidParameter` if a value cannot be represented as `f64`.
///
/// # Examples
///
/// ```
/// use multivariate_stats::data::matrix_from_rows;
/// let m = matrix_from_rows(&[vec![1i32, 2], vec![3, 4]]).unwrap();
/// assert_eq!(m.dim(), (2, 2));
/// ```
pub fn matrix_from_rows<T: ToPrimitive>(rows: &[Vec<T>]) -> Result<Array2<f64>> {
    let n_samples = rows.len();
    if n_samples == 0 {
        return Err(MultivariateError::EmptyData);
    }
    let n_features = rows[0].len();
    if n_features == 0 {
        return Err(MultivariateError::EmptyData);
    }

    let mut flat = Vec::with_capacity(n_samples * n_features);
    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(MultivariateError::RaggedRows {
                row: row_idx,
                expected: n_features,
                found: row.len(),
            });
        }
        for value in row {
            flat.push(to_f64(value)?);
        }
    }

    Array2::from_shape_vec((n_samples, n_features), flat)
        .map_err(|e| MultivariateError::invalid_parameter("rows", e.to_string()))
}

/// Converts a slice of numeric values (e.g. a regression target) to an `f64` vector.
pub fn vector_from_slice<T: ToPrimitive>(values: &[T]) -> Result<Array1<f64>> {
    values
        .iter()
        .map(to_f64)
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

fn to_f64<T: ToPrimitive>(value: &T) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| MultivariateError::invalid_parameter("value", "not representable as f64"))
}

/// Checks that a data matrix has at least one sample and one feature and that
/// every entry is finite.
pub fn validate_matrix(data: &ArrayView2<f64>) -> Result<()> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(MultivariateError::EmptyData);
    }
    for ((row, col), value) in data.indexed_iter() {
        if !value.is_finite() {
            return Err(MultivariateError::NonFiniteValue { row, col });
        }
    }
    Ok(())
}

/// Checks that a vector is finite and has the expected length.
pub(crate) fn validate_vector(
    values: &ArrayView1<f64>,
    expected_len: usize,
    context: &'static str,
) -> Result<()> {
    if values.len() != expected_len {
        return Err(MultivariateError::DimensionMismatch {
            context,
            expected: expected_len,
            found: values.len(),
        });
    }
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(MultivariateError::NonFiniteValue { row: idx, col: 0 });
    }
    Ok(())
}

/// Per-column arithmetic means. Shape: (n_features)
pub fn column_means(data: &ArrayView2<f64>) -> Result<Array1<f64>> {
    validate_matrix(data)?;
    data.mean_axis(Axis(0)).ok_or(MultivariateError::EmptyData)
}

/// Bessel-corrected sample variance of a single column.
pub fn column_variance(data: &ArrayView2<f64>, col: usize) -> Result<f64> {
    validate_matrix(data)?;
    let n_samples = data.nrows();
    if n_samples < 2 {
        return Err(MultivariateError::InsufficientData {
            required: 2,
            found: n_samples,
        });
    }
    if col >= data.ncols() {
        return Err(MultivariateError::DimensionMismatch {
            context: "column index",
            expected: data.ncols(),
            found: col,
        });
    }
    Ok(data.column(col).var(1.0))
}
