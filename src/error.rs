// Error taxonomy shared by every analysis routine in the crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MultivariateError>;

/// Broad failure category, so callers can branch without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input was malformed or a parameter was out of range. Detected before
    /// any computation starts.
    InvalidInput,
    /// The input was well-formed but the computation could not proceed safely
    /// (singular system, vanishing norm).
    NumericalInstability,
}

/// The error type for all multivariate operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MultivariateError {
    #[error("data matrix is empty (zero samples or zero features)")]
    EmptyData,

    #[error("insufficient data: at least {required} samples required, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("ragged rows: row {row} has {found} features, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("non-finite value at row {row}, column {col}")]
    NonFiniteValue { row: usize, col: usize },

    #[error("matrix is not symmetric at ({row}, {col})")]
    NotSymmetric { row: usize, col: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("matrix is singular or nearly singular: pivot {pivot:e} at column {pivot_index}")]
    SingularMatrix { pivot_index: usize, pivot: f64 },

    #[error("numerical instability: {reason}")]
    NumericalInstability { reason: String },
}

impl MultivariateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultivariateError::SingularMatrix { .. }
            | MultivariateError::NumericalInstability { .. } => ErrorKind::NumericalInstability,
            _ => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        MultivariateError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
