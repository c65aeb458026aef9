// Multivariate analysis: covariance, power iteration, PCA, clustering and least squares

#![doc = include_str!("../README.md")]

pub mod covariance;
pub mod data;
pub mod dbscan;
pub mod distance;
pub mod eigen;
pub mod error;
pub mod kmeans;
pub mod pca;
pub mod regression;

pub use covariance::covariance_matrix;
pub use dbscan::{dbscan, DbscanConfig, DbscanResult, NOISE};
pub use distance::euclidean_distance;
pub use eigen::{power_iteration, EigenPair, PowerIterationConfig};
pub use error::{ErrorKind, MultivariateError, Result};
pub use kmeans::{kmeans, KMeansConfig, KMeansResult};
pub use pca::{first_principal_component, first_principal_component_with, PrincipalComponent};
pub use regression::{multivariate_regression, solve_linear_system, LinearModel};
