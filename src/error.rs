//! Error types for paleomagnetic analysis operations.
//!
//! Numeric degeneracies (a perfectly clustered population, an eigenvalue
//! discriminant slightly outside `[-1, 1]`) are handled by clamping or
//! sentinels inside the algorithms and never surface here.

use thiserror::Error;

/// Main error type for paleomagnetic analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaleomagError {
    /// Input validation errors (angles out of range, unknown mode names).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Too few points for the requested statistic or fit.
    #[error("Insufficient points: need at least {min}, got {actual}")]
    InsufficientPoints { min: usize, actual: usize },

    /// A vector without a defined direction.
    #[error("Degenerate vector: {context}")]
    DegenerateVector { context: String },

    /// An iterative fit hit its sweep cap.
    #[error("No convergence after {iterations} iterations (last change {residual})")]
    NonConvergence { iterations: usize, residual: f64 },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for paleomagnetic analysis operations.
pub type Result<T> = std::result::Result<T, PaleomagError>;

impl PaleomagError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an insufficient points error.
    #[must_use]
    pub const fn insufficient_points(min: usize, actual: usize) -> Self {
        Self::InsufficientPoints { min, actual }
    }

    /// Create a degenerate vector error.
    #[must_use]
    pub fn degenerate_vector(context: impl Into<String>) -> Self {
        Self::DegenerateVector {
            context: context.into(),
        }
    }

    /// Create a non-convergence error.
    #[must_use]
    pub const fn non_convergence(iterations: usize, residual: f64) -> Self {
        Self::NonConvergence {
            iterations,
            residual,
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
