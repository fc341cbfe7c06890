//! Linear algebra for orientation matrices.
//!
//! This module provides the orientation (moment) matrix of a set of vectors
//! and its eigen-decomposition. Eigenvalues come from the closed-form
//! solution for symmetric 3x3 matrices (O.K. Smith, 1961); eigenvectors come
//! from nalgebra's symmetric eigen-decomposition.

use nalgebra::{Matrix3, SymmetricEigen};

use crate::error::{PaleomagError, Result};
use crate::math::sphere::Vector3;

/// Result of an orientation-matrix decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenResult {
    /// Normalized eigenvalues `τ1 >= τ2 >= τ3`, summing to 1.
    pub tau: [f64; 3],

    /// Unit eigenvectors matched to `tau`.
    pub vectors: [Vector3; 3],
}

impl EigenResult {
    /// Eigenvector of the largest eigenvalue.
    #[must_use]
    pub fn major(&self) -> Vector3 {
        self.vectors[0]
    }

    /// Eigenvector of the intermediate eigenvalue.
    #[must_use]
    pub fn intermediate(&self) -> Vector3 {
        self.vectors[1]
    }

    /// Eigenvector of the smallest eigenvalue.
    #[must_use]
    pub fn minor(&self) -> Vector3 {
        self.vectors[2]
    }
}

/// Orientation matrix `T = Σ v·vᵀ` of a set of vectors.
#[must_use]
pub fn orientation_matrix(vectors: &[Vector3]) -> Matrix3<f64> {
    vectors
        .iter()
        .fold(Matrix3::zeros(), |t, v| t + v * v.transpose())
}

/// Closed-form eigenvalues of a symmetric 3x3 matrix, normalized by their sum.
///
/// Returned in descending order.
///
/// # Errors
///
/// Returns [`PaleomagError::DegenerateVector`] if the trace is not positive
/// (no eigenvalue normalization exists).
pub fn eigenvalues(t: &Matrix3<f64>) -> Result<[f64; 3]> {
    let trace = t.trace();
    if !(trace.is_finite() && trace > 0.0) {
        return Err(PaleomagError::degenerate_vector(
            "orientation matrix has no positive trace",
        ));
    }

    let m = trace / 3.0;
    let shifted = t - Matrix3::identity() * m;
    let p = (shifted.iter().map(|x| x * x).sum::<f64>() / 6.0).sqrt();

    // Multiple of the identity: all eigenvalues equal
    if p == 0.0 {
        return Ok([1.0 / 3.0; 3]);
    }

    let b = shifted / p;
    let r = (0.5 * b.determinant()).clamp(-1.0, 1.0);

    let phi = if r <= -1.0 {
        std::f64::consts::FRAC_PI_3
    } else if r >= 1.0 {
        0.0
    } else {
        r.acos() / 3.0
    };

    let third = 2.0 * std::f64::consts::FRAC_PI_3;
    let values = [
        m + 2.0 * p * phi.cos(),
        m + 2.0 * p * (phi - third).cos(),
        m + 2.0 * p * (phi + third).cos(),
    ];

    let sum: f64 = values.iter().sum();
    Ok([values[0] / sum, values[1] / sum, values[2] / sum])
}

/// Eigenvalues and matched eigenvectors of a symmetric 3x3 matrix.
///
/// Eigenvector columns are reordered by descending eigenvalue with a stable
/// sort, so ties keep the decomposition's original column order.
///
/// # Errors
///
/// Returns [`PaleomagError::DegenerateVector`] if the trace is not positive.
pub fn decompose(t: &Matrix3<f64>) -> Result<EigenResult> {
    let tau = eigenvalues(t)?;

    let eigen = SymmetricEigen::new(*t);

    // Collect eigenvalue-eigenvector pairs and sort descending
    let mut pairs: Vec<(f64, Vector3)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, eigen.eigenvectors.column(i).into_owned()))
        .collect();

    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    Ok(EigenResult {
        tau,
        vectors: [pairs[0].1, pairs[1].1, pairs[2].1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_eigen_pair(t: &Matrix3<f64>, result: &EigenResult) {
        let trace = t.trace();
        for (tau, v) in result.tau.iter().zip(result.vectors.iter()) {
            let tv = t * v;
            assert_relative_eq!(tv, v * (tau * trace), epsilon = 1e-9);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_diagonal_matrix() {
        let t = Matrix3::from_diagonal(&Vector3::new(1.0, 5.0, 2.0));
        let result = decompose(&t).unwrap();

        assert_relative_eq!(result.tau[0], 0.625, epsilon = 1e-12);
        assert_relative_eq!(result.tau[1], 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.tau[2], 0.125, epsilon = 1e-12);
        assert_relative_eq!(result.major().y.abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.minor().x.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_general_symmetric_matrix() {
        let vectors = vec![
            Vector3::new(1.0, 0.2, 0.1),
            Vector3::new(0.9, -0.1, 0.3),
            Vector3::new(1.1, 0.3, -0.2),
            Vector3::new(0.2, 1.0, 0.4),
        ];
        let t = orientation_matrix(&vectors);
        let result = decompose(&t).unwrap();

        assert!(result.tau[0] >= result.tau[1] && result.tau[1] >= result.tau[2]);
        assert!(result.tau[2] >= -1e-12);
        assert_relative_eq!(result.tau.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert_eigen_pair(&t, &result);
    }

    #[test]
    fn test_rank_one_matrix() {
        // A single direction: all weight on one axis, clamped discriminant.
        let v = Vector3::new(0.0, 0.6, 0.8);
        let t = orientation_matrix(&[v]);
        let tau = eigenvalues(&t).unwrap();
        assert_relative_eq!(tau[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(tau[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(tau[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_isotropic_matrix() {
        let tau = eigenvalues(&(Matrix3::identity() * 4.0)).unwrap();
        assert_eq!(tau, [1.0 / 3.0; 3]);
    }

    #[test]
    fn test_zero_matrix_rejected() {
        assert!(decompose(&Matrix3::zeros()).is_err());
    }
}
