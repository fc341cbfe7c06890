//! Kent (elliptical) confidence regions about a Fisher mean.
//!
//! The data are rotated into the frame of the mean direction, the frame is
//! turned about the mean so the orientation matrix is diagonal in the
//! tangent plane, and the semi-axes follow from the second moments along the
//! two tangent axes (after PmagPy's `dokent`).

use log::warn;
use nalgebra::Matrix3;

use crate::direction::Direction;
use crate::error::{PaleomagError, Result};
use crate::fisher::{mean_direction, MIN_POINTS};
use crate::math::linalg::orientation_matrix;
use crate::math::sphere::{dir, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kent confidence ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KentParameters {
    /// Fisher mean direction.
    pub mean: Direction,
    /// Number of directions.
    pub n: usize,
    /// Semi-axis half-angle along `e_axis`, degrees.
    pub eta: f64,
    /// Semi-axis half-angle along `z_axis`, degrees.
    pub zeta: f64,
    /// Axis of the ζ semi-axis, lower hemisphere.
    pub z_axis: Direction,
    /// Axis of the η semi-axis, lower hemisphere.
    pub e_axis: Direction,
}

/// Kent confidence ellipse of a set of directions.
///
/// # Errors
///
/// Returns an error for fewer than two directions or a vanishing resultant.
pub fn kent_parameters(directions: &[Direction], confidence: f64) -> Result<KentParameters> {
    let n = directions.len();
    if n < MIN_POINTS {
        return Err(PaleomagError::insufficient_points(MIN_POINTS, n));
    }
    if !(confidence > 0.0 && confidence < 100.0) {
        return Err(PaleomagError::invalid_input(format!(
            "confidence {confidence} outside (0, 100)"
        )));
    }

    let mean = mean_direction(directions)?;
    let vectors: Vec<Vector3> = directions.iter().map(Direction::to_unit_vector).collect();
    let nf = n as f64;

    let p_bar = mean.dec.to_radians();
    let t_bar = (90.0 - mean.inc).to_radians();

    // Third column of H is the mean direction
    #[rustfmt::skip]
    let h = Matrix3::new(
        t_bar.cos() * p_bar.cos(), -p_bar.sin(), t_bar.sin() * p_bar.cos(),
        t_bar.cos() * p_bar.sin(), p_bar.cos(), t_bar.sin() * p_bar.sin(),
        -t_bar.sin(), 0.0, t_bar.cos(),
    );

    let t = orientation_matrix(&vectors) / nf;
    let b = h.transpose() * t * h;

    let psi = if b[(0, 1)] == 0.0 && b[(0, 0)] == b[(1, 1)] {
        0.0
    } else {
        0.5 * (2.0 * b[(0, 1)] / (b[(0, 0)] - b[(1, 1)])).atan()
    };

    #[rustfmt::skip]
    let w = Matrix3::new(
        psi.cos(), -psi.sin(), 0.0,
        psi.sin(), psi.cos(), 0.0,
        0.0, 0.0, 1.0,
    );
    let gamma = h * w;
    let gamma_t = gamma.transpose();

    let (mut sigma1, mut sigma2, mut x_mu) = (0.0, 0.0, 0.0);
    for v in &vectors {
        let y = gamma_t * v;
        sigma1 += y[1] * y[1];
        sigma2 += y[0] * y[0];
        x_mu += y[2];
    }
    sigma1 /= nf;
    sigma2 /= nf;
    x_mu /= nf;

    let p = 0.01 * (100.0 - confidence);
    let g = -2.0 * p.ln() / (nf * x_mu * x_mu);

    let zeta = semi_axis(sigma1, g);
    let eta = semi_axis(sigma2, g);

    let z_axis = dir(&gamma.column(1).into_owned())?.lower_hemisphere();
    let e_axis = dir(&gamma.column(0).into_owned())?.lower_hemisphere();

    Ok(KentParameters {
        mean,
        n,
        eta,
        zeta,
        z_axis: Direction { intensity: 1.0, ..z_axis },
        e_axis: Direction { intensity: 1.0, ..e_axis },
    })
}

/// Half-angle in degrees from a second moment, saturating at 90 degrees.
fn semi_axis(sigma: f64, g: f64) -> f64 {
    let s = (sigma * g).sqrt();
    if s >= 1.0 || s.is_nan() {
        warn!("Kent semi-axis saturated (sqrt(sigma*g) = {s:.4}); using 90 degrees");
        90.0
    } else {
        s.asin().to_degrees()
    }
}
