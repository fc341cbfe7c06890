//! Combined analysis of set points and remagnetization great circles.
//!
//! Each great circle (given by its pole) contributes the point on the circle
//! closest to the current mean. Points are refitted one circle at a time
//! against the mean of everything else until no point moves by more than the
//! convergence tolerance (McFadden and McElhinny, 1988).

use log::{debug, warn};

use crate::config::AnalysisConfig;
use crate::direction::Direction;
use crate::error::{PaleomagError, Result};
use crate::math::sphere::{angle_between, dir, unit, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest distance from the circle pole the mean may have.
const MIN_RHO: f64 = 1e-12;

/// Statistics of a combined set-point and great-circle mean.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GreatCircleStats {
    /// Effective number of directions `M + N/2`.
    pub n_effective: f64,
    /// Resultant length of set points and fitted points.
    pub r: f64,
    /// Precision parameter `(2M + N - 2) / (2(M + N - R))`.
    pub kappa: f64,
    /// Confidence cone half-angle in degrees.
    pub a95: f64,
}

/// Outcome of a great-circle fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GreatCircleFit {
    /// Mean of set points and fitted points.
    pub mean: Direction,
    /// Fitted point on each circle, in input order.
    pub fitted: Vec<Direction>,
    /// Number of refitting sweeps performed.
    pub sweeps: usize,
    /// Number of set points (M).
    pub n_points: usize,
    /// Number of great circles (N).
    pub n_circles: usize,
    /// Combined statistics, when `M + N/2 > 1`.
    pub statistics: Option<GreatCircleStats>,
}

/// Point on the great circle with pole `pole` closest to `mean`.
///
/// # Errors
///
/// Returns [`PaleomagError::DegenerateVector`] when `mean` is parallel to the pole,
/// which leaves every point on the circle equally close.
pub fn v_close(pole: &Vector3, mean: &Vector3) -> Result<Vector3> {
    let tau = mean.dot(pole);
    let rho = (1.0 - tau * tau).max(0.0).sqrt();
    if rho < MIN_RHO {
        return Err(PaleomagError::degenerate_vector(
            "mean direction coincides with a great-circle pole",
        ));
    }
    Ok((mean - pole * tau) / rho)
}

/// Fit a mean to set points and great circles.
///
/// `forced_guess` seeds the mean and is only consulted when `set_points` is
/// empty; it never enters the final mean.
///
/// # Errors
///
/// - [`PaleomagError::InvalidInput`] without set points and without a guess,
///   or without any data at all.
/// - [`PaleomagError::DegenerateVector`] when a circle pole coincides with the mean.
/// - [`PaleomagError::NonConvergence`] when `config.max_sweeps` is reached.
pub fn fit_great_circles(
    set_points: &[Direction],
    circle_poles: &[Direction],
    forced_guess: Option<Direction>,
    config: &AnalysisConfig,
) -> Result<GreatCircleFit> {
    config.validate()?;

    let points: Vec<Vector3> = set_points.iter().map(Direction::to_unit_vector).collect();
    let poles: Vec<Vector3> = circle_poles.iter().map(Direction::to_unit_vector).collect();
    if points.is_empty() && poles.is_empty() {
        return Err(PaleomagError::invalid_input(
            "great-circle fit needs at least one set point or circle",
        ));
    }
    let point_sum: Vector3 = points.iter().sum();

    let mut mean = match (points.is_empty(), forced_guess) {
        (false, _) => unit(&point_sum, "sum of set points")?,
        (true, Some(guess)) => guess.to_unit_vector(),
        (true, None) => {
            return Err(PaleomagError::invalid_input(
                "great-circle fit needs set points or a forced guess",
            ))
        }
    };

    let mut fitted = poles
        .iter()
        .map(|pole| v_close(pole, &mean))
        .collect::<Result<Vec<_>>>()?;
    let mut sum = point_sum + fitted.iter().sum::<Vector3>();

    let mut sweeps = 0;
    if !poles.is_empty() {
        loop {
            let mut max_change: f64 = 0.0;
            for (pole, point) in poles.iter().zip(fitted.iter_mut()) {
                sum -= *point;
                // A lone circle without set points keeps the previous mean
                if sum.norm() > MIN_RHO {
                    mean = sum.normalize();
                }
                let next = v_close(pole, &mean)?;
                max_change = max_change.max(angle_between(point, &next));
                sum += next;
                *point = next;
            }
            sweeps += 1;
            debug!("great-circle sweep {sweeps}: max change {max_change:.5} degrees");

            if max_change < config.convergence_tolerance {
                break;
            }
            if sweeps >= config.max_sweeps {
                warn!(
                    "great-circle fit stopped after {sweeps} sweeps (max change {max_change:.5} degrees)"
                );
                return Err(PaleomagError::non_convergence(sweeps, max_change));
            }
        }
    }

    let total = point_sum + fitted.iter().sum::<Vector3>();
    let mut mean_direction = dir(&total)?;
    mean_direction.intensity = 1.0;

    let fitted_directions = fitted
        .iter()
        .map(|v| dir(v).map(|d| Direction { intensity: 1.0, ..d }))
        .collect::<Result<Vec<_>>>()?;

    let statistics = combined_statistics(
        points.len(),
        fitted.len(),
        total.norm(),
        config.confidence,
    );

    Ok(GreatCircleFit {
        mean: mean_direction,
        fitted: fitted_directions,
        sweeps,
        n_points: points.len(),
        n_circles: fitted.len(),
        statistics,
    })
}

/// McFadden and McElhinny (1988) statistics for `m` set points and `n` circles.
fn combined_statistics(m: usize, n: usize, r: f64, confidence: f64) -> Option<GreatCircleStats> {
    let (mf, nf) = (m as f64, n as f64);
    let n_effective = mf + nf / 2.0;
    if n_effective <= 1.0 || r <= 0.0 {
        return None;
    }

    let spread = mf + nf - r;
    let kappa = if spread > 0.0 {
        (2.0 * mf + nf - 2.0) / (2.0 * spread)
    } else {
        f64::INFINITY
    };

    let p = 0.01 * (100.0 - confidence);
    let cos_a = 1.0 - (n_effective - 1.0) / (kappa * r) * (p.powf(-1.0 / (n_effective - 1.0)) - 1.0);

    Some(GreatCircleStats {
        n_effective,
        r,
        kappa,
        a95: cos_a.clamp(-1.0, 1.0).acos().to_degrees(),
    })
}
