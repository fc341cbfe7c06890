//! Fisher statistics for directions and virtual geomagnetic poles.
//!
//! # Quantities
//!
//! | Symbol | Formula |
//! |--------|---------|
//! | R | length of the resultant of N unit vectors |
//! | κ | `(N - 1) / (N - R)`, infinite when `R == N` |
//! | a95 | `acos(1 - (p^(-1/(N-1)) - 1)(N - R)/R)` with `p = 1 - confidence/100` |
//! | CSD | `81 / sqrt(κ)` |
//! | ASD | `sqrt(Σθ² / (N - 1))`, θ the angle of each vector from the mean |
//! | A95min / A95max | `12·N^-0.40` / `82·N^-0.63` (Deenen et al., 2011) |
//!
//! Results are tagged by what was averaged: [`FisherResult::Direction`] for
//! site or sample directions, [`FisherResult::Vgp`] for poles, which adds
//! the PSV reliability envelope.

use log::warn;

use crate::direction::{Direction, Pole};
use crate::error::{PaleomagError, Result};
use crate::math::linalg::{decompose, orientation_matrix};
use crate::math::sphere::{angle_between, dir, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum population size for dispersion and confidence estimates.
pub const MIN_POINTS: usize = 2;

/// Statistics shared by every Fisher mean.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FisherStats {
    /// Number of unit vectors.
    pub n: usize,
    /// Resultant length, `R <= N`.
    pub r: f64,
    /// Precision parameter κ. `f64::INFINITY` for perfectly clustered data.
    pub kappa: f64,
    /// Confidence cone half-angle (a95 for directions, A95 for poles), degrees.
    pub a95: f64,
    /// Circular standard deviation, degrees.
    pub csd: f64,
}

/// PSV reliability envelope for a VGP population.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PsvBounds {
    /// Lower bound on A95 for the given N.
    pub a95_min: f64,
    /// Upper bound on A95 for the given N.
    pub a95_max: f64,
}

/// How a VGP population's A95 compares with the PSV envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PsvAssessment {
    /// A95 below A95min: secular variation is not averaged.
    UnderRepresented,
    /// A95 within the envelope.
    Consistent,
    /// A95 above A95max: scatter beyond secular variation.
    ExcessScatter,
}

/// Fisher mean of a population of directions or poles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FisherResult {
    /// Mean of magnetic directions.
    Direction {
        /// Mean declination/inclination.
        mean: Direction,
        /// Dispersion and confidence.
        stats: FisherStats,
    },
    /// Mean of virtual geomagnetic poles.
    Vgp {
        /// Mean pole position.
        mean: Pole,
        /// Dispersion and confidence (a95 is A95).
        stats: FisherStats,
        /// A95min/A95max envelope.
        psv: PsvBounds,
        /// Angular standard deviation of the VGPs about the mean, degrees.
        asd: f64,
    },
}

impl FisherResult {
    /// Statistics common to both variants.
    #[must_use]
    pub const fn stats(&self) -> &FisherStats {
        match self {
            Self::Direction { stats, .. } | Self::Vgp { stats, .. } => stats,
        }
    }

    /// Unit vector of the mean.
    #[must_use]
    pub fn mean_vector(&self) -> Vector3 {
        match self {
            Self::Direction { mean, .. } => mean.to_unit_vector(),
            Self::Vgp { mean, .. } => mean.to_unit_vector(),
        }
    }

    /// Deenen et al. (2011) assessment; `None` for direction means.
    #[must_use]
    pub fn psv_assessment(&self) -> Option<PsvAssessment> {
        match self {
            Self::Direction { .. } => None,
            Self::Vgp { stats, psv, .. } => Some(if stats.a95 < psv.a95_min {
                PsvAssessment::UnderRepresented
            } else if stats.a95 > psv.a95_max {
                PsvAssessment::ExcessScatter
            } else {
                PsvAssessment::Consistent
            }),
        }
    }
}

/// Resultant of a set of unit vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resultant {
    /// Vector sum.
    pub sum: Vector3,
    /// Number of vectors summed.
    pub n: usize,
}

impl Resultant {
    /// Sum unit copies of `vectors`. Zero vectors carry no direction and are skipped.
    #[must_use]
    pub fn of_unit_vectors(vectors: &[Vector3]) -> Self {
        vectors
            .iter()
            .filter(|v| v.norm() > 0.0)
            .fold(Self { sum: Vector3::zeros(), n: 0 }, |acc, v| Self {
                sum: acc.sum + v.normalize(),
                n: acc.n + 1,
            })
    }

    /// Resultant length R.
    #[must_use]
    pub fn r(&self) -> f64 {
        self.sum.norm()
    }

    /// Mean direction.
    ///
    /// # Errors
    ///
    /// Returns [`PaleomagError::DegenerateVector`] if the vectors cancel.
    pub fn mean(&self) -> Result<Direction> {
        let mut mean = dir(&self.sum)?;
        mean.intensity = 1.0;
        Ok(mean)
    }
}

/// Fisher mean direction of a set of directions (intensities ignored).
///
/// # Errors
///
/// Returns an error for an empty set or a vanishing resultant.
pub fn mean_direction(directions: &[Direction]) -> Result<Direction> {
    if directions.is_empty() {
        return Err(PaleomagError::insufficient_points(1, 0));
    }
    let vectors: Vec<Vector3> = directions.iter().map(Direction::to_unit_vector).collect();
    Resultant::of_unit_vectors(&vectors).mean()
}

/// Fisher precision parameter `κ = (N - 1) / (N - R)`.
///
/// Returns `f64::INFINITY` when `R >= N` (all vectors parallel).
#[must_use]
pub fn dispersion(n: usize, r: f64) -> f64 {
    let n = n as f64;
    if r >= n {
        return f64::INFINITY;
    }
    (n - 1.0) / (n - r)
}

/// Half-angle (degrees) of the confidence cone about a Fisher mean.
///
/// The cosine is clamped to `[-1, 1]`, so very dispersed small populations
/// report a 180 degree cone.
///
/// # Errors
///
/// Returns an error if `n < 2`, `r` is not positive, or the confidence is
/// outside `(0, 100)`.
pub fn confidence_cone(n: usize, r: f64, confidence: f64) -> Result<f64> {
    if n < MIN_POINTS {
        return Err(PaleomagError::insufficient_points(MIN_POINTS, n));
    }
    if !(r > 0.0) {
        return Err(PaleomagError::invalid_input(
            "resultant length must be positive",
        ));
    }
    if !(confidence > 0.0 && confidence < 100.0) {
        return Err(PaleomagError::invalid_input(format!(
            "confidence {confidence} outside (0, 100)"
        )));
    }

    let nf = n as f64;
    let p = 0.01 * (100.0 - confidence);
    let cos_a = 1.0 - (p.powf(-1.0 / (nf - 1.0)) - 1.0) * (nf - r).max(0.0) / r;
    if cos_a < -1.0 {
        warn!("confidence cone for N={n}, R={r:.4} exceeds the sphere; clamping to 180");
    }
    Ok(cos_a.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Circular standard deviation `81 / sqrt(κ)` in degrees.
#[must_use]
pub fn circular_standard_deviation(kappa: f64) -> f64 {
    if kappa.is_infinite() {
        0.0
    } else {
        81.0 / kappa.sqrt()
    }
}

/// Angular standard deviation `sqrt(Σθ² / (N - 1))` in degrees of unit
/// vectors about `mean`.
///
/// Returns 0 for fewer than two vectors.
#[must_use]
pub fn angular_standard_deviation(vectors: &[Vector3], mean: &Vector3) -> f64 {
    if vectors.len() < MIN_POINTS {
        return 0.0;
    }
    let sum_squares: f64 = vectors
        .iter()
        .map(|v| angle_between(mean, v).powi(2))
        .sum();
    (sum_squares / (vectors.len() - 1) as f64).sqrt()
}

/// A95 envelope expected from palaeosecular variation (Deenen et al., 2011).
#[must_use]
pub fn psv_bounds(n: usize) -> PsvBounds {
    let nf = n as f64;
    PsvBounds {
        a95_min: 12.0 * nf.powf(-0.40),
        a95_max: 82.0 * nf.powf(-0.63),
    }
}

/// Fisher statistics of a set of unit vectors.
///
/// # Errors
///
/// Returns an error for fewer than two vectors or a vanishing resultant.
pub fn fisher_stats(vectors: &[Vector3], confidence: f64) -> Result<(Direction, FisherStats)> {
    if vectors.len() < MIN_POINTS {
        return Err(PaleomagError::insufficient_points(MIN_POINTS, vectors.len()));
    }
    let resultant = Resultant::of_unit_vectors(vectors);
    let mean = resultant.mean()?;
    let (n, r) = (resultant.n, resultant.r());
    let kappa = dispersion(n, r);

    Ok((
        mean,
        FisherStats {
            n,
            r,
            kappa,
            a95: confidence_cone(n, r, confidence)?,
            csd: circular_standard_deviation(kappa),
        },
    ))
}

/// Fisher mean and statistics of directions.
///
/// # Errors
///
/// Returns an error for fewer than two directions or a vanishing resultant.
pub fn fisher_directions(directions: &[Direction], confidence: f64) -> Result<FisherResult> {
    let vectors: Vec<Vector3> = directions.iter().map(Direction::to_unit_vector).collect();
    let (mean, stats) = fisher_stats(&vectors, confidence)?;
    Ok(FisherResult::Direction { mean, stats })
}

/// Fisher mean and statistics of virtual geomagnetic poles.
///
/// # Errors
///
/// Returns an error for fewer than two poles or a vanishing resultant.
pub fn fisher_vgps(poles: &[Pole], confidence: f64) -> Result<FisherResult> {
    let vectors: Vec<Vector3> = poles.iter().map(Pole::to_unit_vector).collect();
    let (mean, stats) = fisher_stats(&vectors, confidence)?;
    Ok(FisherResult::Vgp {
        mean: Pole {
            lon: mean.dec,
            lat: mean.inc,
        },
        stats,
        psv: psv_bounds(stats.n),
        asd: angular_standard_deviation(&vectors, &mean.to_unit_vector()),
    })
}

/// Map mixed-polarity directions onto a single polarity.
///
/// The principal axis of the orientation matrix is oriented toward the
/// majority of the directions; directions more than 90 degrees from it are
/// replaced by their antipodes.
///
/// # Errors
///
/// Returns an error for an empty input.
pub fn to_normal_polarity(directions: &[Direction]) -> Result<Vec<Direction>> {
    let vectors: Vec<Vector3> = directions.iter().map(Direction::to_unit_vector).collect();
    let eigen = decompose(&orientation_matrix(&vectors))?;

    let mut axis = eigen.major();
    let votes: i64 = vectors
        .iter()
        .map(|v| if v.dot(&axis) >= 0.0 { 1 } else { -1 })
        .sum();
    if votes < 0 {
        axis = -axis;
    }

    Ok(directions
        .iter()
        .zip(vectors.iter())
        .map(|(d, v)| if v.dot(&axis) < 0.0 { d.flip() } else { *d })
        .collect())
}
