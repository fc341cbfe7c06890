//! Principal component analysis of demagnetization trajectories.
//!
//! Fits a line (magnetization component) or a plane (great circle) to the
//! included steps of a specimen's stepwise demagnetization (Kirschvink, 1980).
//!
//! # Pipeline
//!
//! 1. Rotate included steps from specimen to the requested frame
//! 2. Anchored fits: add the negation of every step (fit through the origin)
//! 3. Free fits: subtract the centroid
//! 4. Decompose the orientation matrix of the centered cloud
//! 5. Major eigenvector for lines, minor eigenvector for planes
//! 6. Orient the result along the demagnetization path (first minus last step)
//! 7. Maximum angular deviation from the eigenvalues

use crate::direction::{CoordinateReference, Direction};
use crate::error::{PaleomagError, Result};
use crate::math::linalg::{decompose, orientation_matrix};
use crate::math::rotation::{correct_bedding, rotate_to};
use crate::math::sphere::{dir, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum included steps for a line fit.
pub const MIN_LINE_POINTS: usize = 2;

/// Minimum included steps for a plane fit.
pub const MIN_PLANE_POINTS: usize = 3;

/// One demagnetization step of a specimen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DemagnetizationStep {
    /// Remanence vector in specimen coordinates.
    pub vector: Vector3,
    /// Step label (e.g. `"NRM"`, `"TH350"`).
    pub step: String,
    /// Whether the step takes part in the fit.
    pub include: bool,
    /// Whether the step is shown by plotting layers.
    pub visible: bool,
}

impl DemagnetizationStep {
    /// An included, visible step.
    pub fn new(step: impl Into<String>, vector: Vector3) -> Self {
        Self {
            vector,
            step: step.into(),
            include: true,
            visible: true,
        }
    }

    /// Exclude the step from fits.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.include = false;
        self
    }
}

/// Field orientation of a specimen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpecimenOrientation {
    /// Azimuth of the specimen x-axis, degrees.
    pub azimuth: f64,
    /// Plunge of the specimen x-axis, degrees (positive down).
    pub plunge: f64,
    /// Bedding strike (right-hand rule), degrees.
    pub bedding_strike: f64,
    /// Bedding dip, degrees.
    pub bedding_dip: f64,
}

impl SpecimenOrientation {
    /// Express a specimen-frame vector in the requested frame.
    #[must_use]
    pub fn to_reference(&self, v: &Vector3, reference: CoordinateReference) -> Vector3 {
        match reference {
            CoordinateReference::Specimen => *v,
            CoordinateReference::Geographic => rotate_to(self.azimuth, self.plunge, v),
            CoordinateReference::Tectonic => correct_bedding(
                self.bedding_strike,
                self.bedding_dip,
                &rotate_to(self.azimuth, self.plunge, v),
            ),
        }
    }
}

/// Geometry of a fitted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitType {
    /// Linear component (major eigenvector).
    #[default]
    Line,
    /// Great-circle plane, reported by its pole (minor eigenvector).
    Plane,
}

impl FitType {
    /// Minimum number of included steps.
    #[must_use]
    pub const fn min_points(self) -> usize {
        match self {
            Self::Line => MIN_LINE_POINTS,
            Self::Plane => MIN_PLANE_POINTS,
        }
    }
}

/// Options for a PCA fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PcaOptions {
    /// Line or plane.
    pub fit: FitType,
    /// Force the fit through the origin.
    pub anchored: bool,
    /// Frame of the returned direction.
    pub reference: CoordinateReference,
}

/// A fitted magnetization component.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PcaComponent {
    /// Line direction, or pole to the plane.
    pub direction: Direction,
    /// Maximum angular deviation, degrees.
    pub mad: f64,
    /// Line or plane.
    pub fit: FitType,
    /// Whether the fit was forced through the origin. The MAD of a forced
    /// fit describes the mirrored cloud, not the measured steps alone.
    pub forced: bool,
    /// Line: length of the demagnetization span along the direction.
    /// Plane: length of the span between first and last step.
    pub intensity: f64,
    /// Centroid of the fitted steps (zero for forced fits).
    pub centroid: Vector3,
    /// Number of included steps.
    pub n_steps: usize,
    /// Frame of `direction` and `centroid`.
    pub reference: CoordinateReference,
}

/// Fit a line or plane to the included demagnetization steps.
///
/// # Errors
///
/// Returns [`PaleomagError::InsufficientPoints`] with fewer than 2 included
/// steps for a line or 3 for a plane, and
/// [`PaleomagError::DegenerateVector`] if all steps coincide.
pub fn fit_component(
    steps: &[DemagnetizationStep],
    orientation: &SpecimenOrientation,
    options: &PcaOptions,
) -> Result<PcaComponent> {
    let points: Vec<Vector3> = steps
        .iter()
        .filter(|s| s.include)
        .map(|s| orientation.to_reference(&s.vector, options.reference))
        .collect();

    let n = points.len();
    let min = options.fit.min_points();
    if n < min {
        return Err(PaleomagError::insufficient_points(min, n));
    }

    // Demagnetization path from first to last included step
    let control = points[0] - points[n - 1];

    let cloud: Vec<Vector3> = if options.anchored {
        points.iter().flat_map(|p| [*p, -p]).collect()
    } else {
        points.clone()
    };

    let centroid = cloud.iter().sum::<Vector3>() / cloud.len() as f64;
    let centered: Vec<Vector3> = cloud.iter().map(|p| p - centroid).collect();

    let eigen = decompose(&orientation_matrix(&centered))?;
    let [t1, t2, t3] = eigen.tau;

    let mut vector = match options.fit {
        FitType::Line => eigen.major(),
        FitType::Plane => eigen.minor(),
    };
    if vector.dot(&control) <= 0.0 {
        vector = -vector;
    }

    let mad = match options.fit {
        FitType::Line => ((t2 + t3).sqrt() / t1.sqrt()).atan().to_degrees(),
        FitType::Plane => (t3 / t2 + t3 / t1).sqrt().atan().to_degrees(),
    };

    let intensity = match options.fit {
        FitType::Line => control.dot(&vector).abs(),
        FitType::Plane => control.norm(),
    };

    let mut direction = dir(&vector)?;
    direction.intensity = 1.0;

    Ok(PcaComponent {
        direction,
        mad: if mad.is_nan() { 0.0 } else { mad },
        fit: options.fit,
        forced: options.anchored,
        intensity,
        centroid,
        n_steps: n,
        reference: options.reference,
    })
}
