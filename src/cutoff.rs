//! Iterative VGP outlier rejection.
//!
//! Each pass computes the Fisher mean of the accepted VGPs, finds the VGP
//! farthest from it and rejects that VGP (with its direction) unless the
//! stop rule of the selected [`CutoffMode`] holds:
//!
//! - [`CutoffMode::None`]: stop immediately.
//! - [`CutoffMode::Fixed45`]: stop when the largest angle is at most 45°.
//! - [`CutoffMode::Vandamme`]: stop when the largest angle is below
//!   `A = 1.8·ASD + 5`, with `ASD = sqrt(Σθ² / (n - 1))` (Vandamme, 1994).
//!
//! The loop ends because every rejection shrinks the accepted set, and it
//! never rejects below two remaining VGPs.
//!
//! Anything that carries a pole can be filtered: [`PairedVgp`] keeps each
//! direction with its VGP, while a bare [`Pole`] list runs the same rule on
//! VGP-only data.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::direction::{CoordinateReference, Direction, DirectionRecord, Pole, SiteLocation};
use crate::error::{PaleomagError, Result};
use crate::fisher::{angular_standard_deviation, Resultant, MIN_POINTS};
use crate::math::sphere::{angle_between, poles, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed cutoff angle in degrees.
pub const FIXED_CUTOFF: f64 = 45.0;

/// Outlier rejection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CutoffMode {
    /// Keep everything.
    #[default]
    None,
    /// Reject VGPs beyond 45 degrees from the mean.
    Fixed45,
    /// Adaptive Vandamme (1994) cutoff.
    Vandamme,
}

impl FromStr for CutoffMode {
    type Err = PaleomagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "45" => Ok(Self::Fixed45),
            "vandamme" => Ok(Self::Vandamme),
            other => Err(PaleomagError::invalid_input(format!(
                "unknown cutoff mode '{other}' (expected none, 45 or vandamme)"
            ))),
        }
    }
}

impl fmt::Display for CutoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Fixed45 => "45",
            Self::Vandamme => "vandamme",
        })
    }
}

/// A direction together with the VGP it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairedVgp {
    /// Site or sample direction.
    pub direction: Direction,
    /// Corresponding virtual geomagnetic pole.
    pub pole: Pole,
}

/// An item the cutoff can judge by its virtual geomagnetic pole.
pub trait HasPole {
    /// The pole this item is judged by.
    fn pole(&self) -> Pole;
}

impl HasPole for Pole {
    fn pole(&self) -> Pole {
        *self
    }
}

impl HasPole for PairedVgp {
    fn pole(&self) -> Pole {
        self.pole
    }
}

/// Outcome of a cutoff run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutoffResult<T = PairedVgp> {
    /// Retained items, in input order.
    pub accepted: Vec<T>,
    /// Rejected items, in rejection order.
    pub rejected: Vec<T>,
    /// Final cutoff angle: 45 for the fixed rule, `A` for Vandamme, `None` otherwise.
    pub cutoff: Option<f64>,
    /// Angular standard deviation of the accepted VGPs about their mean.
    pub scatter: f64,
    /// Mode that produced this result.
    pub mode: CutoffMode,
}

/// Pair each record's direction with its VGP at `site`.
///
/// # Errors
///
/// Returns an error for invalid record angles.
pub fn site_vgps(
    records: &[DirectionRecord],
    site: &SiteLocation,
    reference: CoordinateReference,
) -> Result<Vec<PairedVgp>> {
    records
        .iter()
        .map(|record| {
            let direction = record.direction(reference)?;
            Ok(PairedVgp {
                direction,
                pole: poles(site, &direction),
            })
        })
        .collect()
}

/// Scan of the accepted VGPs against their mean.
struct Scan {
    max_angle: f64,
    max_index: usize,
    asd: f64,
}

fn scan(vectors: &[Vector3]) -> Result<Scan> {
    let mean = Resultant::of_unit_vectors(vectors).mean()?.to_unit_vector();

    let mut max_angle = 0.0;
    let mut max_index = 0;
    for (i, v) in vectors.iter().enumerate() {
        let theta = angle_between(&mean, v);
        // Strict comparison: the first of tied points wins
        if theta > max_angle {
            max_angle = theta;
            max_index = i;
        }
    }

    Ok(Scan {
        max_angle,
        max_index,
        asd: angular_standard_deviation(vectors, &mean),
    })
}

/// Apply the cutoff rule to paired directions and VGPs, or to bare poles.
///
/// # Errors
///
/// Returns [`PaleomagError::InsufficientPoints`] for fewer than two items and
/// [`PaleomagError::DegenerateVector`] if the VGPs cancel out.
pub fn apply_cutoff<T>(points: &[T], mode: CutoffMode) -> Result<CutoffResult<T>>
where
    T: HasPole + Clone,
{
    if points.len() < MIN_POINTS {
        return Err(PaleomagError::insufficient_points(MIN_POINTS, points.len()));
    }

    let mut accepted = points.to_vec();
    let mut rejected = Vec::new();

    loop {
        let vectors: Vec<Vector3> = accepted.iter().map(|p| p.pole().to_unit_vector()).collect();
        let Scan {
            max_angle,
            max_index,
            asd,
        } = scan(&vectors)?;
        let threshold = 1.8 * asd + 5.0;

        let (stop, cutoff) = match mode {
            CutoffMode::None => (true, None),
            CutoffMode::Fixed45 => (max_angle <= FIXED_CUTOFF, Some(FIXED_CUTOFF)),
            CutoffMode::Vandamme => (max_angle < threshold, Some(threshold)),
        };

        if stop || accepted.len() <= MIN_POINTS {
            return Ok(CutoffResult {
                accepted,
                rejected,
                cutoff,
                scatter: asd,
                mode,
            });
        }

        let removed = accepted.remove(max_index);
        let pole = removed.pole();
        debug!(
            "{mode} cutoff rejected VGP ({:.2}, {:.2}) at {max_angle:.2} degrees; {} remain",
            pole.lon,
            pole.lat,
            accepted.len()
        );
        rejected.push(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::VgpRecord;
    use approx::assert_relative_eq;

    fn pairs_from_poles(coords: &[(f64, f64)]) -> Vec<PairedVgp> {
        coords
            .iter()
            .map(|&(lon, lat)| PairedVgp {
                direction: Direction::new(0.0, 45.0).unwrap(),
                pole: Pole::new(lon, lat).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("none".parse::<CutoffMode>().unwrap(), CutoffMode::None);
        assert_eq!("45".parse::<CutoffMode>().unwrap(), CutoffMode::Fixed45);
        assert_eq!("vandamme".parse::<CutoffMode>().unwrap(), CutoffMode::Vandamme);
        assert!("46".parse::<CutoffMode>().is_err());
        assert_eq!(CutoffMode::Vandamme.to_string(), "vandamme");
    }

    #[test]
    fn test_fixed_rejects_far_pole() {
        let mut coords: Vec<(f64, f64)> = (0..8).map(|i| (f64::from(i) * 45.0, 80.0)).collect();
        coords.push((0.0, 10.0));
        let result = apply_cutoff(&pairs_from_poles(&coords), CutoffMode::Fixed45).unwrap();

        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].pole.lat, 10.0);
        assert_eq!(result.accepted.len(), 8);
        assert_eq!(result.cutoff, Some(45.0));
    }

    #[test]
    fn test_none_keeps_everything() {
        let coords = [(0.0, 80.0), (180.0, -60.0), (90.0, 0.0)];
        let result = apply_cutoff(&pairs_from_poles(&coords), CutoffMode::None).unwrap();
        assert!(result.rejected.is_empty());
        assert_eq!(result.cutoff, None);
    }

    #[test]
    fn test_vandamme_idempotent() {
        let mut coords: Vec<(f64, f64)> = (0..12)
            .map(|i| (f64::from(i) * 30.0, 75.0 + f64::from(i % 3) * 4.0))
            .collect();
        coords.push((100.0, 20.0));
        coords.push((250.0, 35.0));

        let first = apply_cutoff(&pairs_from_poles(&coords), CutoffMode::Vandamme).unwrap();
        assert!(!first.rejected.is_empty());

        let second = apply_cutoff(&first.accepted, CutoffMode::Vandamme).unwrap();
        assert!(second.rejected.is_empty());
        assert_eq!(second.accepted, first.accepted);
        assert_eq!(second.cutoff, first.cutoff);
    }

    #[test]
    fn test_tie_rejects_first_point() {
        // Two coincident outliers at exactly the same distance from the mean.
        let mut coords: Vec<(f64, f64)> = (0..10).map(|i| (f64::from(i) * 36.0, 85.0)).collect();
        coords.push((0.0, 30.0));
        coords.push((0.0, 30.0));
        let points = pairs_from_poles(&coords);

        let vectors: Vec<Vector3> = points.iter().map(|p| p.pole.to_unit_vector()).collect();
        let s = scan(&vectors).unwrap();
        assert_eq!(s.max_index, 10);

        let result = apply_cutoff(&points, CutoffMode::Fixed45).unwrap();
        assert_eq!(result.rejected.len(), 2);
    }

    #[test]
    fn test_pole_only_cutoff_matches_paired() {
        let records: Vec<VgpRecord> = (0..8)
            .map(|i| VgpRecord {
                lon: f64::from(i) * 45.0,
                lat: 80.0,
            })
            .chain([VgpRecord { lon: 0.0, lat: 10.0 }])
            .collect();
        let poles: Vec<Pole> = records.iter().map(|r| r.pole().unwrap()).collect();

        let bare = apply_cutoff(&poles, CutoffMode::Fixed45).unwrap();
        assert_eq!(bare.rejected, vec![Pole::new(0.0, 10.0).unwrap()]);
        assert_eq!(bare.accepted, poles[..8].to_vec());

        let coords: Vec<(f64, f64)> = records.iter().map(|r| (r.lon, r.lat)).collect();
        let paired = apply_cutoff(&pairs_from_poles(&coords), CutoffMode::Fixed45).unwrap();
        let paired_poles: Vec<Pole> = paired.accepted.iter().map(HasPole::pole).collect();
        assert_eq!(paired_poles, bare.accepted);
        assert_relative_eq!(paired.scatter, bare.scatter, epsilon = 1e-12);
    }

    #[test]
    fn test_scatter_is_angular_standard_deviation() {
        let poles: Vec<Pole> = [0.0, 90.0, 180.0, 270.0]
            .iter()
            .map(|&lon| Pole::new(lon, 80.0).unwrap())
            .collect();
        let result = apply_cutoff(&poles, CutoffMode::None).unwrap();
        assert_relative_eq!(result.scatter, (400.0f64 / 3.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_never_below_two() {
        let coords = [(0.0, 80.0), (180.0, -80.0)];
        let result = apply_cutoff(&pairs_from_poles(&coords), CutoffMode::Fixed45).unwrap();
        assert_eq!(result.accepted.len(), 2);
        assert!(apply_cutoff(&pairs_from_poles(&coords[..1]), CutoffMode::Fixed45).is_err());
    }
}
