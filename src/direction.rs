//! Directional data structures.
//!
//! This module defines the value types exchanged with callers: magnetic
//! [`Direction`]s, virtual geomagnetic [`Pole`]s, sampling [`SiteLocation`]s
//! and the raw [`DirectionRecord`] tuple supplied by import layers.
//!
//! # Conventions
//!
//! | Quantity | Range | Notes |
//! |----------|-------|-------|
//! | declination | `[0, 360)` | clockwise from north |
//! | inclination | `[-90, 90]` | positive downward |
//! | pole longitude | `[0, 360)` | east of Greenwich |
//! | pole latitude | `[-90, 90]` | |
//!
//! Cartesian vectors use x = north, y = east, z = down.

use crate::error::{PaleomagError, Result};
use crate::math::rotation::correct_bedding;
use crate::math::sphere::{cart, dir, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reference frame a direction is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateReference {
    /// Specimen (laboratory) axes.
    Specimen,
    /// Geographic coordinates after core orientation.
    #[default]
    Geographic,
    /// Tectonic coordinates after bedding correction.
    Tectonic,
}

/// A magnetic direction with an optional intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Direction {
    /// Declination in degrees, `[0, 360)`.
    pub dec: f64,
    /// Inclination in degrees, `[-90, 90]`.
    pub inc: f64,
    /// Vector length. `1.0` for unit directions.
    pub intensity: f64,
}

impl Direction {
    /// Create a unit direction.
    ///
    /// # Errors
    ///
    /// Returns [`PaleomagError::InvalidInput`] if the declination is outside
    /// `[0, 360)` or the inclination outside `[-90, 90]`.
    pub fn new(dec: f64, inc: f64) -> Result<Self> {
        if !(0.0..360.0).contains(&dec) {
            return Err(PaleomagError::invalid_input(format!(
                "declination {dec} outside [0, 360)"
            )));
        }
        if !(-90.0..=90.0).contains(&inc) {
            return Err(PaleomagError::invalid_input(format!(
                "inclination {inc} outside [-90, 90]"
            )));
        }
        Ok(Self {
            dec,
            inc,
            intensity: 1.0,
        })
    }

    /// Attach an intensity to the direction.
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite intensities.
    pub fn with_intensity(mut self, intensity: f64) -> Result<Self> {
        if !(intensity.is_finite() && intensity >= 0.0) {
            return Err(PaleomagError::invalid_input(format!(
                "intensity {intensity} must be finite and non-negative"
            )));
        }
        self.intensity = intensity;
        Ok(self)
    }

    /// Cartesian vector scaled by the intensity.
    #[must_use]
    pub fn to_vector(&self) -> Vector3 {
        cart(self.dec, self.inc, self.intensity)
    }

    /// Unit Cartesian vector, ignoring intensity.
    #[must_use]
    pub fn to_unit_vector(&self) -> Vector3 {
        cart(self.dec, self.inc, 1.0)
    }

    /// The antipodal direction.
    #[must_use]
    pub fn flip(&self) -> Self {
        Self {
            dec: (self.dec + 180.0) % 360.0,
            inc: -self.inc,
            intensity: self.intensity,
        }
    }

    /// Same axis, lower hemisphere (`inc >= 0`).
    #[must_use]
    pub fn lower_hemisphere(&self) -> Self {
        if self.inc < 0.0 {
            self.flip()
        } else {
            *self
        }
    }
}

/// A virtual geomagnetic pole.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pole {
    /// Longitude in degrees, `[0, 360)`.
    pub lon: f64,
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
}

impl Pole {
    /// Create a pole, wrapping the longitude into `[0, 360)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the latitude is outside `[-90, 90]` or the
    /// longitude is not finite.
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !lon.is_finite() {
            return Err(PaleomagError::invalid_input(format!(
                "longitude {lon} is not finite"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PaleomagError::invalid_input(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        Ok(Self {
            lon: lon.rem_euclid(360.0),
            lat,
        })
    }

    /// Unit vector of the pole (longitude as declination, latitude as inclination).
    #[must_use]
    pub fn to_unit_vector(&self) -> Vector3 {
        cart(self.lon, self.lat, 1.0)
    }

    /// Pole position read back from a Cartesian vector.
    ///
    /// # Errors
    ///
    /// Returns [`PaleomagError::DegenerateVector`] for a zero vector.
    pub fn from_vector(v: &Vector3) -> Result<Self> {
        let d = dir(v)?;
        Ok(Self {
            lon: d.dec,
            lat: d.inc,
        })
    }
}

/// Geographic position of a sampling site.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiteLocation {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl SiteLocation {
    /// Create a site location.
    ///
    /// # Errors
    ///
    /// Returns an error if the latitude is outside `[-90, 90]`.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !lon.is_finite() {
            return Err(PaleomagError::invalid_input(format!(
                "site ({lat}, {lon}) is not a valid position"
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// Raw input tuple: `(declination, inclination, bedding strike, bedding dip, label)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectionRecord {
    /// Geographic declination in degrees.
    pub dec: f64,
    /// Geographic inclination in degrees.
    pub inc: f64,
    /// Bedding strike (right-hand rule) in degrees.
    pub strike: f64,
    /// Bedding dip in degrees.
    pub dip: f64,
    /// Free-form sample label.
    pub label: String,
}

impl DirectionRecord {
    /// Create a record.
    pub fn new(dec: f64, inc: f64, strike: f64, dip: f64, label: impl Into<String>) -> Self {
        Self {
            dec,
            inc,
            strike,
            dip,
            label: label.into(),
        }
    }

    /// The record's direction in the requested reference frame.
    ///
    /// # Errors
    ///
    /// Returns [`PaleomagError::InvalidInput`] for out-of-range angles or
    /// when specimen coordinates are requested (records are geographic).
    pub fn direction(&self, reference: CoordinateReference) -> Result<Direction> {
        let geographic = Direction::new(self.dec, self.inc)?;
        match reference {
            CoordinateReference::Geographic => Ok(geographic),
            CoordinateReference::Tectonic => {
                if !(0.0..=90.0).contains(&self.dip) {
                    return Err(PaleomagError::invalid_input(format!(
                        "bedding dip {} outside [0, 90] for '{}'",
                        self.dip, self.label
                    )));
                }
                dir(&correct_bedding(
                    self.strike,
                    self.dip,
                    &geographic.to_unit_vector(),
                ))
            }
            CoordinateReference::Specimen => Err(PaleomagError::invalid_input(
                "direction records carry no specimen orientation",
            )),
        }
    }
}

/// VGP input tuple `(longitude, latitude, 0, 0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VgpRecord {
    /// Pole longitude in degrees.
    pub lon: f64,
    /// Pole latitude in degrees.
    pub lat: f64,
}

impl VgpRecord {
    /// Validate into a [`Pole`].
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range latitude.
    pub fn pole(&self) -> Result<Pole> {
        Pole::new(self.lon, self.lat)
    }
}
