//! Spherical geometry for directional data.
//!
//! Conversions between (declination, inclination) pairs and Cartesian
//! vectors, angular distances, and the direction/VGP transforms.

use crate::direction::{Direction, Pole, SiteLocation};
use crate::error::{PaleomagError, Result};

/// Cartesian vector (x = north, y = east, z = down).
pub type Vector3 = nalgebra::Vector3<f64>;

/// Inclination substituted for exactly vertical directions before the pole
/// formula, whose colatitude term is singular at 90 degrees.
pub const POLE_INCLINATION_LIMIT: f64 = 89.99;

/// Cartesian coordinates of a direction.
///
/// `x = I·cos(dec)·cos(inc)`, `y = I·sin(dec)·cos(inc)`, `z = I·sin(inc)`.
#[must_use]
pub fn cart(dec: f64, inc: f64, intensity: f64) -> Vector3 {
    let (dec, inc) = (dec.to_radians(), inc.to_radians());
    Vector3::new(
        intensity * dec.cos() * inc.cos(),
        intensity * dec.sin() * inc.cos(),
        intensity * inc.sin(),
    )
}

/// Direction of a Cartesian vector, with its length as intensity.
///
/// # Errors
///
/// Returns [`PaleomagError::DegenerateVector`] for a zero (or non-finite) vector.
pub fn dir(v: &Vector3) -> Result<Direction> {
    let r = v.norm();
    if !(r.is_finite() && r > 0.0) {
        return Err(PaleomagError::degenerate_vector(format!(
            "vector ({}, {}, {}) has no direction",
            v.x, v.y, v.z
        )));
    }
    let dec = (360.0 + v.y.atan2(v.x).to_degrees()) % 360.0;
    let inc = (v.z / r).clamp(-1.0, 1.0).asin().to_degrees();
    Ok(Direction {
        dec,
        inc,
        intensity: r,
    })
}

/// Angle in degrees between two vectors, `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` so rounding never produces NaN.
#[must_use]
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle in degrees between two directions given as declination/inclination.
#[must_use]
pub fn angle(dec1: f64, inc1: f64, dec2: f64, inc2: f64) -> f64 {
    angle_between(&cart(dec1, inc1, 1.0), &cart(dec2, inc2, 1.0))
}

/// Virtual geomagnetic pole for a direction observed at a site.
#[must_use]
pub fn poles(site: &SiteLocation, direction: &Direction) -> Pole {
    let inc = if direction.inc >= 90.0 {
        POLE_INCLINATION_LIMIT
    } else {
        direction.inc
    };

    let slat = site.lat.to_radians();
    let dec = direction.dec.to_radians();
    let inc = inc.to_radians();

    // Magnetic colatitude from the dipole formula tan(I) = 2 cot(p)
    let p = 2.0_f64.atan2(inc.tan());

    let plat = (slat.sin() * p.cos() + slat.cos() * p.sin() * dec.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let beta = (p.sin() * dec.sin() / plat.cos()).clamp(-1.0, 1.0).asin();

    let plon = if p.cos() >= slat.sin() * plat.sin() {
        site.lon.to_radians() + beta
    } else {
        site.lon.to_radians() + std::f64::consts::PI - beta
    };

    Pole {
        lon: plon.to_degrees().rem_euclid(360.0),
        lat: plat.to_degrees(),
    }
}

/// Expected direction at a site for a given pole (inverse of [`poles`]).
#[must_use]
pub fn inv_poles(site: &SiteLocation, pole: &Pole) -> Direction {
    let slat = site.lat.to_radians();
    let plat = pole.lat.to_radians();
    let dlon = (pole.lon - site.lon).to_radians();

    let cos_p = (slat.sin() * plat.sin() + slat.cos() * plat.cos() * dlon.cos()).clamp(-1.0, 1.0);
    let p = cos_p.acos();

    let inc = (2.0 * p.cos()).atan2(p.sin()).to_degrees();
    let dec = (dlon.sin() * plat.cos())
        .atan2(slat.cos() * plat.sin() - slat.sin() * plat.cos() * dlon.cos())
        .to_degrees()
        .rem_euclid(360.0);

    Direction {
        dec,
        inc,
        intensity: 1.0,
    }
}

/// Normalize a vector to unit length.
///
/// # Errors
///
/// Returns [`PaleomagError::DegenerateVector`] for a zero vector.
pub fn unit(v: &Vector3, context: &str) -> Result<Vector3> {
    let norm = v.norm();
    if !(norm.is_finite() && norm > 0.0) {
        return Err(PaleomagError::degenerate_vector(context));
    }
    Ok(v / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Declination difference folded into `[0, 180]`.
    fn dec_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn test_cart_axes() {
        let north = cart(0.0, 0.0, 1.0);
        assert_relative_eq!(north.x, 1.0);
        let east = cart(90.0, 0.0, 1.0);
        assert_relative_eq!(east.y, 1.0, epsilon = 1e-15);
        let down = cart(0.0, 90.0, 2.0);
        assert_relative_eq!(down.z, 2.0);
    }

    #[test]
    fn test_dir_cart_round_trip() {
        for &(dec, inc) in &[(0.0, 0.0), (12.5, 45.0), (359.9, -89.0), (181.0, 60.0), (270.0, -15.0)] {
            let d = dir(&cart(dec, inc, 1.0)).unwrap();
            assert!(dec_diff(d.dec, dec) < 1e-9, "dec {dec} -> {}", d.dec);
            assert_relative_eq!(d.inc, inc, epsilon = 1e-9);
            assert_relative_eq!(d.intensity, 1.0, epsilon = 1e-12);
        }

        let v = Vector3::new(0.3, -1.2, 2.5);
        let back = dir(&v).unwrap().to_vector();
        assert_relative_eq!(back, v, epsilon = 1e-12);
    }

    #[test]
    fn test_dir_zero_vector() {
        assert!(matches!(
            dir(&Vector3::zeros()),
            Err(PaleomagError::DegenerateVector { .. })
        ));
    }

    #[test]
    fn test_angle() {
        assert_relative_eq!(angle(0.0, 0.0, 90.0, 0.0), 90.0, epsilon = 1e-12);
        assert_relative_eq!(angle(10.0, 20.0, 190.0, -20.0), 180.0, epsilon = 1e-6);
        // Identical directions must not produce NaN from a cosine of 1 + eps.
        let same = angle(33.3, 44.4, 33.3, 44.4);
        assert!(same.is_finite() && same < 1e-6);
    }

    #[test]
    fn test_poles_equatorial_site() {
        let site = SiteLocation::new(0.0, 0.0).unwrap();
        let pole = poles(&site, &Direction::new(0.0, 0.0).unwrap());
        assert_relative_eq!(pole.lat, 90.0, epsilon = 1e-9);

        // Vertical direction is clamped instead of blowing up.
        let vertical = poles(&site, &Direction::new(0.0, 90.0).unwrap());
        assert!(vertical.lat.is_finite() && vertical.lon.is_finite());
        assert!(vertical.lat.abs() < 0.1);
    }

    #[test]
    fn test_poles_inverse() {
        let site = SiteLocation::new(45.0, 10.0).unwrap();
        for &(dec, inc) in &[(20.0, 40.0), (200.0, -55.0), (340.0, 70.0)] {
            let direction = Direction::new(dec, inc).unwrap();
            let pole = poles(&site, &direction);
            let back = inv_poles(&site, &pole);
            assert!(dec_diff(back.dec, dec) < 1e-8, "dec {dec} -> {}", back.dec);
            assert_relative_eq!(back.inc, inc, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_geocentric_axial_dipole() {
        // A GAD field at latitude 30 has inclination atan(2 tan 30).
        let site = SiteLocation::new(30.0, 100.0).unwrap();
        let north = Pole::new(0.0, 90.0).unwrap();
        let d = inv_poles(&site, &north);
        assert_relative_eq!(d.inc, (2.0 * 30f64.to_radians().tan()).atan().to_degrees(), epsilon = 1e-9);
        assert!(dec_diff(d.dec, 0.0) < 1e-9);
    }
}
