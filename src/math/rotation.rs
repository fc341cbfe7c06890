//! Frame rotations for specimen and bedding corrections.
//!
//! All rotations use the single matrix of Tauxe (Appendix A.13) that maps
//! specimen axes onto geographic axes given the azimuth and plunge of the
//! specimen x-axis. Bedding correction is composed from three such rotations.

use nalgebra::Matrix3;

use crate::math::sphere::Vector3;

/// Rotation matrix taking specimen coordinates to a frame whose x-axis
/// points along `azimuth`/`plunge` (degrees).
#[must_use]
#[rustfmt::skip]
pub fn rotation_matrix(azimuth: f64, plunge: f64) -> Matrix3<f64> {
    let (az, pl) = (azimuth.to_radians(), plunge.to_radians());
    Matrix3::new(
        pl.cos() * az.cos(), -az.sin(), -pl.sin() * az.cos(),
        pl.cos() * az.sin(), az.cos(), -pl.sin() * az.sin(),
        pl.sin(), 0.0, pl.cos(),
    )
}

/// Rotate a vector from specimen axes into the frame given by the x-axis
/// `azimuth` and `plunge`.
#[must_use]
pub fn rotate_to(azimuth: f64, plunge: f64, v: &Vector3) -> Vector3 {
    rotation_matrix(azimuth, plunge) * v
}

/// Restore a geographic vector to paleohorizontal.
///
/// The dip direction (`strike + 90`, right-hand rule) is first removed from
/// the declination, the bed is untilted about the strike axis, and the dip
/// direction is added back.
#[must_use]
pub fn correct_bedding(strike: f64, dip: f64, v: &Vector3) -> Vector3 {
    if dip == 0.0 {
        return *v;
    }
    let dip_direction = strike + 90.0;
    let to_dip_frame = rotation_matrix(-dip_direction, 0.0);
    let untilt = rotation_matrix(0.0, -dip);
    let from_dip_frame = rotation_matrix(dip_direction, 0.0);
    from_dip_frame * untilt * to_dip_frame * v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sphere::{cart, dir};
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_orientation() {
        let v = Vector3::new(0.2, -0.4, 0.9);
        assert_relative_eq!(rotate_to(0.0, 0.0, &v), v, epsilon = 1e-15);
    }

    #[test]
    fn test_rotation_is_orthonormal() {
        let m = rotation_matrix(123.0, 37.0);
        assert_relative_eq!(m * m.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_specimen_x_axis_follows_orientation() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let rotated = dir(&rotate_to(250.0, 30.0, &x)).unwrap();
        assert_relative_eq!(rotated.dec, 250.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.inc, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bedding_correction() {
        // Strike 0, dip 40 to the east: an east-plunging in-bed vector becomes horizontal.
        let v = cart(90.0, 40.0, 1.0);
        let corrected = dir(&correct_bedding(0.0, 40.0, &v)).unwrap();
        assert_relative_eq!(corrected.dec, 90.0, epsilon = 1e-9);
        assert_relative_eq!(corrected.inc, 0.0, epsilon = 1e-9);

        // The bedding pole restores to vertical.
        let pole = cart(270.0, 50.0, 1.0);
        let corrected = dir(&correct_bedding(0.0, 40.0, &pole)).unwrap();
        assert_relative_eq!(corrected.inc, 90.0, epsilon = 1e-5);

        // Strike-parallel vectors are unaffected.
        let along_strike = cart(0.0, 0.0, 1.0);
        assert_relative_eq!(
            correct_bedding(0.0, 40.0, &along_strike),
            along_strike,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_flat_bedding_is_identity() {
        let v = cart(10.0, 20.0, 1.0);
        assert_eq!(correct_bedding(123.0, 0.0, &v), v);
    }
}
