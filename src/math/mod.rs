//! Mathematical utilities for directional statistics.
//!
//! This module provides:
//! - [`sphere`]: Cartesian and spherical conversions, VGP transforms
//! - [`rotation`]: Specimen-to-geographic rotation and bedding correction
//! - [`linalg`]: Orientation matrix and eigendecomposition

pub mod linalg;
pub mod rotation;
pub mod sphere;

pub use linalg::{decompose, eigenvalues, orientation_matrix, EigenResult};
pub use rotation::{correct_bedding, rotate_to, rotation_matrix};
pub use sphere::{angle, angle_between, cart, dir, inv_poles, poles, Vector3};
