//! Random sampling from the Fisher distribution.
//!
//! Deviates use inverse-CDF sampling of the colatitude and a uniform
//! azimuth. Every Monte Carlo work unit seeds its own [`StdRng`] from
//! [`derive_seed`], so results depend only on the base seed and the unit
//! index, never on thread scheduling.

use nalgebra::Rotation3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::sphere::{cart, Vector3};

/// Draw one unit vector from a Fisher distribution about the +z axis.
///
/// An infinite `kappa` returns the axis itself.
pub fn fisher_deviate<R: Rng + ?Sized>(rng: &mut R, kappa: f64) -> Vector3 {
    if kappa.is_infinite() {
        return Vector3::z();
    }
    let r1: f64 = rng.random();
    let r2: f64 = rng.random();

    let l = (-2.0 * kappa).exp();
    let a = r1 * (1.0 - l) + l;
    let fac = (-a.ln() / (2.0 * kappa)).sqrt().min(1.0);

    let colatitude = 2.0 * fac.asin().to_degrees();
    cart(360.0 * r2, 90.0 - colatitude, 1.0)
}

/// Draw `n` unit vectors from a Fisher distribution about `mean`.
pub fn fisher_sample<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    kappa: f64,
    mean: &Vector3,
) -> Vec<Vector3> {
    let rotation = Rotation3::rotation_between(&Vector3::z(), mean).unwrap_or_else(|| {
        // Antiparallel target: any half turn about a horizontal axis works
        Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)
    });
    (0..n)
        .map(|_| rotation * fisher_deviate(rng, kappa))
        .collect()
}

/// Sum of `n` Fisher deviates about +z (the resultant of a simulated population).
pub fn fisher_resultant<R: Rng + ?Sized>(rng: &mut R, n: usize, kappa: f64) -> Vector3 {
    (0..n).fold(Vector3::zeros(), |acc, _| acc + fisher_deviate(rng, kappa))
}

/// Independent seed for work unit `stream` of a run seeded with `base`.
///
/// SplitMix64 finalizer over the combined inputs.
#[must_use]
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Random number generator for work unit `stream`.
#[must_use]
pub fn stream_rng(base: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(base, stream))
}

/// Base seed from the configuration, or a fresh one from the thread RNG.
#[must_use]
pub fn base_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random())
}
