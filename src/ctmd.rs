//! Common true mean direction test (Watson's V with a Monte Carlo null).
//!
//! Two populations are compared through Watson's statistic
//! `V = 2(Sw - Rw)`, where `Sw = Σ κᵢRᵢ` and `Rw` is the length of the
//! κR-weighted sum of the mean vectors. The null distribution of V is
//! simulated by drawing Fisher populations with the observed N and κ about a
//! common mean. Positive tests are graded A, B or C by the smallest probed
//! separation that the test would have detected (McFadden and McElhinny, 1990).
//!
//! # Example
//!
//! ```
//! use paleomag::{ctmd_test, AnalysisConfig, CtmdSample, Direction};
//!
//! let mean = Direction::new(0.0, 50.0).unwrap();
//! let a = CtmdSample::new(30, 29.5, 58.0, &mean).unwrap();
//! let b = CtmdSample::new(25, 24.4, 40.0, &mean).unwrap();
//!
//! let config = AnalysisConfig::quick().with_random_seed(7);
//! let result = ctmd_test(&a, &b, &config).unwrap();
//! assert!(result.observed_angle < 1e-3);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::direction::Direction;
use crate::error::{PaleomagError, Result};
use crate::fisher::{dispersion, Resultant, MIN_POINTS};
use crate::math::sphere::{angle_between, cart, Vector3};
use crate::progress::{NoProgress, ProgressObserver};
use crate::sampling::{base_seed, derive_seed, fisher_resultant, stream_rng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cosine below which the critical angle is not resolvable.
const UNRESOLVED_COSINE: f64 = -0.9999;

/// Largest κ accepted for simulation. Beyond this a Fisher draw is numerically
/// a point mass and V carries no information.
pub const MAX_KAPPA: f64 = 1e10;

/// Progress is reported once per this many iterations.
const PROGRESS_STRIDE: usize = 100;

/// Sufficient statistics of one population.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CtmdSample {
    /// Number of directions.
    pub n: usize,
    /// Resultant length.
    pub r: f64,
    /// Precision parameter.
    pub kappa: f64,
    /// Unit mean vector.
    pub mean: Vector3,
}

impl CtmdSample {
    /// Build a sample from summary statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if `n < 2`, `r` is outside `(0, n]` or `kappa` is
    /// not in `(0, MAX_KAPPA]`.
    pub fn new(n: usize, r: f64, kappa: f64, mean: &Direction) -> Result<Self> {
        if n < MIN_POINTS {
            return Err(PaleomagError::insufficient_points(MIN_POINTS, n));
        }
        if !(r > 0.0 && r <= n as f64) {
            return Err(PaleomagError::invalid_input(format!(
                "resultant length {r} outside (0, {n}]"
            )));
        }
        if !(kappa > 0.0 && kappa <= MAX_KAPPA) {
            return Err(PaleomagError::invalid_input(format!(
                "precision parameter {kappa} outside (0, {MAX_KAPPA:e}]"
            )));
        }
        Ok(Self {
            n,
            r,
            kappa,
            mean: mean.to_unit_vector(),
        })
    }

    /// Sufficient statistics of a set of directions.
    ///
    /// # Errors
    ///
    /// Returns an error for fewer than two directions, a vanishing resultant,
    /// or directions so tightly clustered that κ exceeds [`MAX_KAPPA`].
    pub fn from_directions(directions: &[Direction]) -> Result<Self> {
        let vectors: Vec<Vector3> = directions.iter().map(Direction::to_unit_vector).collect();
        let resultant = Resultant::of_unit_vectors(&vectors);
        let mean = resultant.mean()?;
        let r = resultant.r();
        Self::new(resultant.n, r, dispersion(resultant.n, r), &mean)
    }

    /// `κR`, the weight of this population in Watson's statistic.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.kappa * self.r
    }
}

/// CTMD classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Classification {
    /// Positive; would detect a 5 degree separation.
    A,
    /// Positive; would detect a 10 degree separation.
    B,
    /// Positive; would detect a 20 degree separation.
    C,
    /// The populations do not share a common mean.
    Negative,
    /// Positive, but too imprecise to detect any probed separation.
    Indeterminate,
}

impl Classification {
    /// Whether the populations are consistent with a common mean.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        !matches!(self, Self::Negative)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::Negative => "negative",
            Self::Indeterminate => "indeterminate",
        })
    }
}

/// Outcome of a CTMD test.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CtmdResult {
    /// Classification of the test.
    pub classification: Classification,
    /// Critical angle in degrees, 0 when not resolvable.
    pub critical_angle: f64,
    /// Angle between the means in degrees, after any polarity flip.
    pub observed_angle: f64,
    /// Probability of a V at least as large as observed under a common mean.
    pub probability: f64,
    /// Observed Watson's V.
    pub v_observed: f64,
    /// 95th percentile of the simulated V.
    pub v95: f64,
    /// 99th percentile of the simulated V.
    pub v99: f64,
    /// Whether the second mean was reversed before testing.
    pub flipped: bool,
}

/// Sorted simulated Watson's V values.
#[derive(Debug, Clone, PartialEq)]
pub struct WatsonDistribution {
    sorted: Vec<f64>,
}

impl WatsonDistribution {
    fn from_unsorted(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        Self { sorted: values }
    }

    /// Simulated values in ascending order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    /// Value at fraction `q` of the sorted simulations (`sorted[floor(q·n)]`).
    #[must_use]
    pub fn quantile(&self, q: f64) -> f64 {
        let n = self.sorted.len();
        let index = ((q * n as f64).floor() as usize).min(n.saturating_sub(1));
        self.sorted.get(index).copied().unwrap_or(f64::NAN)
    }

    /// 95th percentile.
    #[must_use]
    pub fn v95(&self) -> f64 {
        self.quantile(0.95)
    }

    /// 99th percentile.
    #[must_use]
    pub fn v99(&self) -> f64 {
        self.quantile(0.99)
    }

    /// Fraction of simulations at least as large as `observed`.
    #[must_use]
    pub fn probability(&self, observed: f64) -> f64 {
        find_probability(observed, &self.sorted)
    }
}

/// Watson's V for populations with weights `κR` and unit means.
///
/// Evaluated as `2(Sw² - Rw²)/(Sw + Rw)` with
/// `Sw² - Rw² = Σ_{i<j} wᵢwⱼ|mᵢ - mⱼ|²`, so nearly parallel means under large
/// weights keep their precision.
fn watson_v_of(terms: &[(f64, Vector3)]) -> f64 {
    let sw: f64 = terms.iter().map(|(w, _)| w).sum();
    let rw = terms
        .iter()
        .fold(Vector3::zeros(), |acc, (w, m)| acc + m * *w)
        .norm();
    let spread: f64 = terms
        .iter()
        .enumerate()
        .flat_map(|(i, (wi, mi))| {
            terms[i + 1..]
                .iter()
                .map(move |(wj, mj)| wi * wj * (mi - mj).norm_squared())
        })
        .sum();
    2.0 * spread / (sw + rw)
}

/// Watson's V of two populations.
#[must_use]
pub fn watson_v(a: &CtmdSample, b: &CtmdSample) -> f64 {
    watson_v_of(&[(a.weight(), a.mean), (b.weight(), b.mean)])
}

/// Empirical one-sided p-value of `observed` against ascending `sorted` values.
#[must_use]
pub fn find_probability(observed: f64, sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let below = sorted.partition_point(|&v| v < observed);
    (sorted.len() - below) as f64 / sorted.len() as f64
}

/// V of two populations with the observed N, R and κ whose means are
/// `angle` degrees apart.
#[must_use]
pub fn synthetic_v(a: &CtmdSample, b: &CtmdSample, angle: f64) -> f64 {
    watson_v_of(&[
        (a.weight(), Vector3::z()),
        (b.weight(), cart(0.0, 90.0 - angle, 1.0)),
    ])
}

/// Critical angle (degrees) between the means at the V threshold `v95`.
///
/// Returns 0 when the threshold cannot be expressed as an angle.
#[must_use]
pub fn critical_angle(a: &CtmdSample, b: &CtmdSample, v95: f64) -> f64 {
    let (wa, wb) = (a.weight(), b.weight());
    // 1 - cos A, with Rwc = Sw - V/2 expanded so the leading Sw² cancels exactly
    let half = 0.5 * v95;
    let versine = (half * (2.0 * (wa + wb) - half) / (2.0 * wa * wb)).max(0.0);
    if 1.0 - versine <= UNRESOLVED_COSINE {
        0.0
    } else {
        2.0 * (0.5 * versine).sqrt().asin().to_degrees()
    }
}

/// One simulated V: both populations drawn about a common mean.
fn simulate_v(a: &CtmdSample, b: &CtmdSample, seed: u64, iteration: usize) -> f64 {
    let mut rng = stream_rng(seed, iteration as u64);
    let terms = [a, b].map(|sample| {
        let sum = fisher_resultant(&mut rng, sample.n, sample.kappa);
        let r = sum.norm();
        let kappa = dispersion(sample.n, r);
        (kappa * r, sum / r)
    });
    watson_v_of(&terms)
}

/// Simulate the null distribution of Watson's V.
///
/// # Errors
///
/// Returns an error for an invalid configuration.
pub fn sample_watson<P>(
    a: &CtmdSample,
    b: &CtmdSample,
    config: &AnalysisConfig,
    progress: &P,
) -> Result<WatsonDistribution>
where
    P: ProgressObserver + ?Sized,
{
    config.validate()?;
    let total = config.monte_carlo_iterations;
    let seed = base_seed(config.random_seed);
    let completed = AtomicUsize::new(0);

    let run = |i: usize| {
        let v = simulate_v(a, b, seed, i);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_STRIDE == 0 || done == total {
            progress.report(done, total);
        }
        v
    };

    let values: Vec<f64> = if config.parallel {
        (0..total).into_par_iter().map(run).collect()
    } else {
        (0..total).map(run).collect()
    };

    Ok(WatsonDistribution::from_unsorted(values))
}

/// Test two populations for a common true mean direction.
///
/// # Errors
///
/// Returns an error for an invalid configuration.
pub fn ctmd_test(a: &CtmdSample, b: &CtmdSample, config: &AnalysisConfig) -> Result<CtmdResult> {
    ctmd_test_with_progress(a, b, config, &NoProgress)
}

/// [`ctmd_test`] with a progress hook on the Monte Carlo loop.
///
/// # Errors
///
/// Returns an error for an invalid configuration.
pub fn ctmd_test_with_progress<P>(
    a: &CtmdSample,
    b: &CtmdSample,
    config: &AnalysisConfig,
    progress: &P,
) -> Result<CtmdResult>
where
    P: ProgressObserver + ?Sized,
{
    let raw_angle = angle_between(&a.mean, &b.mean);
    let flipped = raw_angle > 90.0;
    let b = if flipped {
        CtmdSample {
            mean: -b.mean,
            ..*b
        }
    } else {
        *b
    };
    let observed_angle = angle_between(&a.mean, &b.mean);

    let null = sample_watson(a, &b, config, progress)?;
    let v_observed = watson_v(a, &b);
    let probability = null.probability(v_observed);

    let classification = if probability <= config.significance {
        Classification::Negative
    } else {
        let classes = [Classification::A, Classification::B, Classification::C];
        config
            .probe_angles
            .iter()
            .zip(classes)
            .find(|&(&angle, _)| null.probability(synthetic_v(a, &b, angle)) <= config.significance)
            .map_or(Classification::Indeterminate, |(_, class)| class)
    };

    let v95 = null.v95();
    let critical = critical_angle(a, &b, v95);
    info!(
        "CTMD {classification}: angle {observed_angle:.2}, critical {critical:.2}, V {v_observed:.3} (v95 {v95:.3}), p {probability:.4}"
    );

    Ok(CtmdResult {
        classification,
        critical_angle: critical,
        observed_angle,
        probability,
        v_observed,
        v95,
        v99: null.v99(),
        flipped,
    })
}

/// CTMD result for one pair of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairwiseCtmd {
    /// Index of the first sample.
    pub i: usize,
    /// Index of the second sample (`i <= j`).
    pub j: usize,
    /// Test outcome.
    pub result: CtmdResult,
}

/// Run the CTMD test on every pair `i <= j` of samples.
///
/// Pairs are distributed over the rayon pool when `config.parallel` is set;
/// each pair draws from its own seed, so results do not depend on scheduling.
///
/// # Errors
///
/// Returns the first error raised by any pair.
pub fn pairwise_ctmd<P>(
    samples: &[CtmdSample],
    config: &AnalysisConfig,
    progress: &P,
) -> Result<Vec<PairwiseCtmd>>
where
    P: ProgressObserver + ?Sized,
{
    config.validate()?;
    let pairs: Vec<(usize, usize)> = (0..samples.len())
        .flat_map(|i| (i..samples.len()).map(move |j| (i, j)))
        .collect();
    let total = pairs.len();
    let seed = base_seed(config.random_seed);
    let completed = AtomicUsize::new(0);

    let run = |(index, &(i, j)): (usize, &(usize, usize))| {
        let pair_config = AnalysisConfig {
            random_seed: Some(derive_seed(seed, index as u64)),
            parallel: false,
            ..config.clone()
        };
        let result = ctmd_test(&samples[i], &samples[j], &pair_config)?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("pair ({i}, {j}) finished: {}", result.classification);
        progress.report(done, total);
        Ok(PairwiseCtmd { i, j, result })
    };

    let results = if config.parallel {
        pairs.par_iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
    } else {
        pairs.iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
    };

    info!("pairwise CTMD finished {total} pairs over {} samples", samples.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Sample with the R that gives exactly `kappa` for `n` directions.
    fn sample(n: usize, kappa: f64, dec: f64, inc: f64) -> CtmdSample {
        let nf = n as f64;
        let r = nf - (nf - 1.0) / kappa;
        CtmdSample::new(n, r, kappa, &Direction::new(dec, inc).unwrap()).unwrap()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::quick().with_random_seed(2024)
    }

    #[test]
    fn test_find_probability() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(find_probability(0.5, &sorted), 1.0);
        assert_eq!(find_probability(1.0, &sorted), 1.0);
        assert_eq!(find_probability(2.5, &sorted), 0.5);
        assert_eq!(find_probability(4.0, &sorted), 0.25);
        assert_eq!(find_probability(5.0, &sorted), 0.0);
    }

    #[test]
    fn test_watson_v_identical_means() {
        let a = sample(10, 30.0, 0.0, 50.0);
        assert_relative_eq!(watson_v(&a, &a), 0.0, epsilon = 1e-9);
        assert_relative_eq!(synthetic_v(&a, &a, 0.0), 0.0, epsilon = 1e-9);
        assert!(synthetic_v(&a, &a, 10.0) > synthetic_v(&a, &a, 5.0));
    }

    #[test]
    fn test_critical_angle() {
        let a = sample(50, 50.0, 0.0, 50.0);
        // The V of a synthetic separation maps back onto that separation.
        let v = synthetic_v(&a, &a, 7.0);
        assert_relative_eq!(critical_angle(&a, &a, v), 7.0, epsilon = 1e-6);
        assert_eq!(critical_angle(&a, &a, 4.0 * a.weight()), 0.0);
    }

    #[test]
    fn test_identical_means_classify_a() {
        let a = sample(50, 50.0, 0.0, 50.0);
        let result = ctmd_test(&a, &a, &config()).unwrap();
        assert_eq!(result.classification, Classification::A);
        assert!(result.observed_angle < 1e-4);
        assert_eq!(result.probability, 1.0);
        assert!(result.critical_angle > 0.0 && result.critical_angle < 5.0);
        assert!(result.v99 >= result.v95);
    }

    #[test]
    fn test_orthogonal_means_negative() {
        let a = sample(20, 50.0, 0.0, 0.0);
        let b = sample(20, 50.0, 90.0, 0.0);
        let result = ctmd_test(&a, &b, &config()).unwrap();
        assert_eq!(result.classification, Classification::Negative);
        assert_eq!(result.probability, 0.0);
    }

    #[test]
    fn test_reversed_population_is_flipped() {
        let a = sample(20, 40.0, 10.0, 45.0);
        let b = sample(20, 40.0, 190.0, -45.0);
        let result = ctmd_test(&a, &b, &config()).unwrap();
        assert!(result.flipped);
        assert!(result.observed_angle < 1e-4);
        assert!(result.classification.is_positive());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a = sample(15, 20.0, 0.0, 40.0);
        let b = sample(12, 25.0, 8.0, 45.0);
        let parallel = sample_watson(&a, &b, &config(), &NoProgress).unwrap();
        let sequential =
            sample_watson(&a, &b, &config().with_parallel(false), &NoProgress).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_progress_reaches_total() {
        let a = sample(10, 20.0, 0.0, 40.0);
        let last = AtomicUsize::new(0);
        let observer = |done: usize, _total: usize| {
            last.fetch_max(done, Ordering::Relaxed);
        };
        sample_watson(&a, &a, &config(), &observer).unwrap();
        assert_eq!(last.load(Ordering::Relaxed), config().monte_carlo_iterations);
    }

    #[test]
    fn test_pairwise_pairs() {
        let samples = [
            sample(10, 30.0, 0.0, 40.0),
            sample(12, 30.0, 5.0, 42.0),
            sample(11, 30.0, 120.0, -10.0),
        ];
        let results = pairwise_ctmd(&samples, &config(), &NoProgress).unwrap();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|p| p.i <= p.j));
        let sequential =
            pairwise_ctmd(&samples, &config().with_parallel(false), &NoProgress).unwrap();
        assert_eq!(results, sequential);
    }

    #[test]
    fn test_sample_validation() {
        let mean = Direction::new(0.0, 0.0).unwrap();
        assert!(CtmdSample::new(1, 1.0, 10.0, &mean).is_err());
        assert!(CtmdSample::new(5, 6.0, 10.0, &mean).is_err());
        assert!(CtmdSample::new(5, 4.5, f64::INFINITY, &mean).is_err());
        assert!(CtmdSample::new(5, 4.5, 1e15, &mean).is_err());
        assert!(CtmdSample::new(5, 4.5, MAX_KAPPA, &mean).is_ok());

        let identical = vec![mean; 4];
        assert!(CtmdSample::from_directions(&identical).is_err());

        let tight = [mean, Direction::new(0.0, 1e-6).unwrap()];
        assert!(matches!(
            CtmdSample::from_directions(&tight),
            Err(PaleomagError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_watson_v_precise_at_high_kappa() {
        // Means 1e-6 degrees apart with weights near 3e9: V = 8w sin²(θ/4).
        let kappa = 1e9;
        let r = 3.0 - 2.0 / kappa;
        let a = CtmdSample::new(3, r, kappa, &Direction::new(0.0, 50.0).unwrap()).unwrap();
        let b = CtmdSample::new(3, r, kappa, &Direction::new(0.0, 50.000_001).unwrap()).unwrap();

        let theta = (50.000_001_f64 - 50.0).to_radians();
        let expected = 8.0 * a.weight() * (theta / 4.0).sin().powi(2);
        assert!(expected > 0.0);
        assert_relative_eq!(watson_v(&a, &b), expected, max_relative = 1e-6);

        // The threshold maps back to the separation it came from.
        let v = synthetic_v(&a, &b, 0.01);
        assert_relative_eq!(critical_angle(&a, &b, v), 0.01, max_relative = 1e-6);
    }
}
