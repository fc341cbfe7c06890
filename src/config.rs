//! Configuration for paleomagnetic analyses.
//!
//! This module provides the [`AnalysisConfig`] struct which centralizes the
//! tunable parameters of the statistics engine, along with presets.
//!
//! # Example
//!
//! ```
//! use paleomag::AnalysisConfig;
//!
//! // Use default configuration
//! let config = AnalysisConfig::default();
//!
//! // Reproducible Monte Carlo runs
//! let seeded = AnalysisConfig::quick().with_random_seed(42);
//! assert_eq!(seeded.random_seed, Some(42));
//! ```

use crate::error::{PaleomagError, Result};

/// Configuration for paleomagnetic analyses.
///
/// # Statistics
///
/// - `confidence`: Confidence level (percent) used for a95/A95 cones.
///
/// # Monte Carlo
///
/// - `monte_carlo_iterations`: Simulated pairs for Watson's V null distribution.
/// - `random_seed`: Fixed seed for reproducible results.
/// - `significance`: p-value threshold for rejecting a common mean.
/// - `probe_angles`: Synthetic separations mapped to classes A, B and C.
///
/// # Great circles
///
/// - `convergence_tolerance`: Max angular change (degrees) ending the fit.
/// - `max_sweeps`: Sweep cap before reporting non-convergence.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Confidence level in percent for a95/A95.
    pub confidence: f64,

    /// Number of simulated Watson V pairs.
    /// - 500: interactive use
    /// - 2500: standard
    /// - 5000: publication figures
    pub monte_carlo_iterations: usize,

    /// Random seed. `None` draws a fresh seed from the thread RNG.
    pub random_seed: Option<u64>,

    /// Significance level for the CTMD test.
    pub significance: f64,

    /// Synthetic mean separations (degrees) for classes A, B and C.
    pub probe_angles: [f64; 3],

    /// Great-circle convergence threshold in degrees.
    pub convergence_tolerance: f64,

    /// Maximum number of great-circle sweeps.
    pub max_sweeps: usize,

    /// Whether to spread Monte Carlo work over the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence: 95.0,
            monte_carlo_iterations: 2500,
            random_seed: None,
            significance: 0.05,
            probe_angles: [5.0, 10.0, 20.0],
            convergence_tolerance: 0.01,
            max_sweeps: 1000,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 100.0) {
            return Err(PaleomagError::invalid_config(
                "confidence must be in (0, 100)",
            ));
        }
        if self.monte_carlo_iterations < 100 {
            return Err(PaleomagError::invalid_config(
                "monte_carlo_iterations must be at least 100",
            ));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(PaleomagError::invalid_config(
                "significance must be in (0, 1)",
            ));
        }
        let [a, b, c] = self.probe_angles;
        if !(a > 0.0 && a < b && b < c && c < 180.0) {
            return Err(PaleomagError::invalid_config(
                "probe_angles must be strictly increasing within (0, 180)",
            ));
        }
        if self.convergence_tolerance <= 0.0 {
            return Err(PaleomagError::invalid_config(
                "convergence_tolerance must be positive",
            ));
        }
        if self.max_sweeps < 1 {
            return Err(PaleomagError::invalid_config(
                "max_sweeps must be at least 1",
            ));
        }
        Ok(())
    }

    /// Preset for interactive use: fewer simulations.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            monte_carlo_iterations: 500,
            ..Self::default()
        }
    }

    /// Preset for publication: a denser null distribution.
    #[must_use]
    pub fn publication() -> Self {
        Self {
            monte_carlo_iterations: 5000,
            ..Self::default()
        }
    }

    /// Set the confidence level.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the number of Monte Carlo iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.monte_carlo_iterations = iterations;
        self
    }

    /// Fix the random seed.
    #[must_use]
    pub const fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the significance level.
    #[must_use]
    pub const fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    /// Set the great-circle sweep cap.
    #[must_use]
    pub const fn with_max_sweeps(mut self, sweeps: usize) -> Self {
        self.max_sweeps = sweeps;
        self
    }

    /// Enable or disable parallel Monte Carlo sampling.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
