//! Paleomagnetic Directional Statistics
//!
//! Statistics core for paleomagnetic directions and virtual geomagnetic poles.
//!
//! This library provides the numerical pipeline behind a paleomagnetic
//! interpretation: fitting magnetization components to demagnetization data,
//! averaging directions and poles, rejecting outlying VGPs, and testing
//! whether two populations share a common true mean direction.
//!
//! # Features
//!
//! - **Fisher statistics**: Mean, κ, a95/A95, CSD and PSV envelopes
//! - **Kent ellipses**: Elliptical confidence regions about the mean
//! - **Cutoffs**: Fixed 45° and Vandamme (1994) VGP outlier rejection
//! - **PCA**: Line and plane fits with MAD (Kirschvink, 1980)
//! - **Great circles**: Combined set-point and remagnetization circle means
//! - **CTMD**: Watson's V with a seedable, parallel Monte Carlo null
//!
//! # Quick Start
//!
//! ```
//! use paleomag::{apply_cutoff, fisher_vgps, site_vgps, CoordinateReference, CutoffMode};
//! use paleomag::{DirectionRecord, SiteLocation};
//!
//! let records = vec![
//!     DirectionRecord::new(352.0, 48.0, 0.0, 0.0, "s1"),
//!     DirectionRecord::new(5.0, 55.0, 0.0, 0.0, "s2"),
//!     DirectionRecord::new(10.0, 47.0, 0.0, 0.0, "s3"),
//!     DirectionRecord::new(358.0, 60.0, 0.0, 0.0, "s4"),
//! ];
//! let site = SiteLocation::new(45.0, 10.0)?;
//!
//! let pairs = site_vgps(&records, &site, CoordinateReference::Geographic)?;
//! let cut = apply_cutoff(&pairs, CutoffMode::Vandamme)?;
//!
//! let poles: Vec<_> = cut.accepted.iter().map(|p| p.pole).collect();
//! let mean = fisher_vgps(&poles, 95.0)?;
//! assert!(mean.stats().a95 > 0.0);
//! # Ok::<(), paleomag::PaleomagError>(())
//! ```
//!
//! # Conventions
//!
//! | Quantity | Convention |
//! |----------|------------|
//! | Cartesian axes | x north, y east, z down |
//! | Declination | degrees clockwise from north, `[0, 360)` |
//! | Inclination | degrees, positive down, `[-90, 90]` |
//! | Bedding | right-hand-rule strike, dip to the right |
//!
//! # Reproducibility
//!
//! Monte Carlo results depend only on [`AnalysisConfig::random_seed`]:
//!
//! ```
//! use paleomag::{ctmd_test, AnalysisConfig, CtmdSample, Direction};
//!
//! let a = CtmdSample::new(20, 19.5, 38.0, &Direction::new(0.0, 45.0)?)?;
//! let b = CtmdSample::new(20, 19.4, 31.7, &Direction::new(8.0, 40.0)?)?;
//! let config = AnalysisConfig::quick().with_random_seed(11);
//!
//! let first = ctmd_test(&a, &b, &config)?;
//! let second = ctmd_test(&a, &b, &config.clone().with_parallel(false))?;
//! assert_eq!(first, second);
//! # Ok::<(), paleomag::PaleomagError>(())
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

pub mod config;
pub mod ctmd;
pub mod cutoff;
pub mod direction;
pub mod error;
pub mod fisher;
pub mod great_circle;
pub mod kent;
pub mod math;
pub mod pca;
pub mod progress;
pub mod sampling;

// Re-exports for convenient access
pub use config::AnalysisConfig;
pub use ctmd::{
    critical_angle, ctmd_test, ctmd_test_with_progress, find_probability, pairwise_ctmd,
    sample_watson, synthetic_v, watson_v, Classification, CtmdResult, CtmdSample, PairwiseCtmd,
    WatsonDistribution, MAX_KAPPA,
};
pub use cutoff::{apply_cutoff, site_vgps, CutoffMode, CutoffResult, HasPole, PairedVgp};
pub use direction::{
    CoordinateReference, Direction, DirectionRecord, Pole, SiteLocation, VgpRecord,
};
pub use error::{PaleomagError, Result};
pub use fisher::{
    angular_standard_deviation, fisher_directions, fisher_vgps, mean_direction,
    to_normal_polarity, FisherResult, FisherStats, PsvAssessment, PsvBounds,
};
pub use great_circle::{fit_great_circles, GreatCircleFit, GreatCircleStats};
pub use kent::{kent_parameters, KentParameters};
pub use pca::{
    fit_component, DemagnetizationStep, FitType, PcaComponent, PcaOptions, SpecimenOrientation,
};
pub use progress::{NoProgress, ProgressObserver};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sphere::{angle_between, cart};

    fn generate_site(n: usize, dec: f64, inc: f64) -> Vec<DirectionRecord> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                let spread = 6.0 * (2.0 * std::f64::consts::PI * t).sin();
                let d = (dec + spread).rem_euclid(360.0);
                let inc_i = inc + 4.0 * (4.0 * std::f64::consts::PI * t).cos();
                DirectionRecord::new(d, inc_i, 90.0, 20.0, format!("s{i}"))
            })
            .collect()
    }

    #[test]
    fn test_full_pipeline() {
        let site = SiteLocation::new(40.0, 15.0).unwrap();
        let records = generate_site(12, 10.0, 55.0);

        let pairs = site_vgps(&records, &site, CoordinateReference::Tectonic).unwrap();
        let cut = apply_cutoff(&pairs, CutoffMode::Fixed45).unwrap();
        assert!(cut.rejected.is_empty());

        let directions: Vec<Direction> = cut.accepted.iter().map(|p| p.direction).collect();
        let fisher = fisher_directions(&directions, 95.0).unwrap();
        let kent = kent_parameters(&directions, 95.0).unwrap();

        assert!(angle_between(&fisher.mean_vector(), &kent.mean.to_unit_vector()) < 1e-4);
        assert!(fisher.stats().kappa > 50.0);
        assert_eq!(fisher.stats().n, 12);
    }

    #[test]
    fn test_sample_statistics_feed_ctmd() {
        let directions: Vec<Direction> = generate_site(15, 0.0, 45.0)
            .iter()
            .map(|r| r.direction(CoordinateReference::Geographic).unwrap())
            .collect();
        let sample = CtmdSample::from_directions(&directions).unwrap();
        assert_eq!(sample.n, 15);
        assert!(angle_between(&sample.mean, &cart(0.0, 45.0, 1.0)) < 3.0);

        let config = AnalysisConfig::quick().with_random_seed(5);
        let result = ctmd_test(&sample, &sample, &config).unwrap();
        assert!(result.classification.is_positive());
    }
}
