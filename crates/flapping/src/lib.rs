//! Flapping Detector
//!
//! Tracks how often a checkable changes state and raises or clears its
//! flapping flag when the weighted change percentage crosses the
//! configured thresholds.

mod detector;
mod weighting;

pub use detector::{FlapConfig, FlapEdge, FlapSample, FlapThresholds, FlapTracker, FlappingDetector, ObjectKind};
pub use weighting::{ChangeWeighting, LinearRecencyCurve};

use thiserror::Error;

/// Flap configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlapError {
    #[error("Low threshold {low} must not exceed high threshold {high}")]
    InvertedThresholds { low: f64, high: f64 },

    #[error("Threshold {0} is outside [0, 100]")]
    OutOfRange(f64),
}
