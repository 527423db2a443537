//! Flapping Detector Implementation

use crate::{ChangeWeighting, FlapError, LinearRecencyCurve};
use serde::{Deserialize, Serialize};
use state_history::StateHistory;
use std::fmt;
use tracing::debug;

/// Low/high percentage thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlapThresholds {
    /// At or below: flapping stops
    pub low: f64,
    /// At or above: flapping starts
    pub high: f64,
}

impl FlapThresholds {
    pub fn new(low: f64, high: f64) -> Result<Self, FlapError> {
        for value in [low, high] {
            if !(0.0..=100.0).contains(&value) {
                return Err(FlapError::OutOfRange(value));
            }
        }
        if low > high {
            return Err(FlapError::InvertedThresholds { low, high });
        }
        Ok(Self { low, high })
    }
}

impl Default for FlapThresholds {
    fn default() -> Self {
        Self {
            low: 20.0,
            high: 30.0,
        }
    }
}

/// Global flap detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlapConfig {
    /// Program-wide switch
    pub enabled: bool,
    pub host: FlapThresholds,
    pub service: FlapThresholds,
}

impl Default for FlapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: FlapThresholds::default(),
            service: FlapThresholds::default(),
        }
    }
}

impl FlapConfig {
    pub fn validate(&self) -> Result<(), FlapError> {
        FlapThresholds::new(self.host.low, self.host.high)?;
        FlapThresholds::new(self.service.low, self.service.high)?;
        Ok(())
    }

    pub fn thresholds(&self, kind: ObjectKind) -> FlapThresholds {
        match kind {
            ObjectKind::Host => self.host,
            ObjectKind::Service => self.service,
        }
    }
}

/// Which global thresholds apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Host,
    Service,
}

/// One check as seen by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlapSample {
    pub kind: ObjectKind,
    /// The state differs from the previous check
    pub changed: bool,
    /// The current state is tracked (per-state detection mask)
    pub record: bool,
    /// The current state is not a good state
    pub is_problem: bool,
    /// Per-object detection switch
    pub detection_enabled: bool,
    /// Per-object thresholds; zero or absent falls back to the global values
    pub low_override: Option<f64>,
    pub high_override: Option<f64>,
}

/// Flapping edge produced by a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlapEdge {
    Start,
    Stop,
}

impl FlapEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlapEdge::Start => "start",
            FlapEdge::Stop => "stop",
        }
    }
}

/// Per-checkable flapping state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlapTracker {
    history: StateHistory,
    is_flapping: bool,
    percent_state_change: f64,
}

impl FlapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flapping(&self) -> bool {
        self.is_flapping
    }

    /// Last computed weighted change percentage
    pub fn percent_state_change(&self) -> f64 {
        self.percent_state_change
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Restore the flag from retained state
    pub fn restore(&mut self, is_flapping: bool) {
        self.is_flapping = is_flapping;
    }

    /// Clear flapping when detection gets disabled; returns the stop edge if any
    pub fn clear(&mut self) -> Option<FlapEdge> {
        let was_flapping = self.is_flapping;
        self.is_flapping = false;
        self.history.clear();
        self.percent_state_change = 0.0;
        was_flapping.then_some(FlapEdge::Stop)
    }
}

/// Threshold-based flap detector with a pluggable weighting curve
pub struct FlappingDetector {
    config: FlapConfig,
    weighting: Box<dyn ChangeWeighting>,
}

impl FlappingDetector {
    /// Create a detector using the linear recency curve
    pub fn new(config: FlapConfig) -> Self {
        Self::with_weighting(config, Box::new(LinearRecencyCurve::default()))
    }

    pub fn with_weighting(config: FlapConfig, weighting: Box<dyn ChangeWeighting>) -> Self {
        Self { config, weighting }
    }

    pub fn config(&self) -> &FlapConfig {
        &self.config
    }

    /// Record one check and report a flapping edge, if any.
    ///
    /// The percentage is refreshed on every call even when detection is
    /// disabled; edges are only produced when it is enabled both globally
    /// and for the object.
    pub fn record_check(&self, tracker: &mut FlapTracker, sample: FlapSample) -> Option<FlapEdge> {
        if sample.record {
            tracker.history.push(sample.changed);
        }
        let percent = self.weighting.percent(&tracker.history);
        tracker.percent_state_change = percent;

        let global = self.config.thresholds(sample.kind);
        let low = sample.low_override.filter(|v| *v > 0.0).unwrap_or(global.low);
        let high = sample.high_override.filter(|v| *v > 0.0).unwrap_or(global.high);
        debug!(
            "Flap check: LFT={:.2}, HFT={:.2}, PSC={:.2}%",
            low, high, percent
        );

        if !self.config.enabled || !sample.detection_enabled {
            return None;
        }

        let should_flap = if percent >= high {
            sample.is_problem || tracker.is_flapping
        } else if percent <= low {
            false
        } else {
            return None;
        };

        let edge = match (tracker.is_flapping, should_flap) {
            (false, true) => {
                debug!(
                    "Flapping started: {:.2}% state change >= {:.2}% threshold",
                    percent, high
                );
                FlapEdge::Start
            }
            (true, false) => {
                debug!(
                    "Flapping stopped: {:.2}% state change <= {:.2}% threshold",
                    percent, low
                );
                FlapEdge::Stop
            }
            _ => return None,
        };
        tracker.is_flapping = should_flap;
        metrics::counter!("vigil_flap_edges_total", "edge" => edge.as_str()).increment(1);
        Some(edge)
    }
}

impl Default for FlappingDetector {
    fn default() -> Self {
        Self::new(FlapConfig::default())
    }
}

impl fmt::Debug for FlappingDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlappingDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(changed: bool, is_problem: bool) -> FlapSample {
        FlapSample {
            kind: ObjectKind::Service,
            changed,
            record: true,
            is_problem,
            detection_enabled: true,
            low_override: None,
            high_override: None,
        }
    }

    #[test]
    fn test_single_start_edge_while_flapping() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();

        // Five recent changes stay under 30%, the sixth crosses it
        for _ in 0..5 {
            assert_eq!(detector.record_check(&mut tracker, sample(true, true)), None);
        }
        assert_eq!(
            detector.record_check(&mut tracker, sample(true, true)),
            Some(FlapEdge::Start)
        );
        assert!(tracker.is_flapping());

        for _ in 0..10 {
            assert_eq!(detector.record_check(&mut tracker, sample(true, true)), None);
        }
        assert!(tracker.is_flapping());
    }

    #[test]
    fn test_does_not_start_on_good_state() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();
        for _ in 0..21 {
            assert_eq!(detector.record_check(&mut tracker, sample(true, false)), None);
        }
        assert!(tracker.percent_state_change() > 30.0);
        assert!(!tracker.is_flapping());

        // The next problem check starts it
        assert_eq!(
            detector.record_check(&mut tracker, sample(true, true)),
            Some(FlapEdge::Start)
        );
    }

    #[test]
    fn test_stop_after_settling() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();
        for _ in 0..10 {
            detector.record_check(&mut tracker, sample(true, true));
        }
        assert!(tracker.is_flapping());

        let stops = (0..21)
            .filter_map(|_| detector.record_check(&mut tracker, sample(false, true)))
            .collect::<Vec<_>>();
        assert_eq!(stops, vec![FlapEdge::Stop]);
        assert!(!tracker.is_flapping());
        assert_eq!(tracker.percent_state_change(), 0.0);
    }

    #[test]
    fn test_untracked_state_does_not_update_history() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();
        let untracked = FlapSample {
            record: false,
            ..sample(true, true)
        };
        for _ in 0..10 {
            assert_eq!(detector.record_check(&mut tracker, untracked), None);
        }
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_disabled_detection_computes_percent_only() {
        let detector = FlappingDetector::new(FlapConfig {
            enabled: false,
            ..FlapConfig::default()
        });
        let mut tracker = FlapTracker::new();
        for _ in 0..10 {
            assert_eq!(detector.record_check(&mut tracker, sample(true, true)), None);
        }
        assert!(tracker.percent_state_change() > 30.0);
        assert!(!tracker.is_flapping());
    }

    #[test]
    fn test_object_thresholds_override_global() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();
        let eager = FlapSample {
            low_override: Some(2.0),
            high_override: Some(5.0),
            ..sample(true, true)
        };
        assert_eq!(detector.record_check(&mut tracker, eager), Some(FlapEdge::Start));

        // Zero falls back to the global thresholds
        let mut tracker = FlapTracker::new();
        let zeroed = FlapSample {
            low_override: Some(0.0),
            high_override: Some(0.0),
            ..sample(true, true)
        };
        assert_eq!(detector.record_check(&mut tracker, zeroed), None);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(FlapThresholds::new(20.0, 30.0).is_ok());
        assert_eq!(
            FlapThresholds::new(40.0, 30.0),
            Err(FlapError::InvertedThresholds { low: 40.0, high: 30.0 })
        );
        assert_eq!(FlapThresholds::new(-1.0, 30.0), Err(FlapError::OutOfRange(-1.0)));
    }

    #[test]
    fn test_partial_thresholds_fill_defaults() {
        let thresholds: FlapThresholds = serde_json::from_str(r#"{"low": 10.0}"#).unwrap();
        assert_eq!(thresholds, FlapThresholds { low: 10.0, high: 30.0 });

        let config: FlapConfig =
            serde_json::from_str(r#"{"service": {"high": 45.0}}"#).unwrap();
        assert_eq!(config.service, FlapThresholds { low: 20.0, high: 45.0 });
        assert_eq!(config.host, FlapThresholds::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clear_reports_stop_once() {
        let detector = FlappingDetector::default();
        let mut tracker = FlapTracker::new();
        for _ in 0..6 {
            detector.record_check(&mut tracker, sample(true, true));
        }
        assert_eq!(tracker.clear(), Some(FlapEdge::Stop));
        assert_eq!(tracker.clear(), None);
    }

    proptest! {
        #[test]
        fn test_edges_alternate(changes in proptest::collection::vec(any::<bool>(), 0..120)) {
            let detector = FlappingDetector::default();
            let mut tracker = FlapTracker::new();
            let mut last_edge = FlapEdge::Stop;
            for changed in changes {
                if let Some(edge) = detector.record_check(&mut tracker, sample(changed, true)) {
                    prop_assert_ne!(edge, last_edge);
                    last_edge = edge;
                }
                prop_assert_eq!(tracker.is_flapping(), last_edge == FlapEdge::Start);
            }
        }
    }
}
