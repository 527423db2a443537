//! Checkable Implementation

use crate::{CheckState, CheckableError, CheckableId, NotifyOptions, StateType, Suppression, SuppressionHandle};
use flapping::{FlapEdge, FlapSample, FlapTracker, FlappingDetector};
use tracing::debug;

/// Per-object configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CheckableSettings {
    pub display_name: String,
    pub max_attempts: u32,
    pub accept_passive_checks: bool,
    /// States and events worth a notification
    pub notify_on: NotifyOptions,
    /// Re-notification interval, in interval_length units; 0 = once per episode
    pub notification_interval: u32,
    pub first_notification_delay: u32,
    pub recovery_notification_delay: u32,
    pub notifications_enabled: bool,
    /// Time window name; `None` is always valid
    pub notification_period: Option<String>,
    pub is_volatile: bool,
    pub flap_detection_enabled: bool,
    /// States that feed the flapping history
    pub flap_detection_on: NotifyOptions,
    pub low_flap_threshold: Option<f64>,
    pub high_flap_threshold: Option<f64>,
    /// Directly configured contacts (groups already flattened)
    pub contacts: Vec<String>,
}

impl Default for CheckableSettings {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            max_attempts: 3,
            accept_passive_checks: true,
            notify_on: NotifyOptions::ALL,
            notification_interval: 30,
            first_notification_delay: 0,
            recovery_notification_delay: 0,
            notifications_enabled: true,
            notification_period: None,
            is_volatile: false,
            flap_detection_enabled: true,
            flap_detection_on: NotifyOptions::ALL,
            low_flap_threshold: None,
            high_flap_threshold: None,
            contacts: Vec::new(),
        }
    }
}

/// A host or service with its authoritative runtime state.
///
/// Callers serialize access per checkable; every mutation of one result
/// (transition, flap check, notification decision) runs under one lock.
#[derive(Debug, Clone)]
pub struct Checkable {
    pub id: CheckableId,
    pub settings: CheckableSettings,

    pub current_state: CheckState,
    pub last_state: CheckState,
    pub last_hard_state: CheckState,
    pub state_type: StateType,
    pub current_attempt: u32,
    pub last_check: i64,
    pub last_state_change: i64,
    pub last_hard_state_change: i64,
    pub plugin_output: String,

    pub last_notification: i64,
    pub next_notification_id: u64,
    /// Notifications sent in the current problem episode
    pub notification_number: u32,
    pub problem_notified: bool,
    pub last_flap_notified: Option<FlapEdge>,

    pub flap: FlapTracker,
    pub suppression: SuppressionHandle,
}

impl Checkable {
    /// Create a checkable in HARD UP/OK
    pub fn new(id: CheckableId, settings: CheckableSettings) -> Result<Self, CheckableError> {
        if settings.max_attempts == 0 {
            return Err(CheckableError::ZeroMaxAttempts(id));
        }
        let good = CheckState::good(id.kind());
        Ok(Self {
            id,
            settings,
            current_state: good,
            last_state: good,
            last_hard_state: good,
            state_type: StateType::Hard,
            current_attempt: 1,
            last_check: 0,
            last_state_change: 0,
            last_hard_state_change: 0,
            plugin_output: String::new(),
            last_notification: 0,
            next_notification_id: 1,
            notification_number: 0,
            problem_notified: false,
            last_flap_notified: None,
            flap: FlapTracker::new(),
            suppression: SuppressionHandle::new(),
        })
    }

    pub fn is_problem(&self) -> bool {
        self.current_state.is_problem()
    }

    pub fn is_flapping(&self) -> bool {
        self.flap.is_flapping()
    }

    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    pub fn next_notification_id(&self) -> u64 {
        self.next_notification_id
    }

    pub fn suppression(&self) -> Suppression {
        self.suppression.snapshot()
    }

    pub fn scheduled_downtime_depth(&self) -> u32 {
        self.suppression.snapshot().downtime_depth
    }

    /// Run flap detection for the check just processed.
    ///
    /// Skipped entirely while a dependency reports the checkable blocked.
    pub fn record_check(
        &mut self,
        detector: &FlappingDetector,
        changed: bool,
        dependency_blocked: bool,
    ) -> Option<FlapEdge> {
        if dependency_blocked {
            debug!("Flap detection skipped for {}: dependency blocked", self.id);
            return None;
        }
        let sample = FlapSample {
            kind: self.id.kind(),
            changed,
            record: self
                .settings
                .flap_detection_on
                .contains(self.current_state.option_bit()),
            is_problem: self.is_problem(),
            detection_enabled: self.settings.flap_detection_enabled,
            low_override: self.settings.low_flap_threshold,
            high_override: self.settings.high_flap_threshold,
        };
        detector.record_check(&mut self.flap, sample)
    }
}

/// Answers whether a checkable's dependencies currently block it
pub trait DependencyOracle: Send + Sync {
    fn is_blocked(&self, id: &CheckableId) -> bool;
}

/// Oracle for setups without dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyOracle for NoDependencies {
    fn is_blocked(&self, _id: &CheckableId) -> bool {
        false
    }
}
