//! State Transition Processor
//!
//! Applies one check result to a checkable: soft/hard bookkeeping,
//! attempt counting, timestamps and acknowledgement expiry. The outcome
//! tells the caller which notification, if any, to consider.

use crate::{AckType, CheckState, Checkable, StateType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A check result delivered by the executor or a passive submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub return_code: i32,
    #[serde(default)]
    pub output: String,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub passive: bool,
    /// Passive submitter asserts the state is already HARD
    #[serde(default)]
    pub hard_assertion: bool,
}

impl CheckResult {
    pub fn active(return_code: i32, timestamp: i64) -> Self {
        Self {
            return_code,
            output: String::new(),
            timestamp,
            passive: false,
            hard_assertion: false,
        }
    }

    pub fn passive(return_code: i32, timestamp: i64, hard_assertion: bool) -> Self {
        Self {
            passive: true,
            hard_assertion,
            ..Self::active(return_code, timestamp)
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// How passive hard assertions are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveHardPolicy {
    /// Promote to HARD immediately
    #[default]
    Honor,
    /// Count the result like any other attempt
    Ignore,
}

/// Notification reason suggested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Problem,
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionOutcome {
    /// False when the result was refused (nothing mutated)
    pub accepted: bool,
    pub state_changed: bool,
    pub type_changed: bool,
    /// The last hard state changed
    pub hard_change: bool,
    pub trigger: Option<Trigger>,
}

impl Checkable {
    /// Apply a check result.
    pub fn process_result(&mut self, result: &CheckResult, policy: PassiveHardPolicy) -> TransitionOutcome {
        if result.passive && !self.settings.accept_passive_checks {
            debug!("Passive result for {} refused", self.id);
            return TransitionOutcome::default();
        }

        let now = result.timestamp;
        let new_state = CheckState::from_return_code(self.id.kind(), result.return_code);
        let previous = self.current_state;
        let previous_type = self.state_type;
        let state_changed = new_state != previous;
        let force_hard = result.passive && result.hard_assertion && policy == PassiveHardPolicy::Honor;

        self.last_check = now;
        self.plugin_output = result.output.clone();
        self.last_state = previous;
        self.current_state = new_state;
        if state_changed {
            self.last_state_change = now;
        }

        let mut hard_change = false;
        let trigger = if new_state.is_good() {
            self.current_attempt = 1;
            if previous.is_good() {
                // Steady good state; a delayed recovery may still be due
                self.problem_notified.then_some(Trigger::Recovery)
            } else if self.state_type == StateType::Soft && self.last_hard_state == new_state {
                self.state_type = StateType::Hard;
                self.last_hard_state_change = now;
                debug!("{} back to {} before going HARD", self.id, new_state);
                None
            } else {
                self.state_type = StateType::Hard;
                self.last_hard_state = new_state;
                self.last_hard_state_change = now;
                hard_change = true;
                Some(Trigger::Recovery)
            }
        } else if self.settings.max_attempts <= 1 || force_hard {
            hard_change = self.promote(new_state, now);
            Some(Trigger::Problem)
        } else if self.state_type == StateType::Hard {
            if new_state == self.last_hard_state {
                self.current_attempt = self.settings.max_attempts;
                Some(Trigger::Problem)
            } else {
                self.state_type = StateType::Soft;
                self.current_attempt = 1;
                None
            }
        } else {
            self.current_attempt = (self.current_attempt + 1).min(self.settings.max_attempts);
            if self.current_attempt >= self.settings.max_attempts {
                hard_change = self.promote(new_state, now);
                Some(Trigger::Problem)
            } else {
                None
            }
        };

        self.expire_acknowledgement(state_changed, new_state);

        let type_changed = self.state_type != previous_type;
        if hard_change {
            info!(
                "{} HARD state change: {} (attempt {}/{})",
                self.id, new_state, self.current_attempt, self.settings.max_attempts
            );
        } else {
            debug!(
                "{} {:?} {} (attempt {}/{})",
                self.id, self.state_type, new_state, self.current_attempt, self.settings.max_attempts
            );
        }

        TransitionOutcome {
            accepted: true,
            state_changed,
            type_changed,
            hard_change,
            trigger,
        }
    }

    /// Enter HARD for a problem state; returns whether the hard state changed
    fn promote(&mut self, state: CheckState, now: i64) -> bool {
        self.state_type = StateType::Hard;
        self.current_attempt = self.settings.max_attempts;
        if self.last_hard_state == state {
            return false;
        }
        self.last_hard_state = state;
        self.last_hard_state_change = now;
        true
    }

    fn expire_acknowledgement(&self, state_changed: bool, state: CheckState) {
        let ack = self.suppression.snapshot().ack;
        let expired = match ack {
            AckType::None => false,
            AckType::Normal => state_changed,
            AckType::Sticky => state.is_good(),
        };
        if expired {
            debug!("{:?} acknowledgement of {} cleared", ack, self.id);
            self.suppression.set_ack(AckType::None);
        }
    }
}
