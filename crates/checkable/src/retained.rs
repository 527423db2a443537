//! Retained State
//!
//! The field set that must survive a restart for notification behaviour
//! to stay consistent.

use crate::{Checkable, StateType, Suppression};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedState {
    pub state_type: StateType,
    pub current_attempt: u32,
    pub last_notification: i64,
    pub is_flapping: bool,
    pub scheduled_downtime_depth: u32,
    pub next_notification_id: u64,
}

impl Checkable {
    pub fn retained_state(&self) -> RetainedState {
        RetainedState {
            state_type: self.state_type,
            current_attempt: self.current_attempt,
            last_notification: self.last_notification,
            is_flapping: self.flap.is_flapping(),
            scheduled_downtime_depth: self.scheduled_downtime_depth(),
            next_notification_id: self.next_notification_id,
        }
    }

    /// Apply a retained record; the attempt is clamped to `[1, max_attempts]`
    pub fn restore_state(&mut self, retained: &RetainedState) {
        self.state_type = retained.state_type;
        self.current_attempt = retained
            .current_attempt
            .clamp(1, self.settings.max_attempts);
        self.last_notification = retained.last_notification;
        self.flap.restore(retained.is_flapping);
        self.next_notification_id = retained.next_notification_id.max(1);

        let ack = self.suppression.snapshot().ack;
        self.suppression.restore(Suppression {
            downtime_depth: retained.scheduled_downtime_depth,
            ack,
        });
    }
}
