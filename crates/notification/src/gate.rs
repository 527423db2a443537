//! Gating Rejections
//!
//! Why a notification was not sent. These are normal outcomes, kept
//! distinct for diagnostics and metrics.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    NotificationsDisabled,
    NotAProblem,
    SoftState,
    Flapping,
    FirstNotificationDelay,
    StateNotEnabled,
    InDowntime,
    Acknowledged,
    NotRecovered,
    NoProblemNotified,
    RecoveryDelay,
    FlapOptionDisabled,
    FlapEdgeAlreadyNotified,
    NoFlapStartNotified,
    DowntimeOptionDisabled,
    Throttled,
    OutsideNotificationPeriod,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::NotificationsDisabled => "notifications_disabled",
            Gate::NotAProblem => "not_a_problem",
            Gate::SoftState => "soft_state",
            Gate::Flapping => "flapping",
            Gate::FirstNotificationDelay => "first_notification_delay",
            Gate::StateNotEnabled => "state_not_enabled",
            Gate::InDowntime => "in_downtime",
            Gate::Acknowledged => "acknowledged",
            Gate::NotRecovered => "not_recovered",
            Gate::NoProblemNotified => "no_problem_notified",
            Gate::RecoveryDelay => "recovery_delay",
            Gate::FlapOptionDisabled => "flap_option_disabled",
            Gate::FlapEdgeAlreadyNotified => "flap_edge_already_notified",
            Gate::NoFlapStartNotified => "no_flap_start_notified",
            Gate::DowntimeOptionDisabled => "downtime_option_disabled",
            Gate::Throttled => "throttled",
            Gate::OutsideNotificationPeriod => "outside_notification_period",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
