//! Notification Reasons

use flapping::FlapEdge;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationReason {
    Problem,
    Recovery,
    Acknowledgement,
    FlappingStart,
    FlappingStop,
    DowntimeStart,
    DowntimeEnd,
    Custom,
}

impl NotificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationReason::Problem => "PROBLEM",
            NotificationReason::Recovery => "RECOVERY",
            NotificationReason::Acknowledgement => "ACKNOWLEDGEMENT",
            NotificationReason::FlappingStart => "FLAPPINGSTART",
            NotificationReason::FlappingStop => "FLAPPINGSTOP",
            NotificationReason::DowntimeStart => "DOWNTIMESTART",
            NotificationReason::DowntimeEnd => "DOWNTIMEEND",
            NotificationReason::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for NotificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FlapEdge> for NotificationReason {
    fn from(edge: FlapEdge) -> Self {
        match edge {
            FlapEdge::Start => NotificationReason::FlappingStart,
            FlapEdge::Stop => NotificationReason::FlappingStop,
        }
    }
}

/// Operator options attached to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationFlags {
    /// Skip the enabled switches, the throttle and the notification period
    pub forced: bool,
    /// Notify base contacts and every escalation tier at once
    pub broadcast: bool,
}

impl NotificationFlags {
    pub fn forced() -> Self {
        Self {
            forced: true,
            ..Self::default()
        }
    }
}

/// One notify call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub reason: NotificationReason,
    pub author: String,
    pub comment: String,
    pub flags: NotificationFlags,
}

impl NotifyRequest {
    pub fn new(reason: NotificationReason) -> Self {
        Self {
            reason,
            author: String::new(),
            comment: String::new(),
            flags: NotificationFlags::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>, comment: impl Into<String>) -> Self {
        self.author = author.into();
        self.comment = comment.into();
        self
    }

    pub fn with_flags(mut self, flags: NotificationFlags) -> Self {
        self.flags = flags;
        self
    }
}
