//! Dispatcher Interface

use crate::NotificationReason;
use checkable::{CheckState, CheckableId, StateType};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a dispatcher needs to notify one contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub notification_id: u64,
    pub notification_number: u32,
    pub reason: NotificationReason,
    pub checkable: CheckableId,
    pub display_name: String,
    pub state: CheckState,
    pub state_type: StateType,
    pub output: String,
    pub contact: String,
    pub contact_email: Option<String>,
    /// Command name
    pub command: String,
    /// Registered command line for `command`
    pub command_line: String,
    pub author: String,
    pub comment: String,
    pub escalated: bool,
    /// Unix seconds
    pub timestamp: i64,
    /// Decision time in the contact's timezone
    pub local_time: Option<DateTime<FixedOffset>>,
}

/// Dispatch failures; never roll back the decision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Dispatch queue full")]
    QueueFull,

    #[error("Dispatch queue closed")]
    Closed,

    #[error("Dispatch rejected: {0}")]
    Rejected(String),
}

/// Accepts a request and returns immediately
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, request: DispatchRequest) -> Result<(), DispatchError>;
}
