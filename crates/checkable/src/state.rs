//! Check States

use crate::NotifyOptions;
use flapping::ObjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostState {
    Up,
    Down,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

/// State of either kind of checkable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckState {
    Host(HostState),
    Service(ServiceState),
}

impl CheckState {
    /// Map a plugin return code; out-of-range codes are DOWN / UNKNOWN
    pub fn from_return_code(kind: ObjectKind, code: i32) -> Self {
        match kind {
            ObjectKind::Host => CheckState::Host(match code {
                0 => HostState::Up,
                2 => HostState::Unreachable,
                _ => HostState::Down,
            }),
            ObjectKind::Service => CheckState::Service(match code {
                0 => ServiceState::Ok,
                1 => ServiceState::Warning,
                2 => ServiceState::Critical,
                _ => ServiceState::Unknown,
            }),
        }
    }

    /// UP or OK
    pub fn good(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Host => CheckState::Host(HostState::Up),
            ObjectKind::Service => CheckState::Service(ServiceState::Ok),
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(
            self,
            CheckState::Host(HostState::Up) | CheckState::Service(ServiceState::Ok)
        )
    }

    pub fn is_problem(&self) -> bool {
        !self.is_good()
    }

    /// Option bit matching this state; good states map to RECOVERY
    pub fn option_bit(&self) -> NotifyOptions {
        match self {
            CheckState::Host(HostState::Up) | CheckState::Service(ServiceState::Ok) => {
                NotifyOptions::RECOVERY
            }
            CheckState::Host(HostState::Down) => NotifyOptions::DOWN,
            CheckState::Host(HostState::Unreachable) => NotifyOptions::UNREACHABLE,
            CheckState::Service(ServiceState::Warning) => NotifyOptions::WARNING,
            CheckState::Service(ServiceState::Critical) => NotifyOptions::CRITICAL,
            CheckState::Service(ServiceState::Unknown) => NotifyOptions::UNKNOWN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckState::Host(HostState::Up) => "UP",
            CheckState::Host(HostState::Down) => "DOWN",
            CheckState::Host(HostState::Unreachable) => "UNREACHABLE",
            CheckState::Service(ServiceState::Ok) => "OK",
            CheckState::Service(ServiceState::Warning) => "WARNING",
            CheckState::Service(ServiceState::Critical) => "CRITICAL",
            CheckState::Service(ServiceState::Unknown) => "UNKNOWN",
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    Soft,
    Hard,
}
