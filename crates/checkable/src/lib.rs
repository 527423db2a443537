//! Checkable Model
//!
//! Hosts and services share one `Checkable` type whose identity carries
//! the variant. This crate owns the soft/hard state machine, the retained
//! state record and the lock-free downtime/acknowledgement snapshot.

mod checkable;
mod id;
mod options;
mod retained;
mod state;
mod suppression;
mod transition;

pub use checkable::{Checkable, CheckableSettings, DependencyOracle, NoDependencies};
pub use flapping::ObjectKind;
pub use id::CheckableId;
pub use options::NotifyOptions;
pub use retained::RetainedState;
pub use state::{CheckState, HostState, ServiceState, StateType};
pub use suppression::{AckType, Suppression, SuppressionHandle};
pub use transition::{CheckResult, PassiveHardPolicy, TransitionOutcome, Trigger};

use thiserror::Error;

/// Checkable errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckableError {
    #[error("Unknown {kind} notification option '{letter}'")]
    InvalidOption { letter: char, kind: &'static str },

    #[error("Checkable {0} must allow at least one check attempt")]
    ZeroMaxAttempts(CheckableId),
}
