//! Vigil Monitoring Engine
//!
//! Wires the state transition processor, flap detector and notification
//! engine behind one facade, with the object registry, configuration,
//! logging and the asynchronous dispatch worker used by `vigild`.

mod dispatch;
mod engine;
mod logging;
mod objects;
mod registry;
mod settings;

pub use dispatch::{ChannelDispatcher, Delivery, DispatchWorker, LoggingSink, NotificationSink, SinkError};
pub use engine::{CheckReport, Engine};
pub use logging::init_logging;
pub use objects::{
    CheckInput, CheckableDef, ContactDef, EscalationDef, HostDef, ObjectsFile, ServiceDef, TimePeriodDef,
};
pub use registry::Registry;
pub use settings::{EngineConfig, LogConfig};

use checkable::{CheckableError, CheckableId};
use flapping::FlapError;
use thiserror::Error;

/// Configuration and object definition errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid object file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidOption(#[from] CheckableError),

    #[error("Invalid flap thresholds: {0}")]
    Flap(#[from] FlapError),

    #[error("Unknown {kind} '{name}'")]
    UnknownReference { kind: &'static str, name: String },

    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("Time period '{0}' excludes itself")]
    ExclusionCycle(String),
}

/// Engine facade errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown checkable {0}")]
    UnknownCheckable(CheckableId),

    #[error("Checkable {0} already registered")]
    DuplicateCheckable(CheckableId),

    #[error("Acknowledgement of {0} needs a sticky or normal type")]
    InvalidAcknowledgement(CheckableId),

    #[error("Lock error: {0}")]
    LockPoisoned(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
