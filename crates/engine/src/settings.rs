//! Engine Configuration
//!
//! Layered from an optional file and `VIGIL_*` environment variables
//! (nested keys use `__`, e.g. `VIGIL_NOTIFICATIONS__INTERVAL_LENGTH`).

use crate::ConfigError;
use checkable::PassiveHardPolicy;
use flapping::FlapConfig;
use notification::NotificationConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Max level: trace, debug, info, warn or error (default: info)
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub notifications: NotificationConfig,
    pub flapping: FlapConfig,
    pub passive_hard_policy: PassiveHardPolicy,
    /// Bounded dispatch queue length (default: 1024)
    pub dispatch_queue: usize,
    /// Object definitions file (JSON)
    pub objects_path: Option<String>,
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notifications: NotificationConfig::default(),
            flapping: FlapConfig::default(),
            passive_hard_policy: PassiveHardPolicy::Honor,
            dispatch_queue: 1024,
            objects_path: None,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("VIGIL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        info!("Loaded engine configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flapping.validate()?;
        Ok(())
    }
}
