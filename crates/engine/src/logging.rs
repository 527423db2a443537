//! Logging Setup

use crate::{EngineError, LogConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), EngineError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| EngineError::Logging(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| EngineError::Logging(e.to_string()))
}
