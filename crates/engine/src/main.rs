//! vigild - Monitoring Engine Daemon
//!
//! Reads JSON check results from stdin, one per line, and feeds them to
//! the engine. Notifications go to the dispatch worker's logging sink.

use anyhow::Context;
use engine::{init_logging, ChannelDispatcher, CheckInput, Engine, EngineConfig, LoggingSink, ObjectsFile, Registry};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = EngineConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(&config.log)?;

    info!("=== vigild v{} ===", env!("CARGO_PKG_VERSION"));

    let (registry, checkables) = match &config.objects_path {
        Some(path) => ObjectsFile::load(path)?.into_registry()?,
        None => {
            warn!("No objects_path configured, starting empty");
            (Registry::new(), Vec::new())
        }
    };

    let (dispatcher, worker) = ChannelDispatcher::channel(config.dispatch_queue);
    let worker = tokio::spawn(worker.run(Arc::new(LoggingSink)));

    let engine = Engine::new(&config, registry, Arc::new(dispatcher));
    for checkable in checkables {
        engine.add_checkable(checkable)?;
    }
    info!("Monitoring {} checkable(s)", engine.checkable_count()?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let input: CheckInput = match serde_json::from_str(&line) {
                    Ok(input) => input,
                    Err(e) => {
                        warn!("Ignoring malformed check result: {}", e);
                        continue;
                    }
                };
                let now = chrono::Utc::now().timestamp();
                match engine.on_check_result(&input.id(), &input.to_result(now)) {
                    Ok(report) => debug!("{}: {:?}", input.id(), report),
                    Err(e) => warn!("Check result rejected: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    // Dropping the engine closes the queue so the worker can drain and stop
    drop(engine);
    let delivered = worker.await.context("dispatch worker")?;
    info!("Shutdown complete, {} notification(s) delivered", delivered);
    Ok(())
}
