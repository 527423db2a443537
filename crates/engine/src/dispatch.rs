//! Dispatch Worker
//!
//! `ChannelDispatcher` is the engine-side handle: it enqueues with
//! `try_send` and never blocks a decision. `DispatchWorker` drains the
//! queue into a `NotificationSink` on the runtime.

use notification::{DispatchError, DispatchRequest, Dispatcher};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A queued request with its delivery id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub id: Uuid,
    #[serde(flatten)]
    pub request: DispatchRequest,
}

/// Sink failures; logged by the worker, never retried
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Final destination of a notification
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, delivery: &Delivery) -> Result<(), SinkError>;
}

/// Writes each delivery to the log as one JSON record
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl NotificationSink for LoggingSink {
    fn deliver(&self, delivery: &Delivery) -> Result<(), SinkError> {
        let record = serde_json::to_string(delivery)?;
        info!(
            "NOTIFY {} {} {} via {} ({}): {}",
            delivery.request.reason,
            delivery.request.contact,
            delivery.request.checkable,
            delivery.request.command,
            delivery.request.command_line,
            record
        );
        Ok(())
    }
}

/// Bounded, non-blocking `Dispatcher` backed by a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<Delivery>,
}

impl ChannelDispatcher {
    /// Create a dispatcher/worker pair sharing a queue of `capacity`
    pub fn channel(capacity: usize) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, DispatchWorker::new(receiver))
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            request,
        };
        self.sender.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Drains queued deliveries into a sink
pub struct DispatchWorker {
    receiver: mpsc::Receiver<Delivery>,
}

impl DispatchWorker {
    fn new(receiver: mpsc::Receiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Run until every dispatcher handle is dropped; returns the number delivered
    pub async fn run(mut self, sink: Arc<dyn NotificationSink>) -> u64 {
        info!("Starting dispatch worker");
        let mut delivered = 0;

        while let Some(delivery) = self.receiver.recv().await {
            match sink.deliver(&delivery) {
                Ok(()) => {
                    delivered += 1;
                    debug!("Delivered {} (notification #{})", delivery.id, delivery.request.notification_id);
                }
                Err(e) => {
                    warn!("Delivery {} to '{}' failed: {}", delivery.id, delivery.request.contact, e);
                    metrics::counter!("vigil_sink_failures_total").increment(1);
                }
            }
        }

        info!("Dispatch worker stopped after {} deliveries", delivered);
        delivered
    }
}
