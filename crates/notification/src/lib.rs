//! Notification Decision Engine
//!
//! Decides whether a notification goes out for a checkable, to whom,
//! and hands each recipient to a non-blocking dispatcher.

mod dispatch;
mod engine;
mod gate;
mod reason;

pub use dispatch::{DispatchError, DispatchRequest, Dispatcher};
pub use engine::{Directory, NotificationConfig, NotificationEngine, NotifyOutcome};
pub use gate::Gate;
pub use reason::{NotificationFlags, NotificationReason, NotifyRequest};
