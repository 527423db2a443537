//! Rolling State History
//!
//! Fixed-capacity history of "state changed at this check" samples, the
//! input of the flapping percentage computation.

mod history;

pub use history::{StateHistory, DEFAULT_CAPACITY};

use thiserror::Error;

/// History construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("History capacity must be at least 1")]
    ZeroCapacity,
}
