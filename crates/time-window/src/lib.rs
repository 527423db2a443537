//! Time Window Oracle
//!
//! Decides whether an instant falls inside a weekly schedule, honouring
//! date exceptions and exclusions, and finds the next instant that does.

mod exception;
mod range;
mod window;

pub use exception::{DateException, DateSpec};
pub use range::{TimeRange, SECONDS_PER_DAY};
pub use window::{is_valid, next_valid, TimeWindow, WeeklySchedule, WindowCatalog, MAX_SCAN_DAYS};

use thiserror::Error;

/// Errors raised while building time windows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeWindowError {
    /// Range text does not look like `HH:MM-HH:MM`
    #[error("Invalid time range '{0}': expected HH:MM-HH:MM")]
    InvalidFormat(String),

    /// Clock value outside 00:00..=24:00
    #[error("Clock value '{0}' is out of range [00:00, 24:00]")]
    OutOfBounds(String),

    /// Range starts after it ends
    #[error("Range start {start}s is after its end {end}s")]
    Inverted { start: u32, end: u32 },
}
