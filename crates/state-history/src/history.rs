//! Rolling History Implementation

use crate::HistoryError;
use serde::{Deserialize, Serialize};

/// Default history length (21 checks)
pub const DEFAULT_CAPACITY: usize = 21;

/// Ring of change samples owned by a single checkable.
///
/// Pushing into a full history overwrites the oldest sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHistory {
    /// Pre-allocated storage
    samples: Vec<bool>,
    /// Next write position
    head: usize,
    /// Number of valid samples
    len: usize,
    /// Total samples written (for statistics)
    total_written: u64,
}

impl StateHistory {
    /// Create a history with given capacity
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        Ok(Self {
            samples: vec![false; capacity],
            head: 0,
            len: 0,
            total_written: 0,
        })
    }

    /// Create a history with default capacity (21 samples)
    pub fn with_default_capacity() -> Self {
        Self {
            samples: vec![false; DEFAULT_CAPACITY],
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Append a sample (overwrites oldest if full)
    pub fn push(&mut self, changed: bool) {
        let capacity = self.samples.len();
        self.samples[self.head] = changed;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
        self.total_written += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.samples.len() as f64
    }

    /// Samples from oldest to most recent
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        let capacity = self.samples.len();
        let oldest = (self.head + capacity - self.len) % capacity;
        (0..self.len).map(move |i| self.samples[(oldest + i) % capacity])
    }

    /// Read the last N samples (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<bool> {
        let capacity = self.samples.len();
        let count = count.min(self.len);
        (0..count)
            .map(|i| self.samples[(self.head + capacity - 1 - i) % capacity])
            .collect()
    }

    /// Number of recorded state changes
    pub fn change_count(&self) -> usize {
        self.iter().filter(|&changed| changed).count()
    }

    /// Get total samples written (for statistics)
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.head = 0;
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
