//! Downtime and Acknowledgement Snapshot
//!
//! Written by the downtime and acknowledgement subsystems, read by the
//! notification engine. Depth and acknowledgement type share one atomic
//! word so a reader never sees a torn pair.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckType {
    #[default]
    None,
    /// Cleared on any state change
    Normal,
    /// Cleared only on recovery
    Sticky,
}

impl AckType {
    fn to_bits(self) -> u64 {
        match self {
            AckType::None => 0,
            AckType::Normal => 1,
            AckType::Sticky => 2,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits {
            1 => AckType::Normal,
            2 => AckType::Sticky,
            _ => AckType::None,
        }
    }
}

/// Consistent view of the suppression state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Suppression {
    pub downtime_depth: u32,
    pub ack: AckType,
}

impl Suppression {
    pub fn in_downtime(&self) -> bool {
        self.downtime_depth > 0
    }

    pub fn acknowledged(&self) -> bool {
        self.ack != AckType::None
    }

    fn pack(self) -> u64 {
        u64::from(self.downtime_depth) | (self.ack.to_bits() << 32)
    }

    fn unpack(word: u64) -> Self {
        Self {
            downtime_depth: (word & 0xffff_ffff) as u32,
            ack: AckType::from_bits(word >> 32),
        }
    }
}

/// Shared handle; clones point at the same state
#[derive(Debug, Clone, Default)]
pub struct SuppressionHandle {
    word: Arc<AtomicU64>,
}

impl SuppressionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Suppression {
        Suppression::unpack(self.word.load(Ordering::Acquire))
    }

    /// Enter a (possibly nested) downtime; returns the new depth
    pub fn start_downtime(&self) -> u32 {
        self.update(|s| Suppression {
            downtime_depth: s.downtime_depth.saturating_add(1),
            ..s
        })
        .downtime_depth
    }

    /// Leave a downtime; returns the new depth
    pub fn end_downtime(&self) -> u32 {
        self.update(|s| Suppression {
            downtime_depth: s.downtime_depth.saturating_sub(1),
            ..s
        })
        .downtime_depth
    }

    pub fn set_ack(&self, ack: AckType) {
        self.update(|s| Suppression { ack, ..s });
    }

    /// Replace both values at once
    pub fn restore(&self, suppression: Suppression) {
        self.word.store(suppression.pack(), Ordering::Release);
    }

    fn update(&self, f: impl Fn(Suppression) -> Suppression) -> Suppression {
        let previous = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(f(Suppression::unpack(word)).pack())
            })
            .unwrap_or_else(|word| word);
        f(Suppression::unpack(previous))
    }
}
