//! Notification Option Bits
//!
//! One bit set shared by checkables (notify_on, flap detection mask),
//! contacts and escalations.

use crate::CheckableError;
use flapping::ObjectKind;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NotifyOptions(u16);

impl NotifyOptions {
    pub const NONE: Self = Self(0);
    /// Return to UP/OK; also the "good state" bit of detection masks
    pub const RECOVERY: Self = Self(1 << 0);
    pub const DOWN: Self = Self(1 << 1);
    pub const UNREACHABLE: Self = Self(1 << 2);
    pub const WARNING: Self = Self(1 << 3);
    pub const UNKNOWN: Self = Self(1 << 4);
    pub const CRITICAL: Self = Self(1 << 5);
    pub const FLAPPING_START: Self = Self(1 << 6);
    pub const FLAPPING_STOP: Self = Self(1 << 7);
    pub const DOWNTIME: Self = Self(1 << 8);
    pub const ALL: Self = Self(0x1ff);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::RECOVERY, "RECOVERY"),
        (Self::DOWN, "DOWN"),
        (Self::UNREACHABLE, "UNREACHABLE"),
        (Self::WARNING, "WARNING"),
        (Self::UNKNOWN, "UNKNOWN"),
        (Self::CRITICAL, "CRITICAL"),
        (Self::FLAPPING_START, "FLAPPINGSTART"),
        (Self::FLAPPING_STOP, "FLAPPINGSTOP"),
        (Self::DOWNTIME, "DOWNTIME"),
    ];

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Every bit of `other` is set
    pub fn contains(&self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Parse the comma separated letter form.
    ///
    /// Hosts use `d,u,r,f,s`, services `w,u,c,r,f,s`; `f` covers both
    /// flapping edges, `a` selects everything and `n` nothing.
    pub fn parse(text: &str, kind: ObjectKind) -> Result<Self, CheckableError> {
        let kind_name = match kind {
            ObjectKind::Host => "host",
            ObjectKind::Service => "service",
        };
        let mut options = Self::NONE;
        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let mut chars = token.chars();
            let letter = chars.next().unwrap_or(' ');
            if chars.next().is_some() {
                return Err(CheckableError::InvalidOption {
                    letter,
                    kind: kind_name,
                });
            }
            let bit = match (letter, kind) {
                ('a', _) => Self::ALL,
                ('n', _) => Self::NONE,
                ('r', _) | ('o', _) => Self::RECOVERY,
                ('f', _) => Self::FLAPPING_START | Self::FLAPPING_STOP,
                ('s', _) => Self::DOWNTIME,
                ('d', ObjectKind::Host) => Self::DOWN,
                ('u', ObjectKind::Host) => Self::UNREACHABLE,
                ('w', ObjectKind::Service) => Self::WARNING,
                ('u', ObjectKind::Service) => Self::UNKNOWN,
                ('c', ObjectKind::Service) => Self::CRITICAL,
                _ => {
                    return Err(CheckableError::InvalidOption {
                        letter,
                        kind: kind_name,
                    })
                }
            };
            options.insert(bit);
        }
        Ok(options)
    }
}

impl BitOr for NotifyOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NotifyOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for NotifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "NotifyOptions({})", names.join("|"))
    }
}
