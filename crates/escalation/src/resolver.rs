//! Escalation Resolution

use checkable::{Checkable, CheckableId, NotifyOptions};
use std::collections::BTreeSet;
use time_window::{is_valid, WindowCatalog};
use tracing::{debug, warn};

/// Widens or redirects the recipients of notification numbers in
/// `[first_notification, last_notification]`
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    /// Checkables covered (groups already flattened)
    pub applies_to: BTreeSet<CheckableId>,
    pub first_notification: u32,
    /// 0 = unbounded
    pub last_notification: u32,
    /// Replaces the checkable's notification interval while matching
    pub notification_interval: Option<u32>,
    /// States this escalation applies to; RECOVERY covers UP/OK
    pub options: NotifyOptions,
    pub contacts: Vec<String>,
    /// Time window name; `None` is always valid
    pub period: Option<String>,
}

impl Escalation {
    pub fn covers_number(&self, number: u32) -> bool {
        number >= self.first_notification
            && (self.last_notification == 0 || number <= self.last_notification)
    }

    fn matches(&self, checkable: &Checkable, number: u32, now: i64, windows: &dyn WindowCatalog) -> bool {
        if !self.applies_to.contains(&checkable.id) || !self.covers_number(number) {
            return false;
        }
        if !self.options.contains(checkable.current_state.option_bit()) {
            return false;
        }
        match &self.period {
            None => true,
            Some(name) => match windows.window(name) {
                Some(window) => is_valid(Some(window), now),
                None => {
                    warn!("Escalation period '{}' not found, treating as always valid", name);
                    true
                }
            },
        }
    }
}

/// Contacts chosen for one notification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub contacts: BTreeSet<String>,
    /// Smallest interval among matching escalations that define one
    pub interval_override: Option<u32>,
    /// At least one escalation matched
    pub escalated: bool,
}

/// Resolve the recipients of notification `number` for `checkable`.
///
/// Matching escalations contribute their contacts additively; with no
/// match the checkable's own contacts are used.
pub fn resolve<'a>(
    checkable: &Checkable,
    escalations: impl IntoIterator<Item = &'a Escalation>,
    number: u32,
    now: i64,
    windows: &dyn WindowCatalog,
) -> Resolution {
    let mut resolution = Resolution::default();
    for escalation in escalations {
        if !escalation.matches(checkable, number, now, windows) {
            continue;
        }
        resolution.escalated = true;
        resolution.contacts.extend(escalation.contacts.iter().cloned());
        if let Some(interval) = escalation.notification_interval {
            resolution.interval_override = Some(
                resolution
                    .interval_override
                    .map_or(interval, |current| current.min(interval)),
            );
        }
    }

    if resolution.escalated {
        debug!(
            "{} notification #{} escalated to {} contact(s)",
            checkable.id,
            number,
            resolution.contacts.len()
        );
    } else {
        resolution.contacts = checkable.settings.contacts.iter().cloned().collect();
    }
    resolution
}
