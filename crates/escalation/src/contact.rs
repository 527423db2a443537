//! Contact Model

use checkable::{NotifyOptions, ObjectKind};

/// How a contact is notified about one kind of object
#[derive(Debug, Clone, PartialEq)]
pub struct ContactTarget {
    pub enabled: bool,
    pub options: NotifyOptions,
    /// Command name; `None` means nothing can be sent
    pub command: Option<String>,
    /// Time window name; `None` is always valid
    pub period: Option<String>,
}

impl Default for ContactTarget {
    fn default() -> Self {
        Self {
            enabled: true,
            options: NotifyOptions::ALL,
            command: None,
            period: None,
        }
    }
}

/// A notification recipient
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contact {
    pub name: String,
    pub alias: String,
    pub email: Option<String>,
    pub host: ContactTarget,
    pub service: ContactTarget,
    /// Offset used to render local times for this contact
    pub utc_offset_seconds: Option<i32>,
}

impl Contact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn target(&self, kind: ObjectKind) -> &ContactTarget {
        match kind {
            ObjectKind::Host => &self.host,
            ObjectKind::Service => &self.service,
        }
    }
}
