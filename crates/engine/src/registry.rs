//! Object Registry
//!
//! Contacts, escalations, time windows and commands. Built once from the
//! object file and swapped as a whole on reload.

use checkable::CheckableId;
use escalation::{Contact, Escalation};
use notification::Directory;
use std::collections::HashMap;
use time_window::{TimeWindow, WindowCatalog};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    contacts: HashMap<String, Contact>,
    escalations: Vec<Escalation>,
    windows: HashMap<String, TimeWindow>,
    /// Command name to command line
    commands: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.insert(contact.name.clone(), contact);
        self
    }

    pub fn with_escalation(mut self, escalation: Escalation) -> Self {
        self.escalations.push(escalation);
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.windows.insert(window.name.clone(), window);
        self
    }

    pub fn with_command(mut self, name: impl Into<String>, line: impl Into<String>) -> Self {
        self.commands.insert(name.into(), line.into());
        self
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn escalation_count(&self) -> usize {
        self.escalations.len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

impl Directory for Registry {
    fn contact(&self, name: &str) -> Option<&Contact> {
        self.contacts.get(name)
    }

    fn escalations_for(&self, id: &CheckableId) -> Vec<&Escalation> {
        self.escalations
            .iter()
            .filter(|escalation| escalation.applies_to.contains(id))
            .collect()
    }

    fn windows(&self) -> &dyn WindowCatalog {
        &self.windows
    }

    fn command_line(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(String::as_str)
    }
}
