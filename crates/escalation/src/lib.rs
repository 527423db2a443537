//! Escalation Resolver
//!
//! Contacts, escalation rules and the resolution of the recipient set
//! for a given notification number.

mod contact;
mod resolver;

pub use contact::{Contact, ContactTarget};
pub use resolver::{resolve, Escalation, Resolution};
