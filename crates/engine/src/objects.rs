//! Object Definitions
//!
//! JSON file with commands, time periods, contacts, hosts, services and
//! escalations. Groups are expected to be flattened already.

use crate::{ConfigError, Registry};
use checkable::{
    CheckResult, Checkable, CheckableId, CheckableSettings, NotifyOptions, ObjectKind,
};
use escalation::{Contact, ContactTarget, Escalation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use time_window::TimeWindow;
use tracing::{info, warn};

/// Parsed object file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectsFile {
    /// Command name to command line
    pub commands: HashMap<String, String>,
    pub timeperiods: Vec<TimePeriodDef>,
    pub contacts: Vec<ContactDef>,
    pub hosts: Vec<HostDef>,
    pub services: Vec<ServiceDef>,
    pub escalations: Vec<EscalationDef>,
}

/// Time window plus the names of the periods it excludes
#[derive(Debug, Clone, Deserialize)]
pub struct TimePeriodDef {
    #[serde(flatten)]
    pub window: TimeWindow,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContactDef {
    pub name: String,
    pub alias: String,
    pub email: Option<String>,
    pub host_notifications_enabled: bool,
    pub service_notifications_enabled: bool,
    /// Option letters, e.g. "d,u,r"
    pub host_notification_options: Option<String>,
    pub service_notification_options: Option<String>,
    pub host_notification_command: Option<String>,
    pub service_notification_command: Option<String>,
    pub host_notification_period: Option<String>,
    pub service_notification_period: Option<String>,
    pub utc_offset_seconds: Option<i32>,
}

impl Default for ContactDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            alias: String::new(),
            email: None,
            host_notifications_enabled: true,
            service_notifications_enabled: true,
            host_notification_options: None,
            service_notification_options: None,
            host_notification_command: None,
            service_notification_command: None,
            host_notification_period: None,
            service_notification_period: None,
            utc_offset_seconds: None,
        }
    }
}

/// Settings shared by hosts and services; unset fields take engine defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckableDef {
    pub display_name: Option<String>,
    pub max_check_attempts: Option<u32>,
    pub passive_checks_enabled: Option<bool>,
    pub notification_options: Option<String>,
    pub notification_interval: Option<u32>,
    pub first_notification_delay: Option<u32>,
    pub recovery_notification_delay: Option<u32>,
    pub notifications_enabled: Option<bool>,
    pub notification_period: Option<String>,
    pub is_volatile: Option<bool>,
    pub flap_detection_enabled: Option<bool>,
    pub flap_detection_options: Option<String>,
    pub low_flap_threshold: Option<f64>,
    pub high_flap_threshold: Option<f64>,
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostDef {
    pub host_name: String,
    #[serde(flatten)]
    pub common: CheckableDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDef {
    pub host_name: String,
    pub service_description: String,
    #[serde(flatten)]
    pub common: CheckableDef,
}

/// Host escalation when `service_description` is empty, otherwise one
/// escalation covering every listed service on every listed host
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EscalationDef {
    pub host_name: Vec<String>,
    pub service_description: Vec<String>,
    pub first_notification: u32,
    pub last_notification: u32,
    pub notification_interval: Option<u32>,
    pub escalation_options: Option<String>,
    pub contacts: Vec<String>,
    pub escalation_period: Option<String>,
}

fn parse_options(text: Option<&str>, kind: ObjectKind) -> Result<NotifyOptions, ConfigError> {
    match text {
        Some(text) => Ok(NotifyOptions::parse(text, kind)?),
        None => Ok(NotifyOptions::ALL),
    }
}

impl CheckableDef {
    fn settings(&self, kind: ObjectKind, fallback_name: &str) -> Result<CheckableSettings, ConfigError> {
        let defaults = CheckableSettings::default();
        Ok(CheckableSettings {
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| fallback_name.to_string()),
            max_attempts: self.max_check_attempts.unwrap_or(defaults.max_attempts),
            accept_passive_checks: self
                .passive_checks_enabled
                .unwrap_or(defaults.accept_passive_checks),
            notify_on: parse_options(self.notification_options.as_deref(), kind)?,
            notification_interval: self
                .notification_interval
                .unwrap_or(defaults.notification_interval),
            first_notification_delay: self.first_notification_delay.unwrap_or(0),
            recovery_notification_delay: self.recovery_notification_delay.unwrap_or(0),
            notifications_enabled: self
                .notifications_enabled
                .unwrap_or(defaults.notifications_enabled),
            notification_period: self.notification_period.clone(),
            is_volatile: self.is_volatile.unwrap_or(false),
            flap_detection_enabled: self
                .flap_detection_enabled
                .unwrap_or(defaults.flap_detection_enabled),
            flap_detection_on: parse_options(self.flap_detection_options.as_deref(), kind)?,
            low_flap_threshold: self.low_flap_threshold,
            high_flap_threshold: self.high_flap_threshold,
            contacts: self.contacts.clone(),
        })
    }
}

impl ContactDef {
    fn to_contact(&self) -> Result<Contact, ConfigError> {
        Ok(Contact {
            name: self.name.clone(),
            alias: self.alias.clone(),
            email: self.email.clone(),
            host: ContactTarget {
                enabled: self.host_notifications_enabled,
                options: parse_options(self.host_notification_options.as_deref(), ObjectKind::Host)?,
                command: self.host_notification_command.clone(),
                period: self.host_notification_period.clone(),
            },
            service: ContactTarget {
                enabled: self.service_notifications_enabled,
                options: parse_options(
                    self.service_notification_options.as_deref(),
                    ObjectKind::Service,
                )?,
                command: self.service_notification_command.clone(),
                period: self.service_notification_period.clone(),
            },
            utc_offset_seconds: self.utc_offset_seconds,
        })
    }
}

fn resolve_period(
    name: &str,
    defs: &HashMap<&str, &TimePeriodDef>,
    visiting: &mut Vec<String>,
) -> Result<TimeWindow, ConfigError> {
    let def = defs.get(name).ok_or_else(|| ConfigError::UnknownReference {
        kind: "timeperiod",
        name: name.to_string(),
    })?;
    if visiting.iter().any(|n| n == name) {
        return Err(ConfigError::ExclusionCycle(name.to_string()));
    }
    visiting.push(name.to_string());
    let mut window = def.window.clone();
    for excluded in &def.exclude {
        window = window.with_exclusion(resolve_period(excluded, defs, visiting)?);
    }
    visiting.pop();
    Ok(window)
}

fn check_contacts<'a>(
    names: impl IntoIterator<Item = &'a String>,
    known: &HashSet<&str>,
) -> Result<(), ConfigError> {
    for name in names {
        if !known.contains(name.as_str()) {
            return Err(ConfigError::UnknownReference {
                kind: "contact",
                name: name.clone(),
            });
        }
    }
    Ok(())
}

impl ObjectsFile {
    /// Read and parse an object file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let objects: ObjectsFile = serde_json::from_str(&text)?;
        info!(
            "Loaded {} host(s), {} service(s), {} contact(s) from {}",
            objects.hosts.len(),
            objects.services.len(),
            objects.contacts.len(),
            path
        );
        Ok(objects)
    }

    /// Validate references and build the registry and the checkables
    pub fn into_registry(self) -> Result<(Registry, Vec<Checkable>), ConfigError> {
        let mut registry = Registry::new();
        for (name, line) in &self.commands {
            registry = registry.with_command(name.clone(), line.clone());
        }

        let mut periods: HashMap<&str, &TimePeriodDef> = HashMap::new();
        for def in &self.timeperiods {
            if periods.insert(def.window.name.as_str(), def).is_some() {
                return Err(ConfigError::Duplicate {
                    kind: "timeperiod",
                    name: def.window.name.clone(),
                });
            }
        }
        for def in &self.timeperiods {
            let window = resolve_period(&def.window.name, &periods, &mut Vec::new())?;
            registry = registry.with_window(window);
        }

        let mut contact_names = HashSet::new();
        for def in &self.contacts {
            if !contact_names.insert(def.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "contact",
                    name: def.name.clone(),
                });
            }
            let contact = def.to_contact()?;
            for target in [&contact.host, &contact.service] {
                if let Some(command) = &target.command {
                    if !self.commands.contains_key(command) {
                        warn!("Contact '{}' uses unknown command '{}'", contact.name, command);
                    }
                }
                if let Some(period) = &target.period {
                    if !periods.contains_key(period.as_str()) {
                        warn!("Contact '{}' uses unknown time period '{}'", contact.name, period);
                    }
                }
            }
            registry = registry.with_contact(contact);
        }

        let mut checkables = Vec::new();
        let mut ids = HashSet::new();
        let mut hosts = HashSet::new();
        for def in &self.hosts {
            let id = CheckableId::host(def.host_name.clone());
            if !ids.insert(id.clone()) {
                return Err(ConfigError::Duplicate {
                    kind: "host",
                    name: def.host_name.clone(),
                });
            }
            hosts.insert(def.host_name.as_str());
            check_contacts(&def.common.contacts, &contact_names)?;
            let settings = def.common.settings(ObjectKind::Host, &def.host_name)?;
            checkables.push(Checkable::new(id, settings)?);
        }
        for def in &self.services {
            if !hosts.contains(def.host_name.as_str()) {
                return Err(ConfigError::UnknownReference {
                    kind: "host",
                    name: def.host_name.clone(),
                });
            }
            let id = CheckableId::service(def.host_name.clone(), def.service_description.clone());
            if !ids.insert(id.clone()) {
                return Err(ConfigError::Duplicate {
                    kind: "service",
                    name: id.to_string(),
                });
            }
            check_contacts(&def.common.contacts, &contact_names)?;
            let settings = def
                .common
                .settings(ObjectKind::Service, &def.service_description)?;
            checkables.push(Checkable::new(id, settings)?);
        }

        for def in &self.escalations {
            check_contacts(&def.contacts, &contact_names)?;
            let kind = if def.service_description.is_empty() {
                ObjectKind::Host
            } else {
                ObjectKind::Service
            };
            let mut applies_to = BTreeSet::new();
            for host in &def.host_name {
                if kind == ObjectKind::Host {
                    applies_to.insert(CheckableId::host(host.clone()));
                } else {
                    for service in &def.service_description {
                        applies_to.insert(CheckableId::service(host.clone(), service.clone()));
                    }
                }
            }
            if let Some(unknown) = applies_to.iter().find(|id| !ids.contains(*id)) {
                return Err(ConfigError::UnknownReference {
                    kind: "escalation target",
                    name: unknown.to_string(),
                });
            }
            registry = registry.with_escalation(Escalation {
                applies_to,
                first_notification: def.first_notification,
                last_notification: def.last_notification,
                notification_interval: def.notification_interval,
                options: parse_options(def.escalation_options.as_deref(), kind)?,
                contacts: def.contacts.clone(),
                period: def.escalation_period.clone(),
            });
        }

        Ok((registry, checkables))
    }
}

/// One JSON line on the daemon's input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInput {
    pub host: String,
    #[serde(default)]
    pub service: Option<String>,
    pub return_code: i32,
    #[serde(default)]
    pub output: String,
    /// Unix seconds; reception time when absent
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub passive: bool,
    #[serde(default)]
    pub hard_assertion: bool,
}

impl CheckInput {
    pub fn id(&self) -> CheckableId {
        match &self.service {
            Some(service) => CheckableId::service(self.host.clone(), service.clone()),
            None => CheckableId::host(self.host.clone()),
        }
    }

    pub fn to_result(&self, received_at: i64) -> CheckResult {
        CheckResult {
            return_code: self.return_code,
            output: self.output.clone(),
            timestamp: self.timestamp.unwrap_or(received_at),
            passive: self.passive,
            hard_assertion: self.hard_assertion,
        }
    }
}
