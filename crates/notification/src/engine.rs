//! Notification Engine Implementation

use crate::{DispatchRequest, Dispatcher, Gate, NotificationReason, NotifyRequest};
use checkable::{Checkable, CheckableId, NotifyOptions, StateType};
use chrono::{DateTime, FixedOffset};
use escalation::{resolve, Contact, Escalation, Resolution};
use flapping::FlapEdge;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time_window::WindowCatalog;
use tracing::{debug, info, warn};

/// Notification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Program-wide switch (default: true)
    pub enabled: bool,
    /// Seconds per interval unit (default: 60)
    pub interval_length: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_length: 60,
        }
    }
}

/// Read-only view of the object configuration
pub trait Directory {
    fn contact(&self, name: &str) -> Option<&Contact>;
    fn escalations_for(&self, id: &CheckableId) -> Vec<&Escalation>;
    fn windows(&self) -> &dyn WindowCatalog;
    /// Command line registered under `name`
    fn command_line(&self, name: &str) -> Option<&str>;
}

/// Result of a notify call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// All gates passed and a notification id was consumed
    Sent {
        notification_id: u64,
        recipients: Vec<String>,
        skipped: usize,
    },
    Gated(Gate),
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent { .. })
    }

    pub fn recipients(&self) -> &[String] {
        match self {
            NotifyOutcome::Sent { recipients, .. } => recipients,
            NotifyOutcome::Gated(_) => &[],
        }
    }
}

/// Gates notifications and fans them out to contacts
pub struct NotificationEngine {
    config: NotificationConfig,
    dispatcher: Arc<dyn Dispatcher>,
}

impl NotificationEngine {
    pub fn new(config: NotificationConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        info!("Creating notification engine with config: {:?}", config);
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    /// Decide and dispatch one notification.
    ///
    /// Never fails: rejections come back as `NotifyOutcome::Gated`, and
    /// per-contact problems are logged and skipped.
    pub fn notify(
        &self,
        checkable: &mut Checkable,
        request: &NotifyRequest,
        now: i64,
        directory: &dyn Directory,
    ) -> NotifyOutcome {
        let reason = request.reason;
        let number = match reason {
            NotificationReason::Problem => checkable.notification_number + 1,
            _ => checkable.notification_number,
        };
        let escalations = directory.escalations_for(&checkable.id);
        let resolution = if request.flags.broadcast {
            broadcast(checkable, &escalations)
        } else {
            resolve(checkable, escalations.iter().copied(), number, now, directory.windows())
        };

        if let Err(gate) = self.check_gates(checkable, request, &resolution, now, directory) {
            if reason == NotificationReason::Recovery && closes_episode(gate) {
                checkable.notification_number = 0;
                checkable.problem_notified = false;
            }
            debug!("{} notification for {} gated: {}", reason, checkable.id, gate);
            metrics::counter!("vigil_notifications_gated_total", "gate" => gate.as_str()).increment(1);
            return NotifyOutcome::Gated(gate);
        }

        let notification_id = checkable.next_notification_id;
        checkable.next_notification_id += 1;
        if reason == NotificationReason::Problem {
            checkable.notification_number = number;
        }

        let template = DispatchRequest {
            notification_id,
            notification_number: checkable.notification_number,
            reason,
            checkable: checkable.id.clone(),
            display_name: checkable.settings.display_name.clone(),
            state: checkable.current_state,
            state_type: checkable.state_type,
            output: checkable.plugin_output.clone(),
            contact: String::new(),
            contact_email: None,
            command: String::new(),
            command_line: String::new(),
            author: request.author.clone(),
            comment: request.comment.clone(),
            escalated: resolution.escalated,
            timestamp: now,
            local_time: None,
        };

        let mut recipients = Vec::new();
        let mut skipped = 0;
        for name in &resolution.contacts {
            let Some(contact) = directory.contact(name) else {
                warn!("Contact '{}' for {} not found, skipping", name, checkable.id);
                record_skip("unknown_contact");
                skipped += 1;
                continue;
            };
            let found = self.contact_command(checkable, reason, contact, now, directory);
            let (command, command_line) = match found {
                Ok(found) => found,
                Err(cause) => {
                    record_skip(cause);
                    skipped += 1;
                    continue;
                }
            };

            let dispatch_request = DispatchRequest {
                contact: contact.name.clone(),
                contact_email: contact.email.clone(),
                command: command.to_string(),
                command_line: command_line.to_string(),
                local_time: local_time(contact, now),
                ..template.clone()
            };
            match self.dispatcher.dispatch(dispatch_request) {
                Ok(()) => recipients.push(contact.name.clone()),
                Err(e) => {
                    warn!("Dispatch of notification #{} to '{}' failed: {}", notification_id, contact.name, e);
                    record_skip("dispatch_failed");
                    skipped += 1;
                }
            }
        }

        if !recipients.is_empty() {
            checkable.last_notification = now;
        }
        match reason {
            NotificationReason::Problem => checkable.problem_notified = true,
            NotificationReason::Recovery => {
                checkable.problem_notified = false;
                checkable.notification_number = 0;
            }
            NotificationReason::FlappingStart => checkable.last_flap_notified = Some(FlapEdge::Start),
            NotificationReason::FlappingStop => checkable.last_flap_notified = Some(FlapEdge::Stop),
            _ => {}
        }

        info!(
            "{} notification #{} for {} ({}): {} contact(s) notified, {} skipped",
            reason,
            notification_id,
            checkable.id,
            checkable.current_state,
            recipients.len(),
            skipped
        );
        metrics::counter!("vigil_notifications_sent_total", "reason" => reason.as_str()).increment(1);

        NotifyOutcome::Sent {
            notification_id,
            recipients,
            skipped,
        }
    }

    fn check_gates(
        &self,
        checkable: &Checkable,
        request: &NotifyRequest,
        resolution: &Resolution,
        now: i64,
        directory: &dyn Directory,
    ) -> Result<(), Gate> {
        let forced = request.flags.forced;
        let settings = &checkable.settings;
        if !forced && (!self.config.enabled || !settings.notifications_enabled) {
            return Err(Gate::NotificationsDisabled);
        }

        let interval_length = i64::from(self.config.interval_length);
        let since_hard_change = now - checkable.last_hard_state_change;
        let suppression = checkable.suppression();
        let enabled = |reason| {
            option_for(reason, checkable).map_or(true, |bit| settings.notify_on.contains(bit))
        };

        match request.reason {
            NotificationReason::Problem => {
                if !checkable.is_problem() {
                    return Err(Gate::NotAProblem);
                }
                if checkable.state_type != StateType::Hard {
                    return Err(Gate::SoftState);
                }
                if checkable.is_flapping() {
                    return Err(Gate::Flapping);
                }
                if since_hard_change < i64::from(settings.first_notification_delay) * interval_length {
                    return Err(Gate::FirstNotificationDelay);
                }
                if !enabled(NotificationReason::Problem) {
                    return Err(Gate::StateNotEnabled);
                }
                if suppression.in_downtime() {
                    return Err(Gate::InDowntime);
                }
                if suppression.acknowledged() {
                    return Err(Gate::Acknowledged);
                }
            }
            NotificationReason::Recovery => {
                if checkable.is_problem() || checkable.state_type != StateType::Hard {
                    return Err(Gate::NotRecovered);
                }
                if !enabled(NotificationReason::Recovery) {
                    return Err(Gate::StateNotEnabled);
                }
                if !checkable.problem_notified && !settings.is_volatile {
                    return Err(Gate::NoProblemNotified);
                }
                if since_hard_change < i64::from(settings.recovery_notification_delay) * interval_length {
                    return Err(Gate::RecoveryDelay);
                }
            }
            NotificationReason::Acknowledgement => {
                if !checkable.is_problem() {
                    return Err(Gate::NotAProblem);
                }
            }
            NotificationReason::FlappingStart => {
                if !enabled(NotificationReason::FlappingStart) {
                    return Err(Gate::FlapOptionDisabled);
                }
                if checkable.last_flap_notified == Some(FlapEdge::Start) {
                    return Err(Gate::FlapEdgeAlreadyNotified);
                }
                if suppression.in_downtime() {
                    return Err(Gate::InDowntime);
                }
            }
            NotificationReason::FlappingStop => {
                if !enabled(NotificationReason::FlappingStop) {
                    return Err(Gate::FlapOptionDisabled);
                }
                if checkable.last_flap_notified != Some(FlapEdge::Start) {
                    return Err(Gate::NoFlapStartNotified);
                }
            }
            NotificationReason::DowntimeStart | NotificationReason::DowntimeEnd => {
                if !enabled(request.reason) {
                    return Err(Gate::DowntimeOptionDisabled);
                }
            }
            NotificationReason::Custom => {}
        }

        let same_episode = checkable.problem_notified
            && checkable.last_hard_state_change <= checkable.last_notification;
        if request.reason == NotificationReason::Problem && !forced && !settings.is_volatile && same_episode {
            let interval = resolution
                .interval_override
                .unwrap_or(settings.notification_interval);
            if interval == 0 {
                return Err(Gate::Throttled);
            }
            if now - checkable.last_notification < i64::from(interval) * interval_length {
                return Err(Gate::Throttled);
            }
        }

        if !forced {
            if let Some(name) = &settings.notification_period {
                match directory.windows().window(name) {
                    Some(window) if !window.contains(now) => {
                        return Err(Gate::OutsideNotificationPeriod);
                    }
                    Some(_) => {}
                    None => warn!(
                        "Notification period '{}' of {} not found, treating as always valid",
                        name, checkable.id
                    ),
                }
            }
        }

        Ok(())
    }

    /// Command name and line to run for `contact`, or the reason the contact is skipped
    fn contact_command<'a>(
        &self,
        checkable: &Checkable,
        reason: NotificationReason,
        contact: &'a Contact,
        now: i64,
        directory: &'a dyn Directory,
    ) -> Result<(&'a str, &'a str), &'static str> {
        let target = contact.target(checkable.id.kind());
        if !target.enabled {
            debug!("Contact '{}' has notifications disabled", contact.name);
            return Err("contact_disabled");
        }

        if let Some(period) = &target.period {
            match directory.windows().window(period) {
                Some(window) if !window.contains(now) => {
                    debug!("Contact '{}' outside its period '{}'", contact.name, period);
                    return Err("outside_contact_period");
                }
                Some(_) => {}
                None => {
                    warn!("Period '{}' of contact '{}' not found, skipping", period, contact.name);
                    return Err("unknown_period");
                }
            }
        }

        if let Some(bit) = option_for(reason, checkable) {
            if !target.options.contains(bit) {
                debug!("Contact '{}' does not want {} notifications", contact.name, reason);
                return Err("option_filtered");
            }
        }

        match target.command.as_deref() {
            Some(command) => match directory.command_line(command) {
                Some(line) => Ok((command, line)),
                None => {
                    warn!("Command '{}' of contact '{}' not found, skipping", command, contact.name);
                    Err("unknown_command")
                }
            },
            None => {
                warn!("Contact '{}' has no notification command, skipping", contact.name);
                Err("no_command")
            }
        }
    }
}

/// A RECOVERY refused for these reasons will never be sent for the episode
fn closes_episode(gate: Gate) -> bool {
    matches!(gate, Gate::NoProblemNotified | Gate::StateNotEnabled)
}

/// Option bit that must be enabled for `reason`; `None` = always allowed
fn option_for(reason: NotificationReason, checkable: &Checkable) -> Option<NotifyOptions> {
    match reason {
        NotificationReason::Problem => Some(checkable.current_state.option_bit()),
        NotificationReason::Recovery => Some(NotifyOptions::RECOVERY),
        NotificationReason::FlappingStart => Some(NotifyOptions::FLAPPING_START),
        NotificationReason::FlappingStop => Some(NotifyOptions::FLAPPING_STOP),
        NotificationReason::DowntimeStart | NotificationReason::DowntimeEnd => Some(NotifyOptions::DOWNTIME),
        NotificationReason::Acknowledgement | NotificationReason::Custom => None,
    }
}

fn broadcast(checkable: &Checkable, escalations: &[&Escalation]) -> Resolution {
    let mut resolution = Resolution {
        escalated: !escalations.is_empty(),
        ..Resolution::default()
    };
    resolution.contacts.extend(checkable.settings.contacts.iter().cloned());
    for escalation in escalations {
        resolution.contacts.extend(escalation.contacts.iter().cloned());
    }
    resolution
}

fn local_time(contact: &Contact, now: i64) -> Option<DateTime<FixedOffset>> {
    let offset = contact.utc_offset_seconds.and_then(FixedOffset::east_opt)?;
    DateTime::from_timestamp(now, 0).map(|utc| utc.with_timezone(&offset))
}

fn record_skip(cause: &'static str) {
    metrics::counter!("vigil_contact_skips_total", "cause" => cause).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DispatchError, NotificationFlags};
    use checkable::{AckType, CheckResult, CheckableSettings, PassiveHardPolicy};
    use escalation::ContactTarget;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time_window::TimeWindow;

    const CRITICAL: i32 = 2;
    const OK: i32 = 0;

    #[derive(Default)]
    struct TestDirectory {
        contacts: HashMap<String, Contact>,
        escalations: Vec<Escalation>,
        windows: HashMap<String, TimeWindow>,
        commands: HashMap<String, String>,
    }

    impl TestDirectory {
        fn new() -> Self {
            let mut directory = Self::default();
            directory
                .commands
                .insert("notify-email".to_string(), "/usr/bin/mail -s alert".to_string());
            for name in ["alice", "bob"] {
                directory.add_contact(name, NotifyOptions::ALL);
            }
            directory
        }

        fn add_contact(&mut self, name: &str, options: NotifyOptions) {
            let target = ContactTarget {
                options,
                command: Some("notify-email".to_string()),
                ..ContactTarget::default()
            };
            let contact = Contact {
                host: target.clone(),
                service: target,
                ..Contact::new(name)
            };
            self.contacts.insert(name.to_string(), contact);
        }
    }

    impl Directory for TestDirectory {
        fn contact(&self, name: &str) -> Option<&Contact> {
            self.contacts.get(name)
        }

        fn escalations_for(&self, id: &CheckableId) -> Vec<&Escalation> {
            self.escalations.iter().filter(|e| e.applies_to.contains(id)).collect()
        }

        fn windows(&self) -> &dyn WindowCatalog {
            &self.windows
        }

        fn command_line(&self, name: &str) -> Option<&str> {
            self.commands.get(name).map(String::as_str)
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<DispatchRequest>>,
        refuse: Option<String>,
    }

    impl RecordingDispatcher {
        fn contacts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|r| r.contact.clone()).collect()
        }
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&self, request: DispatchRequest) -> Result<(), DispatchError> {
            if self.refuse.as_deref() == Some(request.contact.as_str()) {
                return Err(DispatchError::QueueFull);
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        }
    }

    fn setup() -> (NotificationEngine, Arc<RecordingDispatcher>, TestDirectory) {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = NotificationEngine::new(NotificationConfig::default(), dispatcher.clone());
        (engine, dispatcher, TestDirectory::new())
    }

    fn service() -> Checkable {
        let settings = CheckableSettings {
            max_attempts: 1,
            notification_interval: 10,
            contacts: vec!["alice".to_string(), "bob".to_string()],
            ..CheckableSettings::default()
        };
        Checkable::new(CheckableId::service("web1", "http"), settings).unwrap()
    }

    fn check(checkable: &mut Checkable, code: i32, ts: i64) {
        checkable.process_result(&CheckResult::active(code, ts), PassiveHardPolicy::Honor);
    }

    fn problem() -> NotifyRequest {
        NotifyRequest::new(NotificationReason::Problem)
    }

    fn recovery() -> NotifyRequest {
        NotifyRequest::new(NotificationReason::Recovery)
    }

    #[test]
    fn test_problem_sent_to_base_contacts() {
        let (engine, dispatcher, directory) = setup();
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);

        let outcome = engine.notify(&mut svc, &problem(), 1000, &directory);
        assert_eq!(
            outcome,
            NotifyOutcome::Sent {
                notification_id: 1,
                recipients: vec!["alice".to_string(), "bob".to_string()],
                skipped: 0,
            }
        );
        assert_eq!(svc.next_notification_id, 2);
        assert_eq!(svc.notification_number, 1);
        assert_eq!(svc.last_notification, 1000);
        assert!(svc.problem_notified);

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent[0].command, "notify-email");
        assert_eq!(sent[0].command_line, "/usr/bin/mail -s alert");
        assert_eq!(sent[0].reason, NotificationReason::Problem);
        assert_eq!(sent[0].notification_number, 1);
    }

    #[test]
    fn test_contact_with_unknown_command_is_skipped() {
        let (engine, dispatcher, mut directory) = setup();
        directory.commands.clear();
        directory
            .commands
            .insert("page".to_string(), "/usr/local/bin/page".to_string());
        if let Some(bob) = directory.contacts.get_mut("bob") {
            bob.service.command = Some("page".to_string());
        }
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);

        let outcome = engine.notify(&mut svc, &problem(), 1000, &directory);
        assert_eq!(outcome.recipients(), ["bob".to_string()]);
        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command_line, "/usr/local/bin/page");
    }

    #[test]
    fn test_gated_call_keeps_id() {
        let (engine, dispatcher, directory) = setup();
        let mut svc = service();
        svc.settings.max_attempts = 3;
        check(&mut svc, CRITICAL, 1000);

        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::SoftState)
        );
        assert_eq!(svc.next_notification_id, 1);
        assert!(dispatcher.contacts().is_empty());
    }

    #[test]
    fn test_throttle_respects_interval() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        assert!(engine.notify(&mut svc, &problem(), 1000, &directory).is_sent());

        // 10 minutes at 60s per unit
        check(&mut svc, CRITICAL, 1300);
        assert_eq!(
            engine.notify(&mut svc, &problem(), 1300, &directory),
            NotifyOutcome::Gated(Gate::Throttled)
        );
        let forced = problem().with_flags(NotificationFlags::forced());
        assert!(engine.notify(&mut svc, &forced, 1300, &directory).is_sent());

        check(&mut svc, CRITICAL, 1900);
        assert!(engine.notify(&mut svc, &problem(), 1900, &directory).is_sent());
        assert_eq!(svc.notification_number, 3);
        assert_eq!(svc.next_notification_id, 4);
    }

    #[test]
    fn test_zero_interval_notifies_once_per_episode() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.notification_interval = 0;

        check(&mut svc, CRITICAL, 1000);
        assert!(engine.notify(&mut svc, &problem(), 1000, &directory).is_sent());
        check(&mut svc, CRITICAL, 90_000);
        assert_eq!(
            engine.notify(&mut svc, &problem(), 90_000, &directory),
            NotifyOutcome::Gated(Gate::Throttled)
        );

        check(&mut svc, OK, 90_060);
        assert!(engine.notify(&mut svc, &recovery(), 90_060, &directory).is_sent());
        check(&mut svc, CRITICAL, 90_120);
        assert!(engine.notify(&mut svc, &problem(), 90_120, &directory).is_sent());
    }

    #[test]
    fn test_recovery_requires_prior_problem() {
        let (engine, dispatcher, directory) = setup();
        let mut svc = service();
        svc.settings.notify_on = NotifyOptions::WARNING | NotifyOptions::RECOVERY;

        check(&mut svc, CRITICAL, 1000);
        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::StateNotEnabled)
        );
        check(&mut svc, OK, 1060);
        assert_eq!(
            engine.notify(&mut svc, &recovery(), 1060, &directory),
            NotifyOutcome::Gated(Gate::NoProblemNotified)
        );
        assert!(dispatcher.contacts().is_empty());
    }

    #[test]
    fn test_recovery_once_per_episode() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        engine.notify(&mut svc, &problem(), 1000, &directory);

        check(&mut svc, OK, 1060);
        assert!(engine.notify(&mut svc, &recovery(), 1060, &directory).is_sent());
        assert_eq!(svc.notification_number, 0);
        assert!(!svc.problem_notified);

        check(&mut svc, OK, 1120);
        assert_eq!(
            engine.notify(&mut svc, &recovery(), 1120, &directory),
            NotifyOutcome::Gated(Gate::NoProblemNotified)
        );
    }

    #[test]
    fn test_recovery_without_option_closes_episode() {
        let (engine, dispatcher, directory) = setup();
        let mut svc = service();
        svc.settings.notify_on = NotifyOptions::CRITICAL;

        check(&mut svc, CRITICAL, 1000);
        assert!(engine.notify(&mut svc, &problem(), 1000, &directory).is_sent());
        assert_eq!(svc.notification_number, 1);

        check(&mut svc, OK, 1060);
        assert_eq!(
            engine.notify(&mut svc, &recovery(), 1060, &directory),
            NotifyOutcome::Gated(Gate::StateNotEnabled)
        );
        assert_eq!(svc.notification_number, 0);
        assert!(!svc.problem_notified);
        assert_eq!(dispatcher.contacts().len(), 2);

        let next = svc.process_result(&CheckResult::active(OK, 1120), PassiveHardPolicy::Honor);
        assert_eq!(next.trigger, None);
    }

    #[test]
    fn test_recovery_without_notified_problem_resets_number() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        check(&mut svc, OK, 1060);
        svc.notification_number = 2;

        assert_eq!(
            engine.notify(&mut svc, &recovery(), 1060, &directory),
            NotifyOutcome::Gated(Gate::NoProblemNotified)
        );
        assert_eq!(svc.notification_number, 0);
        assert!(!svc.problem_notified);

        let next = svc.process_result(&CheckResult::active(OK, 1120), PassiveHardPolicy::Honor);
        assert_eq!(next.trigger, None);
    }

    #[test]
    fn test_recovery_delay_keeps_episode_open() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.recovery_notification_delay = 2;
        check(&mut svc, CRITICAL, 1000);
        engine.notify(&mut svc, &problem(), 1000, &directory);

        check(&mut svc, OK, 1060);
        engine.notify(&mut svc, &recovery(), 1060, &directory);
        assert!(svc.problem_notified);
        assert_eq!(svc.notification_number, 1);
    }

    #[test]
    fn test_recovery_delay() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.recovery_notification_delay = 2;
        check(&mut svc, CRITICAL, 1000);
        engine.notify(&mut svc, &problem(), 1000, &directory);

        check(&mut svc, OK, 1060);
        assert_eq!(
            engine.notify(&mut svc, &recovery(), 1060, &directory),
            NotifyOutcome::Gated(Gate::RecoveryDelay)
        );
        check(&mut svc, OK, 1180);
        assert!(engine.notify(&mut svc, &recovery(), 1180, &directory).is_sent());
    }

    #[test]
    fn test_first_notification_delay() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.first_notification_delay = 5;
        check(&mut svc, CRITICAL, 1000);

        assert_eq!(
            engine.notify(&mut svc, &problem(), 1200, &directory),
            NotifyOutcome::Gated(Gate::FirstNotificationDelay)
        );
        assert!(engine.notify(&mut svc, &problem(), 1300, &directory).is_sent());
    }

    #[test]
    fn test_downtime_blocks_problem_not_downtime_events() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.suppression.start_downtime();
        assert!(engine
            .notify(&mut svc, &NotifyRequest::new(NotificationReason::DowntimeStart), 900, &directory)
            .is_sent());

        check(&mut svc, CRITICAL, 1000);
        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::InDowntime)
        );

        svc.suppression.end_downtime();
        assert!(engine
            .notify(&mut svc, &NotifyRequest::new(NotificationReason::DowntimeEnd), 1100, &directory)
            .is_sent());
    }

    #[test]
    fn test_acknowledged_problem_is_quiet() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        svc.suppression.set_ack(AckType::Sticky);

        let ack = NotifyRequest::new(NotificationReason::Acknowledgement).with_author("ops", "looking");
        assert!(engine.notify(&mut svc, &ack, 1000, &directory).is_sent());
        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::Acknowledged)
        );
    }

    #[test]
    fn test_flapping_edges_are_idempotent() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        let start = NotifyRequest::new(NotificationReason::FlappingStart);
        let stop = NotifyRequest::new(NotificationReason::FlappingStop);

        assert_eq!(
            engine.notify(&mut svc, &stop, 1000, &directory),
            NotifyOutcome::Gated(Gate::NoFlapStartNotified)
        );
        assert!(engine.notify(&mut svc, &start, 1000, &directory).is_sent());
        assert_eq!(
            engine.notify(&mut svc, &start, 1060, &directory),
            NotifyOutcome::Gated(Gate::FlapEdgeAlreadyNotified)
        );
        assert!(engine.notify(&mut svc, &stop, 1120, &directory).is_sent());
        assert_eq!(
            engine.notify(&mut svc, &stop, 1180, &directory),
            NotifyOutcome::Gated(Gate::NoFlapStartNotified)
        );
    }

    #[test]
    fn test_contact_failures_do_not_abort_fanout() {
        let dispatcher = Arc::new(RecordingDispatcher {
            refuse: Some("bob".to_string()),
            ..RecordingDispatcher::default()
        });
        let engine = NotificationEngine::new(NotificationConfig::default(), dispatcher.clone());
        let mut directory = TestDirectory::new();
        directory.add_contact("carol", NotifyOptions::ALL);
        if let Some(carol) = directory.contacts.get_mut("carol") {
            carol.service.command = Some("notify-pager".to_string());
        }
        directory.add_contact("dave", NotifyOptions::ALL);

        let mut svc = service();
        svc.settings.contacts = ["alice", "bob", "carol", "dave", "ghost"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        check(&mut svc, CRITICAL, 1000);

        let outcome = engine.notify(&mut svc, &problem(), 1000, &directory);
        assert_eq!(
            outcome,
            NotifyOutcome::Sent {
                notification_id: 1,
                recipients: vec!["alice".to_string(), "dave".to_string()],
                skipped: 3,
            }
        );
        assert_eq!(svc.next_notification_id, 2);
        assert_eq!(dispatcher.contacts(), vec!["alice", "dave"]);
    }

    #[test]
    fn test_notification_period() {
        let (engine, _, mut directory) = setup();
        directory
            .windows
            .insert("never".to_string(), TimeWindow::new("never"));
        let mut svc = service();
        svc.settings.notification_period = Some("never".to_string());
        check(&mut svc, CRITICAL, 1000);

        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::OutsideNotificationPeriod)
        );
        let forced = problem().with_flags(NotificationFlags::forced());
        assert!(engine.notify(&mut svc, &forced, 1000, &directory).is_sent());

        // Unknown periods are treated as always valid
        svc.settings.notification_period = Some("missing".to_string());
        check(&mut svc, OK, 1060);
        assert!(engine.notify(&mut svc, &recovery(), 1060, &directory).is_sent());
    }

    #[test]
    fn test_contact_period_and_disabled_switch() {
        let (engine, dispatcher, mut directory) = setup();
        directory
            .windows
            .insert("never".to_string(), TimeWindow::new("never"));
        if let Some(alice) = directory.contacts.get_mut("alice") {
            alice.service.period = Some("never".to_string());
        }
        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        engine.notify(&mut svc, &problem(), 1000, &directory);
        assert_eq!(dispatcher.contacts(), vec!["bob"]);

        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.notifications_enabled = false;
        check(&mut svc, CRITICAL, 1000);
        assert_eq!(
            engine.notify(&mut svc, &problem(), 1000, &directory),
            NotifyOutcome::Gated(Gate::NotificationsDisabled)
        );
    }

    #[test]
    fn test_escalation_interval_override_and_tiers() {
        let (engine, dispatcher, mut directory) = setup();
        directory.add_contact("manager", NotifyOptions::ALL);
        directory.escalations.push(Escalation {
            applies_to: [CheckableId::service("web1", "http")].into_iter().collect(),
            first_notification: 2,
            last_notification: 0,
            notification_interval: Some(1),
            options: NotifyOptions::ALL,
            contacts: vec!["manager".to_string()],
            period: None,
        });

        let mut svc = service();
        check(&mut svc, CRITICAL, 1000);
        engine.notify(&mut svc, &problem(), 1000, &directory);
        assert_eq!(dispatcher.contacts(), vec!["alice", "bob"]);

        // Second notification escalates, and its 1-unit interval applies
        check(&mut svc, CRITICAL, 1060);
        let outcome = engine.notify(&mut svc, &problem(), 1060, &directory);
        assert_eq!(outcome.recipients(), ["manager".to_string()]);
        assert!(dispatcher.sent.lock().unwrap()[2].escalated);
    }

    #[test]
    fn test_contact_local_time() {
        let (engine, dispatcher, mut directory) = setup();
        if let Some(alice) = directory.contacts.get_mut("alice") {
            alice.utc_offset_seconds = Some(3600);
        }
        let mut svc = service();
        check(&mut svc, CRITICAL, 1_704_067_200);
        engine.notify(&mut svc, &problem(), 1_704_067_200, &directory);

        let sent = dispatcher.sent.lock().unwrap();
        let alice = sent.iter().find(|r| r.contact == "alice").unwrap();
        assert_eq!(alice.local_time.unwrap().to_rfc3339(), "2024-01-01T01:00:00+01:00");
        let bob = sent.iter().find(|r| r.contact == "bob").unwrap();
        assert!(bob.local_time.is_none());
    }

    #[test]
    fn test_volatile_bypasses_throttle() {
        let (engine, _, directory) = setup();
        let mut svc = service();
        svc.settings.is_volatile = true;
        check(&mut svc, CRITICAL, 1000);
        assert!(engine.notify(&mut svc, &problem(), 1000, &directory).is_sent());
        check(&mut svc, CRITICAL, 1060);
        assert!(engine.notify(&mut svc, &problem(), 1060, &directory).is_sent());
    }
}
