//! Engine Facade
//!
//! Owns the checkables and the current registry. Each check result runs
//! transition, flap detection and the notification decisions under the
//! checkable's lock, so two results for one object never interleave.

use crate::{EngineConfig, EngineError, Registry};
use checkable::{
    AckType, CheckResult, Checkable, CheckableId, DependencyOracle, NoDependencies,
    PassiveHardPolicy, RetainedState, StateType, TransitionOutcome, Trigger,
};
use flapping::{FlapEdge, FlappingDetector};
use notification::{Dispatcher, Gate, NotificationEngine, NotificationReason, NotifyOutcome, NotifyRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Everything that happened for one check result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckReport {
    pub transition: TransitionOutcome,
    pub flap_edge: Option<FlapEdge>,
    /// Notification decisions in the order they were taken
    pub notifications: Vec<(NotificationReason, NotifyOutcome)>,
}

impl CheckReport {
    /// Decision taken for `reason`, if one was attempted
    pub fn outcome(&self, reason: NotificationReason) -> Option<&NotifyOutcome> {
        self.notifications
            .iter()
            .find(|(r, _)| *r == reason)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Engine {
    checkables: RwLock<HashMap<CheckableId, Arc<Mutex<Checkable>>>>,
    registry: RwLock<Arc<Registry>>,
    notifier: NotificationEngine,
    detector: FlappingDetector,
    dependencies: Arc<dyn DependencyOracle>,
    policy: PassiveHardPolicy,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> EngineError {
    EngineError::LockPoisoned(e.to_string())
}

impl Engine {
    pub fn new(config: &EngineConfig, registry: Registry, dispatcher: Arc<dyn Dispatcher>) -> Self {
        info!(
            "Creating engine: {} contact(s), {} escalation(s), {} time window(s)",
            registry.contact_count(),
            registry.escalation_count(),
            registry.window_count()
        );
        Self {
            checkables: RwLock::new(HashMap::new()),
            registry: RwLock::new(Arc::new(registry)),
            notifier: NotificationEngine::new(config.notifications.clone(), dispatcher),
            detector: FlappingDetector::new(config.flapping.clone()),
            dependencies: Arc::new(NoDependencies),
            policy: config.passive_hard_policy,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Arc<dyn DependencyOracle>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn add_checkable(&self, checkable: Checkable) -> Result<(), EngineError> {
        let mut checkables = self.checkables.write().map_err(poisoned)?;
        if checkables.contains_key(&checkable.id) {
            return Err(EngineError::DuplicateCheckable(checkable.id));
        }
        debug!("Registered {}", checkable.id);
        checkables.insert(checkable.id.clone(), Arc::new(Mutex::new(checkable)));
        Ok(())
    }

    pub fn checkable_count(&self) -> Result<usize, EngineError> {
        Ok(self.checkables.read().map_err(poisoned)?.len())
    }

    /// Current registry; callers keep a consistent view across a reload
    pub fn registry(&self) -> Result<Arc<Registry>, EngineError> {
        Ok(Arc::clone(&*self.registry.read().map_err(poisoned)?))
    }

    /// Swap in a new registry; decisions already running keep the old one
    pub fn reload(&self, registry: Registry) -> Result<(), EngineError> {
        let mut current = self.registry.write().map_err(poisoned)?;
        *current = Arc::new(registry);
        info!("Registry reloaded");
        Ok(())
    }

    fn cell(&self, id: &CheckableId) -> Result<Arc<Mutex<Checkable>>, EngineError> {
        self.checkables
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCheckable(id.clone()))
    }

    fn with_checkable<T>(
        &self,
        id: &CheckableId,
        f: impl FnOnce(&mut Checkable, &Registry) -> T,
    ) -> Result<T, EngineError> {
        let cell = self.cell(id)?;
        let registry = self.registry()?;
        let mut checkable = cell.lock().map_err(poisoned)?;
        Ok(f(&mut *checkable, &registry))
    }

    /// Apply a check result and take the resulting notification decisions
    pub fn on_check_result(&self, id: &CheckableId, result: &CheckResult) -> Result<CheckReport, EngineError> {
        let blocked = self.dependencies.is_blocked(id);
        self.with_checkable(id, |checkable, registry| {
            let transition = checkable.process_result(result, self.policy);
            if !transition.accepted {
                return CheckReport {
                    transition,
                    ..CheckReport::default()
                };
            }

            let now = result.timestamp;
            let flap_edge = checkable.record_check(&self.detector, transition.state_changed, blocked);
            let mut notifications = Vec::new();

            if let Some(edge) = flap_edge {
                let reason = NotificationReason::from(edge);
                match edge {
                    FlapEdge::Start => warn!(
                        "{} started flapping ({:.1}% state change)",
                        checkable.id,
                        checkable.flap.percent_state_change()
                    ),
                    FlapEdge::Stop => info!(
                        "{} stopped flapping ({:.1}% state change)",
                        checkable.id,
                        checkable.flap.percent_state_change()
                    ),
                }
                let outcome = self.notifier.notify(checkable, &NotifyRequest::new(reason), now, registry);
                notifications.push((reason, outcome));
            }

            if let Some(trigger) = transition.trigger {
                let reason = match trigger {
                    Trigger::Problem => NotificationReason::Problem,
                    Trigger::Recovery => NotificationReason::Recovery,
                };
                let outcome = self.notifier.notify(checkable, &NotifyRequest::new(reason), now, registry);
                notifications.push((reason, outcome));
            }

            CheckReport {
                transition,
                flap_edge,
                notifications,
            }
        })
    }

    /// Explicit notification (custom, forced or broadcast requests)
    pub fn notify(&self, id: &CheckableId, request: &NotifyRequest, now: i64) -> Result<NotifyOutcome, EngineError> {
        self.with_checkable(id, |checkable, registry| {
            self.notifier.notify(checkable, request, now, registry)
        })
    }

    /// Enter a downtime; DOWNTIMESTART is considered only when the first one starts
    pub fn start_downtime(&self, id: &CheckableId, now: i64) -> Result<Option<NotifyOutcome>, EngineError> {
        self.with_checkable(id, |checkable, registry| {
            let depth = checkable.suppression.start_downtime();
            info!("{} entered downtime (depth {})", checkable.id, depth);
            (depth == 1).then(|| {
                let request = NotifyRequest::new(NotificationReason::DowntimeStart);
                self.notifier.notify(checkable, &request, now, registry)
            })
        })
    }

    /// Leave a downtime; DOWNTIMEEND is considered when the last one ends
    pub fn end_downtime(&self, id: &CheckableId, now: i64) -> Result<Option<NotifyOutcome>, EngineError> {
        self.with_checkable(id, |checkable, registry| {
            if checkable.scheduled_downtime_depth() == 0 {
                debug!("{} is not in downtime", checkable.id);
                return None;
            }
            let depth = checkable.suppression.end_downtime();
            info!("{} left downtime (depth {})", checkable.id, depth);
            (depth == 0).then(|| {
                let request = NotifyRequest::new(NotificationReason::DowntimeEnd);
                self.notifier.notify(checkable, &request, now, registry)
            })
        })
    }

    /// Acknowledge the current problem and notify about it.
    ///
    /// `AckType::None` is rejected; use [`Engine::remove_acknowledgement`].
    pub fn acknowledge(
        &self,
        id: &CheckableId,
        ack: AckType,
        author: &str,
        comment: &str,
        now: i64,
    ) -> Result<NotifyOutcome, EngineError> {
        if ack == AckType::None {
            return Err(EngineError::InvalidAcknowledgement(id.clone()));
        }
        self.with_checkable(id, |checkable, registry| {
            if !checkable.is_problem() {
                debug!("Acknowledgement of {} ignored: no problem", checkable.id);
                return NotifyOutcome::Gated(Gate::NotAProblem);
            }
            checkable.suppression.set_ack(ack);
            info!("{} acknowledged by {} ({:?})", checkable.id, author, ack);
            let request = NotifyRequest::new(NotificationReason::Acknowledgement).with_author(author, comment);
            self.notifier.notify(checkable, &request, now, registry)
        })
    }

    pub fn remove_acknowledgement(&self, id: &CheckableId) -> Result<(), EngineError> {
        self.with_checkable(id, |checkable, _| {
            checkable.suppression.set_ack(AckType::None);
        })
    }

    pub fn get_next_notification_id(&self, id: &CheckableId) -> Result<u64, EngineError> {
        self.with_checkable(id, |checkable, _| checkable.next_notification_id())
    }

    pub fn is_flapping(&self, id: &CheckableId) -> Result<bool, EngineError> {
        self.with_checkable(id, |checkable, _| checkable.is_flapping())
    }

    pub fn get_state_type(&self, id: &CheckableId) -> Result<StateType, EngineError> {
        self.with_checkable(id, |checkable, _| checkable.state_type())
    }

    /// Copy of the checkable's current state
    pub fn snapshot(&self, id: &CheckableId) -> Result<Checkable, EngineError> {
        self.with_checkable(id, |checkable, _| checkable.clone())
    }

    pub fn retained_state(&self, id: &CheckableId) -> Result<RetainedState, EngineError> {
        self.with_checkable(id, |checkable, _| checkable.retained_state())
    }

    pub fn restore_state(&self, id: &CheckableId, retained: &RetainedState) -> Result<(), EngineError> {
        self.with_checkable(id, |checkable, _| checkable.restore_state(retained))
    }
}
