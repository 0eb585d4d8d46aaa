//! Two-stage reminder scheduler.
//!
//! # Responsibility
//! - Compute day-before and hour-before triggers from a task's due date.
//! - Register and cancel those triggers with the notification collaborator.
//! - Keep per-task bookkeeping so stale triggers can always be removed.
//!
//! # Invariants
//! - Only triggers strictly in the future are registered.
//! - Scheduling a task first cancels its previously recorded triggers.
//! - Bookkeeping for a task is dropped on cancel even when the collaborator
//!   reports a failure; `cancel_all` is the recovery path.
//! - Failures are reported as `SchedulingError` values, never panics.

use crate::clock::Clock;
use crate::model::settings::Settings;
use crate::model::task::{Task, TaskId};
use crate::reminder::notifier::{
    NotificationCenter, ReminderPayload, SchedulingError, TriggerId, TriggerKind, TriggerRequest,
};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Reminder lifecycle of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// No pending triggers.
    Unscheduled,
    /// Every registered trigger is still pending.
    Scheduled,
    /// At least one trigger fired and at least one is still pending.
    PartiallyFired,
    /// Triggers were cancelled and nothing was registered since.
    Cancelled,
}

/// One trigger the collaborator accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTrigger {
    pub trigger_id: TriggerId,
    pub kind: TriggerKind,
    pub fire_at: i64,
}

/// Result of scheduling one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub task_id: TaskId,
    pub registered: Vec<RegisteredTrigger>,
    /// Triggers not registered because their time already passed.
    pub skipped: Vec<TriggerKind>,
    pub failures: Vec<SchedulingError>,
    /// `true` when reminders are turned off and nothing was attempted.
    pub disabled: bool,
}

impl ScheduleReport {
    fn empty(task_id: TaskId) -> Self {
        Self {
            task_id,
            registered: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            disabled: false,
        }
    }

    fn disabled(task_id: TaskId) -> Self {
        Self {
            disabled: true,
            ..Self::empty(task_id)
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    settings: Settings,
    triggers: HashMap<TaskId, Vec<RegisteredTrigger>>,
    cancelled: HashSet<TaskId>,
}

/// Registers reminder triggers for tasks with the notification collaborator.
pub struct ReminderScheduler {
    center: Arc<dyn NotificationCenter>,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
}

impl ReminderScheduler {
    pub fn new(
        center: Arc<dyn NotificationCenter>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self {
        Self {
            center,
            clock,
            state: Mutex::new(SchedulerState {
                settings,
                ..SchedulerState::default()
            }),
        }
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings
    }

    /// Replaces the settings this scheduler gates on.
    pub fn apply_settings(&self, settings: Settings) {
        self.lock().settings = settings;
    }

    /// Asks the collaborator for notification permission.
    pub fn request_permission(&self) -> Result<bool, SchedulingError> {
        self.center
            .request_permission()
            .map_err(SchedulingError::Permission)
    }

    /// Registers future triggers for `task`, replacing any recorded ones.
    ///
    /// Does nothing (and reports `disabled`) while reminders are off.
    pub fn schedule_for_task(&self, task: &Task) -> ScheduleReport {
        let mut state = self.lock();
        if !state.settings.notifications_enabled {
            return ScheduleReport::disabled(task.id);
        }

        let mut report = ScheduleReport::empty(task.id);
        report
            .failures
            .extend(self.cancel_recorded(&mut state, task.id));

        let now = self.clock.now_epoch_ms();
        for kind in TriggerKind::ALL {
            let fire_at = kind.fire_at(task.due_at);
            if fire_at <= now {
                report.skipped.push(kind);
                continue;
            }

            let request = TriggerRequest {
                trigger_id: Uuid::new_v4(),
                task_id: task.id,
                kind,
                fire_at,
                payload: ReminderPayload::for_task(task, kind),
            };
            match self.center.register(&request) {
                Ok(()) => report.registered.push(RegisteredTrigger {
                    trigger_id: request.trigger_id,
                    kind,
                    fire_at,
                }),
                Err(source) => {
                    let err = SchedulingError::Register {
                        task_id: task.id,
                        kind,
                        source,
                    };
                    warn!(
                        "event=reminder_register module=reminder status=error task_id={} kind={} error={err}",
                        task.id,
                        kind.as_str()
                    );
                    report.failures.push(err);
                }
            }
        }

        state.cancelled.remove(&task.id);
        if !report.registered.is_empty() {
            state.triggers.insert(task.id, report.registered.clone());
        }

        info!(
            "event=reminder_schedule module=reminder status={} task_id={} registered={} skipped={} failed={}",
            if report.is_clean() { "ok" } else { "partial" },
            task.id,
            report.registered.len(),
            report.skipped.len(),
            report.failures.len()
        );
        report
    }

    /// Cancels every recorded trigger for `task_id`. Idempotent.
    pub fn cancel_for_task(&self, task_id: TaskId) -> Vec<SchedulingError> {
        let mut state = self.lock();
        self.cancel_recorded(&mut state, task_id)
    }

    /// Schedules every task whose due date is still ahead.
    ///
    /// Performs no global cancel; per-task scheduling replaces stale triggers.
    pub fn reschedule_all(&self, tasks: &[Task]) -> Vec<ScheduleReport> {
        let now = self.clock.now_epoch_ms();
        let reports: Vec<ScheduleReport> = tasks
            .iter()
            .filter(|task| task.due_at > now)
            .map(|task| self.schedule_for_task(task))
            .collect();

        info!(
            "event=reminder_reschedule_all module=reminder status=ok tasks={} failed_tasks={}",
            reports.len(),
            reports.iter().filter(|report| !report.is_clean()).count()
        );
        reports
    }

    /// Clears every pending trigger with the collaborator and drops all
    /// bookkeeping, regardless of per-task state.
    pub fn cancel_all(&self) -> Result<(), SchedulingError> {
        let mut state = self.lock();
        let tracked: Vec<TaskId> = state.triggers.drain().map(|(task_id, _)| task_id).collect();
        state.cancelled.extend(tracked);

        match self.center.cancel_all() {
            Ok(()) => {
                info!("event=reminder_cancel_all module=reminder status=ok");
                Ok(())
            }
            Err(source) => {
                let err = SchedulingError::CancelAll(source);
                warn!("event=reminder_cancel_all module=reminder status=error error={err}");
                Err(err)
            }
        }
    }

    /// Current reminder state of `task_id`, judged against the clock.
    pub fn state_of(&self, task_id: TaskId) -> ReminderState {
        let state = self.lock();
        if state.cancelled.contains(&task_id) {
            return ReminderState::Cancelled;
        }

        let Some(triggers) = state.triggers.get(&task_id) else {
            return ReminderState::Unscheduled;
        };
        let now = self.clock.now_epoch_ms();
        let pending = triggers
            .iter()
            .filter(|trigger| trigger.fire_at > now)
            .count();
        if pending == 0 {
            ReminderState::Unscheduled
        } else if pending == triggers.len() {
            ReminderState::Scheduled
        } else {
            ReminderState::PartiallyFired
        }
    }

    /// Recorded triggers for `task_id` that have not fired yet.
    pub fn pending_triggers(&self, task_id: TaskId) -> Vec<RegisteredTrigger> {
        let now = self.clock.now_epoch_ms();
        self.lock()
            .triggers
            .get(&task_id)
            .map(|triggers| {
                triggers
                    .iter()
                    .filter(|trigger| trigger.fire_at > now)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cancel_recorded(
        &self,
        state: &mut SchedulerState,
        task_id: TaskId,
    ) -> Vec<SchedulingError> {
        let Some(triggers) = state.triggers.remove(&task_id) else {
            return Vec::new();
        };
        state.cancelled.insert(task_id);

        let mut failures = Vec::new();
        for trigger in triggers {
            if let Err(source) = self.center.cancel(trigger.trigger_id) {
                let err = SchedulingError::Cancel {
                    task_id,
                    trigger_id: trigger.trigger_id,
                    source,
                };
                warn!(
                    "event=reminder_cancel module=reminder status=error task_id={task_id} error={err}"
                );
                failures.push(err);
            }
        }
        failures
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
