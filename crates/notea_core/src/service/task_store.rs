//! Task store: the single source of truth for task state.
//!
//! # Responsibility
//! - Own the in-memory task collection and mediate every mutation through
//!   the persistence gateway.
//! - Republish an immutable snapshot to observers after each mutation.
//! - Drive the reminder scheduler from create/update/delete and from the
//!   notifications toggle.
//!
//! # Invariants
//! - Memory changes only after the gateway write succeeded; a failed write
//!   leaves the collection exactly as it was.
//! - Snapshots are ordered by ascending `due_at`, ties by insertion order.
//! - Reminder failures are collected as warnings and never fail or roll back
//!   the task mutation that caused them.
//! - Mutations take `&mut self`, so they are serialized.

use crate::clock::Clock;
use crate::model::settings::Settings;
use crate::model::task::{Task, TaskDraft, TaskFields, TaskId, TaskValidationError};
use crate::reminder::notifier::SchedulingError;
use crate::reminder::scheduler::{ReminderScheduler, ScheduleReport};
use crate::repo::task_repo::{RepoError, TaskGateway};
use crate::search::filter::sort_by_due_date;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

/// Synchronous task-store error. Callers handle these before the UI
/// reflects success.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected before any state change.
    Validation(TaskValidationError),
    /// Target task does not exist.
    NotFound(TaskId),
    /// Persistence gateway failed; in-memory state was left untouched.
    Persistence(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(task_id) => write!(f, "task not found: {task_id}"),
            Self::Persistence(err) => write!(f, "persistence failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

/// Immutable, ordered copy of the task collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    tasks: Arc<[Task]>,
}

impl TaskSnapshot {
    fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.iter().any(|task| task.id == task_id)
    }

    pub fn ids(&self) -> BTreeSet<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }
}

impl Deref for TaskSnapshot {
    type Target = [Task];

    fn deref(&self) -> &Self::Target {
        &self.tasks
    }
}

type Observer = Arc<dyn Fn(&TaskSnapshot) + Send + Sync>;

#[derive(Default)]
struct ObserverRegistry {
    next_id: u64,
    observers: BTreeMap<u64, Observer>,
}

/// Handle returned by [`TaskStore::subscribe`].
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<ObserverRegistry>>,
}

impl Subscription {
    /// Removes the observer. No-op when the store is already gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock_registry(&registry).observers.remove(&self.id);
        }
    }
}

/// Result of a bulk delete. Ids that did not exist appear in neither set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteOutcome {
    pub deleted: BTreeSet<TaskId>,
    pub failed: BTreeSet<TaskId>,
}

impl BulkDeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of switching reminders on or off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationToggle {
    /// Permission granted; every task with a future due date was scheduled.
    Enabled { reports: Vec<ScheduleReport> },
    /// Reminders are off and every outstanding trigger was cleared.
    Disabled,
    /// Permission was refused; the flag was forced back off.
    PermissionDenied,
}

/// Owner of the authoritative task collection.
pub struct TaskStore<G: TaskGateway> {
    gateway: G,
    scheduler: Arc<ReminderScheduler>,
    clock: Arc<dyn Clock>,
    settings: Settings,
    /// Insertion order; snapshots sort a copy.
    tasks: Vec<Task>,
    observers: Arc<Mutex<ObserverRegistry>>,
    warnings: Vec<SchedulingError>,
}

impl<G: TaskGateway> TaskStore<G> {
    /// Loads the collection from `gateway` and wires the scheduler to
    /// `settings`.
    ///
    /// With reminders on, triggers left pending by an earlier session are
    /// cleared and every future task is registered again, so the
    /// collaborator matches the loaded collection. Failures are kept as
    /// reminder warnings.
    pub fn load(
        gateway: G,
        scheduler: Arc<ReminderScheduler>,
        settings: Settings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let tasks = gateway.fetch_all().map_err(|err| {
            error!("event=store_load module=store status=error error={err}");
            StoreError::Persistence(err)
        })?;
        scheduler.apply_settings(settings);
        info!(
            "event=store_load module=store status=ok tasks={} notifications_enabled={}",
            tasks.len(),
            settings.notifications_enabled
        );

        let mut store = Self {
            gateway,
            scheduler,
            clock,
            settings,
            tasks,
            observers: Arc::new(Mutex::new(ObserverRegistry::default())),
            warnings: Vec::new(),
        };
        store.reconcile_reminders();
        Ok(store)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn scheduler(&self) -> &Arc<ReminderScheduler> {
        &self.scheduler
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks ordered by due date (stable for equal due dates).
    pub fn list(&self) -> Vec<Task> {
        sort_by_due_date(&self.tasks)
    }

    /// Same ordering as [`TaskStore::list`], as a shareable snapshot.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot::new(self.list())
    }

    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.position(task_id).map(|index| self.tasks[index].clone())
    }

    /// Registers `observer`; it runs synchronously after every successful
    /// mutation with the new snapshot.
    pub fn subscribe(
        &self,
        observer: impl Fn(&TaskSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = lock_registry(&self.observers);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.insert(id, Arc::new(observer));

        Subscription {
            id,
            registry: Arc::downgrade(&self.observers),
        }
    }

    /// Creates, persists and publishes a new task.
    ///
    /// # Errors
    /// - `Validation` when the title is empty.
    /// - `Persistence` when the gateway write fails; nothing is inserted.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        let fields = draft.into_fields(self.clock.now_epoch_ms());
        fields.validate()?;

        let mut task = Task::new(fields)?;
        while self.position(task.id).is_some() {
            task.id = Uuid::new_v4();
        }

        if let Err(err) = self.gateway.save(&task) {
            error!(
                "event=task_create module=store status=error task_id={} error={err}",
                task.id
            );
            return Err(err.into());
        }
        self.tasks.push(task.clone());
        info!(
            "event=task_create module=store status=ok task_id={} due_at={} priority={} category={}",
            task.id, task.due_at, task.priority, task.category
        );

        self.publish();
        self.sync_reminders(&task);
        Ok(task)
    }

    /// Replaces every editable field of `task_id` at once.
    ///
    /// Identical fields are a no-op: no write, no republish.
    ///
    /// # Errors
    /// - `NotFound` when `task_id` is absent.
    /// - `Validation` when the new title is empty.
    /// - `Persistence` when the gateway write fails; the old value is kept.
    pub fn update(&mut self, task_id: TaskId, fields: TaskFields) -> Result<Task, StoreError> {
        let index = self
            .position(task_id)
            .ok_or(StoreError::NotFound(task_id))?;
        fields.validate()?;

        let current = &self.tasks[index];
        if current.fields() == fields {
            debug!("event=task_update module=store status=noop task_id={task_id}");
            return Ok(current.clone());
        }

        let updated = current.replaced(fields)?;
        if let Err(err) = self.gateway.save(&updated) {
            error!("event=task_update module=store status=error task_id={task_id} error={err}");
            return Err(err.into());
        }
        self.tasks[index] = updated.clone();
        info!(
            "event=task_update module=store status=ok task_id={task_id} due_at={}",
            updated.due_at
        );

        self.publish();
        self.sync_reminders(&updated);
        Ok(updated)
    }

    /// Deletes one task and cancels its reminders. Absent ids are a no-op.
    ///
    /// # Errors
    /// - `Persistence` when the gateway delete fails; the task is kept.
    pub fn delete(&mut self, task_id: TaskId) -> Result<(), StoreError> {
        let Some(index) = self.position(task_id) else {
            debug!("event=task_delete module=store status=noop task_id={task_id}");
            return Ok(());
        };

        if let Err(err) = self.gateway.delete(&self.tasks[index]) {
            error!("event=task_delete module=store status=error task_id={task_id} error={err}");
            return Err(err.into());
        }
        self.tasks.remove(index);
        info!("event=task_delete module=store status=ok task_id={task_id}");

        self.publish();
        self.cancel_reminders(task_id);
        Ok(())
    }

    /// Deletes each id independently; one failure does not stop the rest.
    pub fn delete_many(&mut self, task_ids: impl IntoIterator<Item = TaskId>) -> BulkDeleteOutcome {
        let requested: BTreeSet<TaskId> = task_ids.into_iter().collect();
        let mut outcome = BulkDeleteOutcome::default();

        for task_id in requested {
            let Some(index) = self.position(task_id) else {
                continue;
            };
            match self.gateway.delete(&self.tasks[index]) {
                Ok(()) => {
                    self.tasks.remove(index);
                    outcome.deleted.insert(task_id);
                }
                Err(err) => {
                    warn!(
                        "event=task_delete module=store status=error task_id={task_id} error={err}"
                    );
                    outcome.failed.insert(task_id);
                }
            }
        }

        info!(
            "event=task_delete_many module=store status={} deleted={} failed={}",
            if outcome.is_complete() { "ok" } else { "partial" },
            outcome.deleted.len(),
            outcome.failed.len()
        );

        if !outcome.deleted.is_empty() {
            self.publish();
            for task_id in &outcome.deleted {
                self.cancel_reminders(*task_id);
            }
        }
        outcome
    }

    /// Deletes every task, with the same partial-failure semantics as
    /// [`TaskStore::delete_many`].
    pub fn delete_all(&mut self) -> BulkDeleteOutcome {
        let all: Vec<TaskId> = self.tasks.iter().map(|task| task.id).collect();
        self.delete_many(all)
    }

    /// Switches reminders on (after a permission request) or off.
    pub fn set_notifications_enabled(&mut self, enabled: bool) -> NotificationToggle {
        if !enabled {
            self.turn_reminders_off();
            info!("event=notifications_toggle module=store status=ok enabled=false");
            return NotificationToggle::Disabled;
        }

        match self.scheduler.request_permission() {
            Ok(true) => {
                self.settings.set_notifications_enabled(true);
                self.scheduler.apply_settings(self.settings);
                let reports = self.scheduler.reschedule_all(&self.tasks);
                for report in &reports {
                    self.warnings.extend(report.failures.iter().cloned());
                }
                info!(
                    "event=notifications_toggle module=store status=ok enabled=true scheduled_tasks={}",
                    reports.len()
                );
                NotificationToggle::Enabled { reports }
            }
            Ok(false) => {
                warn!("event=notifications_toggle module=store status=denied enabled=false");
                self.turn_reminders_off();
                NotificationToggle::PermissionDenied
            }
            Err(err) => {
                warn!(
                    "event=notifications_toggle module=store status=error enabled=false error={err}"
                );
                self.warnings.push(err);
                self.turn_reminders_off();
                NotificationToggle::PermissionDenied
            }
        }
    }

    /// Stores the appearance preference. Has no effect on core behavior.
    pub fn set_dark_mode_enabled(&mut self, enabled: bool) {
        self.settings.set_dark_mode_enabled(enabled);
    }

    /// Drains reminder warnings collected since the last call.
    pub fn take_reminder_warnings(&mut self) -> Vec<SchedulingError> {
        std::mem::take(&mut self.warnings)
    }

    fn position(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == task_id)
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        // Observers run outside the registry lock so they may subscribe or
        // unsubscribe from inside the callback.
        let observers: Vec<Observer> = lock_registry(&self.observers)
            .observers
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn sync_reminders(&mut self, task: &Task) {
        if self.settings.notifications_enabled {
            let report = self.scheduler.schedule_for_task(task);
            self.warnings.extend(report.failures);
        } else {
            self.cancel_reminders(task.id);
        }
    }

    fn cancel_reminders(&mut self, task_id: TaskId) {
        let failures = self.scheduler.cancel_for_task(task_id);
        self.warnings.extend(failures);
    }

    fn reconcile_reminders(&mut self) {
        if !self.settings.notifications_enabled {
            return;
        }

        if let Err(err) = self.scheduler.cancel_all() {
            self.warnings.push(err);
        }
        let reports = self.scheduler.reschedule_all(&self.tasks);
        for report in &reports {
            self.warnings.extend(report.failures.iter().cloned());
        }
        info!(
            "event=reminder_reconcile module=store status={} scheduled_tasks={} warnings={}",
            if self.warnings.is_empty() { "ok" } else { "partial" },
            reports.len(),
            self.warnings.len()
        );
    }

    fn turn_reminders_off(&mut self) {
        self.settings.set_notifications_enabled(false);
        self.scheduler.apply_settings(self.settings);
        if let Err(err) = self.scheduler.cancel_all() {
            self.warnings.push(err);
        }
    }
}

fn lock_registry(registry: &Mutex<ObserverRegistry>) -> MutexGuard<'_, ObserverRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
