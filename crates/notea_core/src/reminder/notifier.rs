//! Notification collaborator contract and trigger types.
//!
//! # Responsibility
//! - Describe what the scheduler asks of the OS notification subsystem.
//! - Define the non-fatal `SchedulingError` taxonomy.
//!
//! # Invariants
//! - Implementations must be callable from any thread.
//! - Every registered request carries a fresh `TriggerId`.

use crate::clock::{DAY_MS, HOUR_MS};
use crate::model::task::{Task, TaskId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier of one registered notification request.
pub type TriggerId = Uuid;

const REMINDER_TITLE: &str = "Task Reminder";

/// Reminder lead time relative to a task's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKind {
    /// Fires 24 hours before `due_at`.
    DayBefore,
    /// Fires 1 hour before `due_at`.
    HourBefore,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 2] = [TriggerKind::DayBefore, TriggerKind::HourBefore];

    pub fn lead_time_ms(self) -> i64 {
        match self {
            Self::DayBefore => DAY_MS,
            Self::HourBefore => HOUR_MS,
        }
    }

    /// Trigger time for a task due at `due_at`.
    pub fn fire_at(self, due_at: i64) -> i64 {
        due_at.saturating_sub(self.lead_time_ms())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayBefore => "day_before",
            Self::HourBefore => "hour_before",
        }
    }

    fn lead_time_label(self) -> &'static str {
        match self {
            Self::DayBefore => "24 hours",
            Self::HourBefore => "1 hour",
        }
    }
}

/// User-visible notification content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
}

impl ReminderPayload {
    pub fn for_task(task: &Task, kind: TriggerKind) -> Self {
        Self {
            title: REMINDER_TITLE.to_string(),
            body: format!("\"{}\" is due in {}.", task.title, kind.lead_time_label()),
        }
    }
}

/// One notification registration handed to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub trigger_id: TriggerId,
    pub task_id: TaskId,
    pub kind: TriggerKind,
    /// Unix epoch milliseconds.
    pub fire_at: i64,
    pub payload: ReminderPayload,
}

/// Failure reported by a notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierError {
    pub message: String,
}

impl NotifierError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for NotifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for NotifierError {}

/// OS notification subsystem as seen by the scheduler.
pub trait NotificationCenter: Send + Sync {
    /// Asks the user for notification permission. `Ok(false)` means denied.
    fn request_permission(&self) -> Result<bool, NotifierError>;
    /// Registers one trigger.
    fn register(&self, request: &TriggerRequest) -> Result<(), NotifierError>;
    /// Removes one pending trigger. Unknown ids are not an error.
    fn cancel(&self, trigger_id: TriggerId) -> Result<(), NotifierError>;
    /// Removes every pending trigger owned by this application.
    fn cancel_all(&self) -> Result<(), NotifierError>;
}

/// Non-fatal reminder failure. Logged and surfaced, never raised out of a
/// task mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    Register {
        task_id: TaskId,
        kind: TriggerKind,
        source: NotifierError,
    },
    Cancel {
        task_id: TaskId,
        trigger_id: TriggerId,
        source: NotifierError,
    },
    CancelAll(NotifierError),
    Permission(NotifierError),
}

impl Display for SchedulingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register {
                task_id,
                kind,
                source,
            } => write!(
                f,
                "failed to register {} reminder for task {task_id}: {source}",
                kind.as_str()
            ),
            Self::Cancel {
                task_id,
                trigger_id,
                source,
            } => write!(
                f,
                "failed to cancel reminder {trigger_id} for task {task_id}: {source}"
            ),
            Self::CancelAll(source) => write!(f, "failed to cancel all reminders: {source}"),
            Self::Permission(source) => {
                write!(f, "notification permission request failed: {source}")
            }
        }
    }
}

impl Error for SchedulingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Register { source, .. } | Self::Cancel { source, .. } => Some(source),
            Self::CancelAll(source) | Self::Permission(source) => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReminderPayload, TriggerKind};
    use crate::clock::HOUR_MS;
    use crate::model::task::{Task, TaskDraft};

    #[test]
    fn trigger_times_are_relative_to_due_date() {
        let due = 100 * HOUR_MS;
        assert_eq!(TriggerKind::DayBefore.fire_at(due), 76 * HOUR_MS);
        assert_eq!(TriggerKind::HourBefore.fire_at(due), 99 * HOUR_MS);
    }

    #[test]
    fn payload_names_task_and_lead_time() {
        let task = Task::new(TaskDraft::new("Buy milk").into_fields(0)).unwrap();
        let payload = ReminderPayload::for_task(&task, TriggerKind::HourBefore);
        assert_eq!(payload.title, "Task Reminder");
        assert_eq!(payload.body, "\"Buy milk\" is due in 1 hour.");
    }
}
