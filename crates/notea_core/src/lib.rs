//! Core domain logic for Note-A.
//! This crate is the single source of truth for task state and reminders.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod search;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::settings::Settings;
pub use model::task::{
    Category, CategoryFilter, ParseEnumError, Priority, Task, TaskDraft, TaskFields, TaskId,
    TaskValidationError,
};
pub use reminder::memory::InMemoryNotificationCenter;
pub use reminder::notifier::{
    NotificationCenter, NotifierError, ReminderPayload, SchedulingError, TriggerId, TriggerKind,
    TriggerRequest,
};
pub use reminder::scheduler::{
    RegisteredTrigger, ReminderScheduler, ReminderState, ScheduleReport,
};
pub use repo::settings_repo::SqliteSettingsRepository;
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskGateway};
pub use search::filter::{apply, filter_by_category, search, sort_by_due_date, TaskQuery};
pub use service::selection::{bind_selection, lock_selection, SelectionManager, SharedSelection};
pub use service::task_store::{
    BulkDeleteOutcome, NotificationToggle, StoreError, Subscription, TaskSnapshot, TaskStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
