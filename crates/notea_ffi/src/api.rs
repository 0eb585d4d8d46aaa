//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose task, settings and reminder use-cases to Dart via FRB.
//! - Translate core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every DB-backed call opens its own connection; reminder bookkeeping and
//!   the notification center live for the whole process.
//! - Enum values cross the boundary as lowercase strings.

use log::warn;
use notea_core::db::open_db;
use notea_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, CategoryFilter, Clock, InMemoryNotificationCenter, NotificationToggle, Priority,
    ReminderScheduler, SchedulingError, Settings, SqliteSettingsRepository, SqliteTaskRepository,
    SystemClock, Task, TaskDraft, TaskFields, TaskId, TaskQuery, TaskStore, TriggerRequest,
};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

const DB_FILE_NAME: &str = "notea_tasks.sqlite3";
const DB_PATH_ENV: &str = "NOTEA_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

static CLOCK: Lazy<Arc<dyn Clock>> = Lazy::new(|| Arc::new(SystemClock));
static NOTIFICATION_CENTER: Lazy<Arc<InMemoryNotificationCenter>> =
    Lazy::new(|| Arc::new(InMemoryNotificationCenter::new(true)));
static SCHEDULER: Lazy<Arc<ReminderScheduler>> = Lazy::new(|| {
    Arc::new(ReminderScheduler::new(
        NOTIFICATION_CENTER.clone(),
        CLOCK.clone(),
        Settings::default(),
    ))
});

type FfiStore<'conn> = TaskStore<SqliteTaskRepository<'conn>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task projection returned to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    /// Stable task ID in string form.
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_at_epoch_ms: i64,
    /// `low|medium|high`.
    pub priority: String,
    /// `work|school|exercise|personal|other`.
    pub category: String,
}

impl From<&Task> for TaskItem {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_at_epoch_ms: task.due_at,
            priority: task.priority.as_str().to_ascii_lowercase(),
            category: task.category.as_str().to_ascii_lowercase(),
        }
    }
}

/// Single-task response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResponse {
    pub ok: bool,
    /// Present on success.
    pub task: Option<TaskItem>,
    /// Human-readable message; carries reminder warnings on success.
    pub message: String,
}

impl TaskResponse {
    fn success(message: String, task: &Task) -> Self {
        Self {
            ok: true,
            task: Some(task.into()),
            message,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            task: None,
            message,
        }
    }
}

/// List response envelope, ordered by due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

/// Bulk delete response. `ok` is false when any id failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteResponse {
    pub ok: bool,
    pub deleted_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub message: String,
}

/// Settings response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsResponse {
    pub ok: bool,
    pub notifications_enabled: bool,
    pub dark_mode_enabled: bool,
    pub message: String,
}

impl SettingsResponse {
    fn success(message: impl Into<String>, settings: Settings) -> Self {
        Self {
            ok: true,
            notifications_enabled: settings.notifications_enabled,
            dark_mode_enabled: settings.dark_mode_enabled,
            message: message.into(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            notifications_enabled: false,
            dark_mode_enabled: false,
            message,
        }
    }
}

/// Reminder that reached its fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderItem {
    pub task_id: String,
    /// `day_before|hour_before`.
    pub kind: String,
    pub fire_at_epoch_ms: i64,
    pub title: String,
    pub body: String,
}

impl From<TriggerRequest> for ReminderItem {
    fn from(request: TriggerRequest) -> Self {
        Self {
            task_id: request.task_id.to_string(),
            kind: request.kind.as_str().to_string(),
            fire_at_epoch_ms: request.fire_at,
            title: request.payload.title,
            body: request.payload.body,
        }
    }
}

/// Due reminders response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderListResponse {
    pub ok: bool,
    pub items: Vec<ReminderItem>,
    pub message: String,
}

/// Creates a task. Omitted fields fall back to defaults (due now, medium,
/// work).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Fails on empty title or unknown priority/category strings.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(
    title: String,
    description: Option<String>,
    due_at_epoch_ms: Option<i64>,
    priority: Option<String>,
    category: Option<String>,
) -> TaskResponse {
    let result = build_draft(title, description, due_at_epoch_ms, priority, category)
        .and_then(|draft| {
            with_store(|store, _| {
                let task = store.create(draft).map_err(|err| err.to_string())?;
                Ok((task, drain_warnings(store)))
            })
        });
    match result {
        Ok((task, warnings)) => {
            TaskResponse::success(with_warnings("Task created.", &warnings), &task)
        }
        Err(err) => TaskResponse::failure(format!("task_create failed: {err}")),
    }
}

/// Replaces every editable field of an existing task.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Unchanged fields succeed without touching storage.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(
    task_id: String,
    title: String,
    description: String,
    due_at_epoch_ms: i64,
    priority: String,
    category: String,
) -> TaskResponse {
    let result = parse_task_id(&task_id).and_then(|id| {
        let fields = TaskFields {
            title,
            description,
            due_at: due_at_epoch_ms,
            priority: parse_priority(&priority)?,
            category: parse_category(&category)?,
        };
        with_store(|store, _| {
            let task = store.update(id, fields).map_err(|err| err.to_string())?;
            Ok((task, drain_warnings(store)))
        })
    });
    match result {
        Ok((task, warnings)) => {
            TaskResponse::success(with_warnings("Task updated.", &warnings), &task)
        }
        Err(err) => TaskResponse::failure(format!("task_update failed: {err}")),
    }
}

/// Deletes one task. Unknown ids succeed as a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String) -> ActionResponse {
    let result = parse_task_id(&task_id).and_then(|id| {
        with_store(|store, _| {
            store.delete(id).map_err(|err| err.to_string())?;
            Ok(drain_warnings(store))
        })
    });
    match result {
        Ok(warnings) => ActionResponse {
            ok: true,
            message: with_warnings("Task deleted.", &warnings),
        },
        Err(err) => ActionResponse {
            ok: false,
            message: format!("task_delete failed: {err}"),
        },
    }
}

/// Deletes every listed task independently.
///
/// # FFI contract
/// - Malformed ids fail the whole call before anything is deleted.
/// - Per-task storage failures are reported in `failed_ids`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_delete_many(task_ids: Vec<String>) -> BulkDeleteResponse {
    let parsed: Result<Vec<TaskId>, String> =
        task_ids.iter().map(|raw| parse_task_id(raw)).collect();
    match parsed {
        Ok(ids) => bulk_delete("tasks_delete_many", move |store| store.delete_many(ids)),
        Err(err) => bulk_failure(format!("tasks_delete_many failed: {err}")),
    }
}

/// Deletes every task.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_delete_all() -> BulkDeleteResponse {
    bulk_delete("tasks_delete_all", |store| store.delete_all())
}

/// Lists tasks matching `text` (title, case-insensitive) and `category`
/// (`all` or a category name), ordered by due date.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list(text: String, category: String) -> TaskListResponse {
    let result = category
        .parse::<CategoryFilter>()
        .map_err(|err| err.to_string())
        .and_then(|filter| {
            with_store(|store, _| Ok(TaskQuery::new(text).with_category(filter).run(&store.list())))
        });
    match result {
        Ok(tasks) => {
            let items: Vec<TaskItem> = tasks.iter().map(TaskItem::from).collect();
            let message = if items.is_empty() {
                "No tasks.".to_string()
            } else {
                format!("Found {} task(s).", items.len())
            };
            TaskListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("tasks_list failed: {err}"),
        },
    }
}

/// Reads persisted settings.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_get() -> SettingsResponse {
    match with_store(|store, _| Ok(store.settings())) {
        Ok(settings) => SettingsResponse::success("Settings loaded.", settings),
        Err(err) => SettingsResponse::failure(format!("settings_get failed: {err}")),
    }
}

/// Turns reminders on or off and persists the resulting flag.
///
/// # FFI contract
/// - Enabling asks for permission first; denial leaves reminders off and
///   still reports `ok=true` with the effective settings.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_set_notifications(enabled: bool) -> SettingsResponse {
    let result = with_store(|store, settings_repo| {
        toggle_and_persist(store, enabled, |settings| {
            settings_repo.save(settings).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok((toggle, settings, warnings)) => {
            let message = match toggle {
                NotificationToggle::Enabled { reports } => {
                    format!("Reminders enabled for {} task(s).", reports.len())
                }
                NotificationToggle::Disabled => "Reminders disabled.".to_string(),
                NotificationToggle::PermissionDenied => {
                    "Notification permission denied.".to_string()
                }
            };
            SettingsResponse::success(with_warnings(&message, &warnings), settings)
        }
        Err(err) => SettingsResponse::failure(format!("settings_set_notifications failed: {err}")),
    }
}

/// Stores the appearance preference.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_set_dark_mode(enabled: bool) -> SettingsResponse {
    let result = with_store(|store, settings_repo| {
        store.set_dark_mode_enabled(enabled);
        settings_repo
            .save(&store.settings())
            .map_err(|err| err.to_string())?;
        Ok(store.settings())
    });
    match result {
        Ok(settings) => SettingsResponse::success("Appearance saved.", settings),
        Err(err) => SettingsResponse::failure(format!("settings_set_dark_mode failed: {err}")),
    }
}

/// Records the host's notification permission answer for later requests.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_set_permission(granted: bool) -> ActionResponse {
    NOTIFICATION_CENTER.set_permission_granted(granted);
    ActionResponse {
        ok: true,
        message: format!("Notification permission set to {granted}."),
    }
}

/// Removes and returns reminders whose fire time has passed, for the host
/// to deliver.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_take_due() -> ReminderListResponse {
    let items: Vec<ReminderItem> = NOTIFICATION_CENTER
        .take_due(CLOCK.now_epoch_ms())
        .into_iter()
        .map(ReminderItem::from)
        .collect();
    let message = if items.is_empty() {
        "No reminders due.".to_string()
    } else {
        format!("{} reminder(s) due.", items.len())
    };
    ReminderListResponse {
        ok: true,
        items,
        message,
    }
}

fn build_draft(
    title: String,
    description: Option<String>,
    due_at_epoch_ms: Option<i64>,
    priority: Option<String>,
    category: Option<String>,
) -> Result<TaskDraft, String> {
    let mut draft = TaskDraft::new(title);
    draft.description = description;
    draft.due_at = due_at_epoch_ms;
    draft.priority = priority.as_deref().map(parse_priority).transpose()?;
    draft.category = category.as_deref().map(parse_category).transpose()?;
    Ok(draft)
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid task id `{raw}`: {err}"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse().map_err(|err: notea_core::ParseEnumError| err.to_string())
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse().map_err(|err: notea_core::ParseEnumError| err.to_string())
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_store<T>(
    f: impl FnOnce(&mut FfiStore<'_>, &SqliteSettingsRepository<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| {
        warn!("event=ffi_db_open module=ffi status=error error={err}");
        format!("DB open failed: {err}")
    })?;
    let settings_repo = SqliteSettingsRepository::try_new(&conn)
        .map_err(|err| format!("settings repo init failed: {err}"))?;
    let settings = settings_repo
        .load()
        .map_err(|err| format!("settings load failed: {err}"))?;
    let task_repo = SqliteTaskRepository::try_new(&conn)
        .map_err(|err| format!("task repo init failed: {err}"))?;
    let mut store = TaskStore::load(task_repo, SCHEDULER.clone(), settings, CLOCK.clone())
        .map_err(|err| format!("task store load failed: {err}"))?;
    f(&mut store, &settings_repo)
}

/// Applies the toggle, then persists it. When the save fails the store and
/// the shared scheduler are put back to the previous flag.
fn toggle_and_persist(
    store: &mut FfiStore<'_>,
    enabled: bool,
    save: impl FnOnce(&Settings) -> Result<(), String>,
) -> Result<(NotificationToggle, Settings, Vec<SchedulingError>), String> {
    let previous = store.settings().notifications_enabled;
    let toggle = store.set_notifications_enabled(enabled);
    if let Err(err) = save(&store.settings()) {
        warn!(
            "event=ffi_settings_save module=ffi status=error enabled={enabled} reverted_to={previous} error={err}"
        );
        if store.settings().notifications_enabled != previous {
            store.set_notifications_enabled(previous);
        }
        store.take_reminder_warnings();
        return Err(err);
    }
    Ok((toggle, store.settings(), drain_warnings(store)))
}

fn bulk_delete(
    operation: &str,
    f: impl FnOnce(&mut FfiStore<'_>) -> notea_core::BulkDeleteOutcome,
) -> BulkDeleteResponse {
    match with_store(|store, _| {
        let outcome = f(store);
        Ok((outcome, drain_warnings(store)))
    }) {
        Ok((outcome, warnings)) => {
            let base = format!(
                "Deleted {} task(s), {} failed.",
                outcome.deleted.len(),
                outcome.failed.len()
            );
            BulkDeleteResponse {
                ok: outcome.is_complete(),
                deleted_ids: outcome.deleted.iter().map(Uuid::to_string).collect(),
                failed_ids: outcome.failed.iter().map(Uuid::to_string).collect(),
                message: with_warnings(&base, &warnings),
            }
        }
        Err(err) => bulk_failure(format!("{operation} failed: {err}")),
    }
}

fn bulk_failure(message: String) -> BulkDeleteResponse {
    BulkDeleteResponse {
        ok: false,
        deleted_ids: Vec::new(),
        failed_ids: Vec::new(),
        message,
    }
}

fn drain_warnings(store: &mut FfiStore<'_>) -> Vec<SchedulingError> {
    store.take_reminder_warnings()
}

fn with_warnings(message: &str, warnings: &[SchedulingError]) -> String {
    if warnings.is_empty() {
        return message.to_string();
    }
    let details: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    format!("{message} Reminder warnings: {}", details.join("; "))
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, reminders_set_permission, reminders_take_due,
        settings_get, settings_set_dark_mode, settings_set_notifications, task_create,
        task_delete, task_update, tasks_delete_many, tasks_list,
    };
    use super::toggle_and_persist;
    use notea_core::clock::DAY_MS;
    use notea_core::db::{open_db, open_db_in_memory};
    use notea_core::{
        InMemoryNotificationCenter, ManualClock, ReminderScheduler, Settings,
        SqliteTaskRepository, TaskDraft, TaskStore,
    };
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::time::{SystemTime, UNIX_EPOCH};

    // Settings and the notification center are process-wide.
    static SHARED_STATE: Mutex<()> = Mutex::new(());

    fn lock_shared() -> MutexGuard<'static, ()> {
        SHARED_STATE.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let log_dir = std::env::temp_dir().join("notea-ffi-logs");
        let error = init_logging("verbose".to_string(), log_dir.to_string_lossy().into_owned());
        assert!(error.contains("unsupported log level"), "{error}");
    }

    #[test]
    fn task_create_applies_defaults_and_persists() {
        let _guard = lock_shared();
        let title = unique_token("create-defaults");
        let response = task_create(title.clone(), None, None, None, None);
        assert!(response.ok, "{}", response.message);
        let task = response.task.expect("created task should be returned");
        assert_eq!(task.priority, "medium");
        assert_eq!(task.category, "work");

        let conn = open_db(super::resolve_db_path()).expect("open db");
        let (stored_title, priority): (String, String) = conn
            .query_row(
                "SELECT title, priority FROM tasks WHERE uuid = ?1",
                [task.id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("query task row");
        assert_eq!(stored_title, title);
        assert_eq!(priority, "medium");
    }

    #[test]
    fn task_create_rejects_blank_title_and_bad_enum() {
        let blank = task_create("   ".to_string(), None, None, None, None);
        assert!(!blank.ok);
        assert!(blank.task.is_none());

        let bad = task_create(
            "valid".to_string(),
            None,
            None,
            Some("urgent".to_string()),
            None,
        );
        assert!(!bad.ok);
        assert!(bad.message.contains("urgent"));
    }

    #[test]
    fn tasks_list_filters_by_text_and_category() {
        let _guard = lock_shared();
        let token = unique_token("list-filter");
        let school = task_create(
            format!("{token} essay"),
            None,
            Some(2_000_000_000_000),
            None,
            Some("school".to_string()),
        );
        assert!(school.ok, "{}", school.message);
        let work = task_create(format!("{token} report"), None, None, None, None);
        assert!(work.ok, "{}", work.message);

        let all = tasks_list(token.to_uppercase(), "all".to_string());
        assert!(all.ok, "{}", all.message);
        assert_eq!(all.items.len(), 2);

        let only_school = tasks_list(token.clone(), "School".to_string());
        assert_eq!(only_school.items.len(), 1);
        assert_eq!(only_school.items[0].category, "school");

        let invalid = tasks_list(token, "chores".to_string());
        assert!(!invalid.ok);
    }

    #[test]
    fn task_update_and_delete_round_trip() {
        let _guard = lock_shared();
        let created = task_create(unique_token("update"), None, None, None, None);
        let id = created.task.expect("created task").id;

        let updated = task_update(
            id.clone(),
            "renamed".to_string(),
            "details".to_string(),
            1_900_000_000_000,
            "high".to_string(),
            "personal".to_string(),
        );
        assert!(updated.ok, "{}", updated.message);
        let task = updated.task.expect("updated task");
        assert_eq!(task.title, "renamed");
        assert_eq!(task.priority, "high");

        let deleted = task_delete(id.clone());
        assert!(deleted.ok, "{}", deleted.message);

        let missing = task_update(
            id,
            "again".to_string(),
            String::new(),
            0,
            "low".to_string(),
            "other".to_string(),
        );
        assert!(!missing.ok);
        assert!(missing.message.contains("not found"));
    }

    #[test]
    fn tasks_delete_many_rejects_malformed_ids() {
        let response = tasks_delete_many(vec!["not-a-uuid".to_string()]);
        assert!(!response.ok);
        assert!(response.deleted_ids.is_empty());
    }

    #[test]
    fn tasks_delete_many_removes_listed_tasks() {
        let _guard = lock_shared();
        let token = unique_token("delete-many");
        let ids: Vec<String> = (0..2)
            .map(|index| {
                task_create(format!("{token} {index}"), None, None, None, None)
                    .task
                    .expect("created task")
                    .id
            })
            .collect();

        let response = tasks_delete_many(ids.clone());
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.deleted_ids.len(), 2);
        assert!(tasks_list(token, "all".to_string()).items.is_empty());
    }

    #[test]
    fn notifications_toggle_persists_and_schedules() {
        let _guard = lock_shared();
        reminders_set_permission(false);
        let denied = settings_set_notifications(true);
        assert!(denied.ok, "{}", denied.message);
        assert!(!denied.notifications_enabled);

        reminders_set_permission(true);
        let enabled = settings_set_notifications(true);
        assert!(enabled.ok, "{}", enabled.message);
        assert!(enabled.notifications_enabled);
        assert!(settings_get().notifications_enabled);

        let disabled = settings_set_notifications(false);
        assert!(!disabled.notifications_enabled);
        assert!(reminders_take_due().ok);
    }

    #[test]
    fn failed_settings_save_restores_previous_reminder_state() {
        const NOW: i64 = 1_700_000_000_000;
        let conn = open_db_in_memory().expect("open in-memory db");
        let center = Arc::new(InMemoryNotificationCenter::new(true));
        let clock = Arc::new(ManualClock::new(NOW));
        let scheduler = Arc::new(ReminderScheduler::new(
            center.clone(),
            clock.clone(),
            Settings::default(),
        ));
        let repo = SqliteTaskRepository::try_new(&conn).expect("task repo");
        let mut store = TaskStore::load(repo, scheduler.clone(), Settings::default(), clock)
            .expect("load store");
        store
            .create(TaskDraft::new("Dentist").due_at(NOW + 3 * DAY_MS))
            .expect("create task");

        let failed_enable =
            toggle_and_persist(&mut store, true, |_| Err("disk full".to_string()));
        assert_eq!(failed_enable.err().as_deref(), Some("disk full"));
        assert!(!store.settings().notifications_enabled);
        assert!(!scheduler.settings().notifications_enabled);
        assert!(center.pending().is_empty());
        assert!(store.take_reminder_warnings().is_empty());

        let mut saved = Vec::new();
        let enabled = toggle_and_persist(&mut store, true, |settings| {
            saved.push(*settings);
            Ok(())
        })
        .expect("enable reminders");
        assert!(enabled.1.notifications_enabled);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].notifications_enabled);
        assert_eq!(center.pending().len(), 2);

        let failed_disable =
            toggle_and_persist(&mut store, false, |_| Err("disk full".to_string()));
        assert!(failed_disable.is_err());
        assert!(store.settings().notifications_enabled);
        assert!(scheduler.settings().notifications_enabled);
        assert_eq!(center.pending().len(), 2);
    }

    #[test]
    fn dark_mode_is_persisted() {
        let _guard = lock_shared();
        let on = settings_set_dark_mode(true);
        assert!(on.ok, "{}", on.message);
        assert!(settings_get().dark_mode_enabled);

        let off = settings_set_dark_mode(false);
        assert!(!off.dark_mode_enabled);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
