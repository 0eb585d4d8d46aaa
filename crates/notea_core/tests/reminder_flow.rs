use notea_core::clock::{DAY_MS, HOUR_MS, MINUTE_MS};
use notea_core::db::open_db_in_memory;
use notea_core::{
    InMemoryNotificationCenter, ManualClock, NotificationCenter, NotificationToggle,
    NotifierError, ReminderScheduler, ReminderState, SchedulingError, Settings,
    SqliteTaskRepository, TaskDraft, TaskStore, TriggerId, TriggerKind, TriggerRequest,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const NOW: i64 = 1_700_000_000_000;

struct Fixture {
    conn: Connection,
    center: Arc<InMemoryNotificationCenter>,
    clock: Arc<ManualClock>,
}

impl Fixture {
    fn new(permission_granted: bool) -> Self {
        Self {
            conn: open_db_in_memory().unwrap(),
            center: Arc::new(InMemoryNotificationCenter::new(permission_granted)),
            clock: Arc::new(ManualClock::new(NOW)),
        }
    }

    fn store(&self, settings: Settings) -> TaskStore<SqliteTaskRepository<'_>> {
        let scheduler = Arc::new(ReminderScheduler::new(
            self.center.clone(),
            self.clock.clone(),
            settings,
        ));
        let repo = SqliteTaskRepository::try_new(&self.conn).unwrap();
        TaskStore::load(repo, scheduler, settings, self.clock.clone()).unwrap()
    }
}

fn enabled() -> Settings {
    Settings::default().with_notifications_enabled(true)
}

#[test]
fn task_due_in_two_hours_gets_one_trigger() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());

    let task = store
        .create(TaskDraft::new("Buy milk").due_at(NOW + 2 * HOUR_MS))
        .unwrap();

    let pending = fixture.center.pending_for_task(task.id);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, TriggerKind::HourBefore);
    assert_eq!(pending[0].fire_at, NOW + HOUR_MS);
    assert_eq!(pending[0].payload.title, "Task Reminder");
    assert_eq!(pending[0].payload.body, "\"Buy milk\" is due in 1 hour.");
    assert!(store.take_reminder_warnings().is_empty());
}

#[test]
fn task_due_in_two_days_gets_both_triggers() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());

    let task = store
        .create(TaskDraft::new("Essay").due_at(NOW + 48 * HOUR_MS))
        .unwrap();

    let kinds: Vec<TriggerKind> = fixture
        .center
        .pending_for_task(task.id)
        .into_iter()
        .map(|request| request.kind)
        .collect();
    assert_eq!(kinds, vec![TriggerKind::DayBefore, TriggerKind::HourBefore]);
    assert_eq!(
        store.scheduler().state_of(task.id),
        ReminderState::Scheduled
    );
}

#[test]
fn updating_due_date_replaces_triggers() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());
    let task = store
        .create(TaskDraft::new("Gym").due_at(NOW + 3 * DAY_MS))
        .unwrap();

    let mut fields = task.fields();
    fields.due_at = NOW + 90 * MINUTE_MS;
    store.update(task.id, fields).unwrap();

    let pending = fixture.center.pending_for_task(task.id);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].fire_at, NOW + 30 * MINUTE_MS);
}

#[test]
fn deleting_task_cancels_outstanding_triggers() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());
    let task = store
        .create(TaskDraft::new("Call bank").due_at(NOW + 3 * DAY_MS))
        .unwrap();
    assert_eq!(fixture.center.pending_for_task(task.id).len(), 2);

    store.delete(task.id).unwrap();

    assert!(fixture.center.pending_for_task(task.id).is_empty());
    assert_eq!(
        store.scheduler().state_of(task.id),
        ReminderState::Cancelled
    );
}

#[test]
fn disabled_settings_schedule_nothing() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(Settings::default());

    store
        .create(TaskDraft::new("Quiet").due_at(NOW + 3 * DAY_MS))
        .unwrap();

    assert!(fixture.center.pending().is_empty());
}

#[test]
fn enabling_schedules_every_future_task() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(Settings::default());
    let future = store
        .create(TaskDraft::new("future").due_at(NOW + 3 * DAY_MS))
        .unwrap();
    let soon = store
        .create(TaskDraft::new("soon").due_at(NOW + 2 * HOUR_MS))
        .unwrap();
    let overdue = store
        .create(TaskDraft::new("overdue").due_at(NOW - HOUR_MS))
        .unwrap();

    let toggle = store.set_notifications_enabled(true);

    let reports = match toggle {
        NotificationToggle::Enabled { reports } => reports,
        other => panic!("expected reminders to be enabled, got {other:?}"),
    };
    assert_eq!(reports.len(), 2);
    assert!(store.settings().notifications_enabled);
    assert_eq!(fixture.center.pending_for_task(future.id).len(), 2);
    assert_eq!(fixture.center.pending_for_task(soon.id).len(), 1);
    assert!(fixture.center.pending_for_task(overdue.id).is_empty());
}

#[test]
fn disabling_cancels_every_trigger() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());
    for offset in [2, 3, 4] {
        store
            .create(TaskDraft::new("t").due_at(NOW + offset * DAY_MS))
            .unwrap();
    }
    assert_eq!(fixture.center.pending().len(), 6);

    let toggle = store.set_notifications_enabled(false);

    assert_eq!(toggle, NotificationToggle::Disabled);
    assert!(fixture.center.pending().is_empty());
    assert!(!store.settings().notifications_enabled);
}

#[test]
fn permission_denied_forces_reminders_off() {
    let fixture = Fixture::new(false);
    let mut store = fixture.store(Settings::default());
    store
        .create(TaskDraft::new("t").due_at(NOW + 3 * DAY_MS))
        .unwrap();

    let toggle = store.set_notifications_enabled(true);

    assert_eq!(toggle, NotificationToggle::PermissionDenied);
    assert!(!store.settings().notifications_enabled);
    assert!(!store.scheduler().settings().notifications_enabled);
    assert!(fixture.center.pending().is_empty());
}

#[test]
fn fired_trigger_leaves_task_partially_fired() {
    let fixture = Fixture::new(true);
    let mut store = fixture.store(enabled());
    let task = store
        .create(TaskDraft::new("Report").due_at(NOW + 2 * DAY_MS))
        .unwrap();

    fixture.clock.advance(DAY_MS + MINUTE_MS);
    let delivered = fixture.center.take_due(NOW + DAY_MS + MINUTE_MS);

    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].kind, TriggerKind::DayBefore);
    assert_eq!(delivered[0].payload.body, "\"Report\" is due in 24 hours.");
    assert_eq!(
        store.scheduler().state_of(task.id),
        ReminderState::PartiallyFired
    );
}

#[test]
fn reopened_store_replaces_triggers_left_by_earlier_session() {
    let fixture = Fixture::new(true);
    let task = {
        let mut earlier = fixture.store(enabled());
        earlier
            .create(TaskDraft::new("Dentist").due_at(NOW + 2 * DAY_MS))
            .unwrap()
    };
    assert_eq!(fixture.center.pending_for_task(task.id).len(), 2);

    let mut reopened = fixture.store(enabled());

    assert_eq!(fixture.center.pending_for_task(task.id).len(), 2);
    assert_eq!(
        reopened.scheduler().state_of(task.id),
        ReminderState::Scheduled
    );
    assert!(reopened.take_reminder_warnings().is_empty());

    reopened.delete(task.id).unwrap();
    assert!(fixture.center.pending().is_empty());
}

#[test]
fn reopened_store_schedules_tasks_created_while_reminders_were_off() {
    let fixture = Fixture::new(true);
    let (future, overdue) = {
        let mut earlier = fixture.store(Settings::default());
        let future = earlier
            .create(TaskDraft::new("future").due_at(NOW + 3 * DAY_MS))
            .unwrap();
        let overdue = earlier
            .create(TaskDraft::new("overdue").due_at(NOW - HOUR_MS))
            .unwrap();
        (future, overdue)
    };
    assert!(fixture.center.pending().is_empty());

    let _reopened = fixture.store(enabled());

    assert_eq!(fixture.center.pending_for_task(future.id).len(), 2);
    assert!(fixture.center.pending_for_task(overdue.id).is_empty());
}

#[test]
fn reopened_store_with_reminders_off_leaves_center_alone() {
    let fixture = Fixture::new(true);
    {
        let mut earlier = fixture.store(enabled());
        earlier
            .create(TaskDraft::new("kept").due_at(NOW + 3 * DAY_MS))
            .unwrap();
    }

    let _reopened = fixture.store(Settings::default());

    assert_eq!(fixture.center.pending().len(), 2);
}

/// Center that refuses registrations and records cancel-all calls.
#[derive(Default)]
struct RefusingCenter {
    cancel_all_calls: Mutex<usize>,
    fail_cancel_all: AtomicBool,
}

impl NotificationCenter for RefusingCenter {
    fn request_permission(&self) -> Result<bool, NotifierError> {
        Err(NotifierError::new("permission prompt unavailable"))
    }

    fn register(&self, _request: &TriggerRequest) -> Result<(), NotifierError> {
        Err(NotifierError::new("quota exceeded"))
    }

    fn cancel(&self, _trigger_id: TriggerId) -> Result<(), NotifierError> {
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotifierError> {
        *self.cancel_all_calls.lock().unwrap() += 1;
        if self.fail_cancel_all.load(Ordering::SeqCst) {
            return Err(NotifierError::new("center offline"));
        }
        Ok(())
    }
}

fn refusing_store<'conn>(
    conn: &'conn Connection,
    center: Arc<RefusingCenter>,
    settings: Settings,
) -> TaskStore<SqliteTaskRepository<'conn>> {
    let clock = Arc::new(ManualClock::new(NOW));
    let scheduler = Arc::new(ReminderScheduler::new(center, clock.clone(), settings));
    let repo = SqliteTaskRepository::try_new(conn).unwrap();
    TaskStore::load(repo, scheduler, settings, clock).unwrap()
}

#[test]
fn registration_failure_is_a_warning_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let center = Arc::new(RefusingCenter::default());
    let mut store = refusing_store(&conn, center, enabled());

    let task = store
        .create(TaskDraft::new("Pay rent").due_at(NOW + 3 * DAY_MS))
        .unwrap();

    assert_eq!(store.get(task.id), Some(task.clone()));
    let warnings = store.take_reminder_warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|warning| matches!(
        warning,
        SchedulingError::Register { task_id, .. } if *task_id == task.id
    )));
    assert!(store.take_reminder_warnings().is_empty());
}

#[test]
fn permission_error_and_cancel_failure_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let center = Arc::new(RefusingCenter::default());
    center.fail_cancel_all.store(true, Ordering::SeqCst);
    let mut store = refusing_store(&conn, center.clone(), Settings::default());

    let toggle = store.set_notifications_enabled(true);

    assert_eq!(toggle, NotificationToggle::PermissionDenied);
    assert_eq!(*center.cancel_all_calls.lock().unwrap(), 1);
    let warnings = store.take_reminder_warnings();
    assert!(matches!(warnings[0], SchedulingError::Permission(_)));
    assert!(matches!(warnings[1], SchedulingError::CancelAll(_)));
}

#[test]
fn reload_failures_become_warnings() {
    let conn = open_db_in_memory().unwrap();
    {
        let mut earlier = refusing_store(
            &conn,
            Arc::new(RefusingCenter::default()),
            Settings::default(),
        );
        earlier
            .create(TaskDraft::new("Pay rent").due_at(NOW + 3 * DAY_MS))
            .unwrap();
    }
    let center = Arc::new(RefusingCenter::default());
    center.fail_cancel_all.store(true, Ordering::SeqCst);

    let mut store = refusing_store(&conn, center.clone(), enabled());

    assert_eq!(store.len(), 1);
    assert_eq!(*center.cancel_all_calls.lock().unwrap(), 1);
    let warnings = store.take_reminder_warnings();
    assert_eq!(warnings.len(), 3);
    assert!(matches!(warnings[0], SchedulingError::CancelAll(_)));
    assert!(warnings[1..]
        .iter()
        .all(|warning| matches!(warning, SchedulingError::Register { .. })));
}
