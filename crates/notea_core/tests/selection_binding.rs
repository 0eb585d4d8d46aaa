use notea_core::db::open_db_in_memory;
use notea_core::{
    bind_selection, lock_selection, InMemoryNotificationCenter, ManualClock, ReminderScheduler,
    SelectionManager, Settings, SqliteTaskRepository, TaskDraft, TaskStore,
};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

fn open_store(conn: &Connection) -> TaskStore<SqliteTaskRepository<'_>> {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let center = Arc::new(InMemoryNotificationCenter::new(true));
    let scheduler = Arc::new(ReminderScheduler::new(
        center,
        clock.clone(),
        Settings::default(),
    ));
    let repo = SqliteTaskRepository::try_new(conn).unwrap();
    TaskStore::load(repo, scheduler, Settings::default(), clock).unwrap()
}

#[test]
fn deleting_selected_tasks_exits_selection_mode() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    let selection = SelectionManager::shared();
    let _subscription = bind_selection(&store, selection.clone());

    let a = store.create(TaskDraft::new("a")).unwrap();
    let b = store.create(TaskDraft::new("b")).unwrap();
    let c = store.create(TaskDraft::new("c")).unwrap();

    let to_delete = {
        let mut manager = lock_selection(&selection);
        manager.enter_selection_mode();
        manager.toggle(a.id);
        manager.toggle(c.id);
        assert!(manager.can_delete());
        manager.selected_ids()
    };

    let outcome = store.delete_many(to_delete);
    lock_selection(&selection).complete_bulk_delete(&outcome);

    let manager = lock_selection(&selection);
    assert!(!manager.is_selecting());
    assert!(manager.is_empty());
    assert_eq!(store.snapshot().ids(), BTreeSet::from([b.id]));
}

#[test]
fn selection_is_pruned_when_tasks_disappear() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    let selection = SelectionManager::shared();
    let _subscription = bind_selection(&store, selection.clone());

    let kept = store.create(TaskDraft::new("kept")).unwrap();
    let removed = store.create(TaskDraft::new("removed")).unwrap();
    {
        let mut manager = lock_selection(&selection);
        manager.enter_selection_mode();
        manager.toggle(kept.id);
        manager.toggle(removed.id);
    }

    store.delete(removed.id).unwrap();

    let manager = lock_selection(&selection);
    assert!(manager.is_selecting());
    assert_eq!(manager.selected_ids(), HashSet::from([kept.id]));
}

#[test]
fn binding_prunes_stale_ids_immediately() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    let live = store.create(TaskDraft::new("live")).unwrap();

    let selection = SelectionManager::shared();
    let stale = uuid::Uuid::new_v4();
    {
        let mut manager = lock_selection(&selection);
        manager.toggle(live.id);
        manager.toggle(stale);
    }

    let _subscription = bind_selection(&store, selection.clone());

    assert_eq!(
        lock_selection(&selection).selected_ids(),
        HashSet::from([live.id])
    );
}

#[test]
fn unsubscribed_selection_is_no_longer_pruned() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    let selection = SelectionManager::shared();
    let subscription = bind_selection(&store, selection.clone());

    let task = store.create(TaskDraft::new("t")).unwrap();
    lock_selection(&selection).toggle(task.id);
    subscription.unsubscribe();

    store.delete(task.id).unwrap();

    assert!(lock_selection(&selection).is_selected(task.id));
}
