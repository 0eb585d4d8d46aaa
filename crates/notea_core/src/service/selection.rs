//! Selection state for bulk task actions.
//!
//! # Invariants
//! - Leaving selection mode always clears the selected set.
//! - After any store republish, the selected set only holds ids present in
//!   the new snapshot (when bound through [`bind_selection`]).

use crate::model::task::TaskId;
use crate::repo::task_repo::TaskGateway;
use crate::service::task_store::{BulkDeleteOutcome, Subscription, TaskSnapshot, TaskStore};
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Selection manager shared between a view and the store observer.
pub type SharedSelection = Arc<Mutex<SelectionManager>>;

/// Set of task ids marked for a bulk action, plus the selection-mode flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionManager {
    selecting: bool,
    selected: HashSet<TaskId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSelection {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn enter_selection_mode(&mut self) {
        self.selecting = true;
    }

    pub fn exit_selection_mode(&mut self) {
        self.selecting = false;
        self.selected.clear();
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// Adds `task_id` if absent, removes it otherwise. Returns whether the
    /// id is selected afterwards.
    ///
    /// Works outside selection mode too; callers gate visibility.
    pub fn toggle(&mut self, task_id: TaskId) -> bool {
        if self.selected.remove(&task_id) {
            false
        } else {
            self.selected.insert(task_id);
            true
        }
    }

    pub fn is_selected(&self, task_id: TaskId) -> bool {
        self.selected.contains(&task_id)
    }

    pub fn selected_ids(&self) -> HashSet<TaskId> {
        self.selected.clone()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Empties the set without leaving selection mode.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Whether a "delete selected" action is available.
    pub fn can_delete(&self) -> bool {
        self.selecting && !self.selected.is_empty()
    }

    /// Drops ids missing from `snapshot`. Returns how many were pruned.
    pub fn retain_existing(&mut self, snapshot: &TaskSnapshot) -> usize {
        let before = self.selected.len();
        self.selected.retain(|task_id| snapshot.contains(*task_id));
        before - self.selected.len()
    }

    /// Applies the result of deleting the selection.
    ///
    /// Deleted ids are dropped. A fully successful delete leaves selection
    /// mode; failed ids stay selected so the user can retry.
    pub fn complete_bulk_delete(&mut self, outcome: &BulkDeleteOutcome) {
        self.selected
            .retain(|task_id| !outcome.deleted.contains(task_id));
        if outcome.is_complete() {
            self.exit_selection_mode();
        }
    }
}

/// Keeps `selection` pruned against every snapshot `store` publishes.
///
/// The observer locks `selection`; do not hold that lock while mutating the
/// store.
pub fn bind_selection<G: TaskGateway>(
    store: &TaskStore<G>,
    selection: SharedSelection,
) -> Subscription {
    lock_selection(&selection).retain_existing(&store.snapshot());

    store.subscribe(move |snapshot| {
        let pruned = lock_selection(&selection).retain_existing(snapshot);
        if pruned > 0 {
            debug!("event=selection_prune module=selection status=ok pruned={pruned}");
        }
    })
}

/// Locks a shared selection, recovering from a poisoned lock.
pub fn lock_selection(selection: &Mutex<SelectionManager>) -> MutexGuard<'_, SelectionManager> {
    selection.lock().unwrap_or_else(PoisonError::into_inner)
}
