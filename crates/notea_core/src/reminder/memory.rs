//! In-process notification center.
//!
//! Holds pending triggers in memory so a host without a native scheduler
//! (or a test) can drain and deliver them itself.

use crate::model::task::TaskId;
use crate::reminder::notifier::{NotificationCenter, NotifierError, TriggerId, TriggerRequest};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe `NotificationCenter` backed by an in-memory map.
#[derive(Debug, Default)]
pub struct InMemoryNotificationCenter {
    permission_granted: AtomicBool,
    pending: Mutex<BTreeMap<TriggerId, TriggerRequest>>,
}

impl InMemoryNotificationCenter {
    /// Creates a center that answers permission requests with
    /// `permission_granted`.
    pub fn new(permission_granted: bool) -> Self {
        Self {
            permission_granted: AtomicBool::new(permission_granted),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// All pending requests ordered by fire time.
    pub fn pending(&self) -> Vec<TriggerRequest> {
        let mut requests: Vec<TriggerRequest> = self.lock().values().cloned().collect();
        requests.sort_by_key(|request| (request.fire_at, request.kind));
        requests
    }

    pub fn pending_for_task(&self, task_id: TaskId) -> Vec<TriggerRequest> {
        self.pending()
            .into_iter()
            .filter(|request| request.task_id == task_id)
            .collect()
    }

    /// Removes and returns every request whose fire time is at or before
    /// `now_epoch_ms`.
    pub fn take_due(&self, now_epoch_ms: i64) -> Vec<TriggerRequest> {
        let mut pending = self.lock();
        let due_ids: Vec<TriggerId> = pending
            .values()
            .filter(|request| request.fire_at <= now_epoch_ms)
            .map(|request| request.trigger_id)
            .collect();

        let mut due: Vec<TriggerRequest> = due_ids
            .iter()
            .filter_map(|trigger_id| pending.remove(trigger_id))
            .collect();
        due.sort_by_key(|request| (request.fire_at, request.kind));
        due
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<TriggerId, TriggerRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationCenter for InMemoryNotificationCenter {
    fn request_permission(&self) -> Result<bool, NotifierError> {
        Ok(self.permission_granted.load(Ordering::SeqCst))
    }

    fn register(&self, request: &TriggerRequest) -> Result<(), NotifierError> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(NotifierError::new("notification permission not granted"));
        }
        self.lock().insert(request.trigger_id, request.clone());
        Ok(())
    }

    fn cancel(&self, trigger_id: TriggerId) -> Result<(), NotifierError> {
        self.lock().remove(&trigger_id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotifierError> {
        self.lock().clear();
        Ok(())
    }
}
