//! TaskStore — the single authoritative in-memory task collection.
//!
//! Display surfaces observe the store through [`TaskStore::subscribe`]; the
//! enrichment orchestrator feeds it through [`TaskStore::add`]. Observers
//! always receive a fresh snapshot, never a reference into the store, so no
//! caller can mutate internal state from the outside.
//!
//! All mutating entry points run on the same cooperative scheduler, so the
//! mutex only guards against accidental cross-thread use, not contention.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use thiserror::Error;

use crate::task::{Task, TaskStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid task: {0}")]
    InvalidTask(&'static str),
}

/// Handle returned by [`TaskStore::subscribe`]; pass it back to
/// [`TaskStore::unsubscribe`] to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Observer = Box<dyn Fn(&[Task]) + Send>;

#[derive(Default)]
struct Inner {
    /// Most-recent-first: `add` inserts at the front.
    tasks: Vec<Task>,
    observers: Vec<(u64, Observer)>,
}

#[derive(Default)]
pub struct TaskStore {
    inner: Mutex<Inner>,
    next_sub: AtomicU64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, most-recent-first.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Register an observer.
    ///
    /// The observer fires synchronously with the current snapshot before this
    /// returns, and again after every mutation. Observers must not call back
    /// into the store (single cooperative scheduler; re-entry would deadlock).
    pub fn subscribe(&self, observer: impl Fn(&[Task]) + Send + 'static) -> Subscription {
        let id = self.next_sub.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        let snapshot = inner.tasks.clone();
        observer(&snapshot);
        inner.observers.push((id, Box::new(observer)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, sub: Subscription) {
        self.lock().observers.retain(|(id, _)| *id != sub.0);
    }

    /// Insert a task at the front and notify every observer.
    ///
    /// Fails only on malformed input; a valid task always lands and always
    /// triggers exactly one notification.
    pub fn add(&self, task: Task) -> Result<(), StoreError> {
        if task.id.trim().is_empty() {
            return Err(StoreError::InvalidTask("missing id"));
        }
        if task.title.trim().is_empty() {
            return Err(StoreError::InvalidTask("empty title"));
        }
        let mut inner = self.lock();
        inner.tasks.insert(0, task);
        Self::notify(&inner);
        Ok(())
    }

    /// No-op (no notification) when `id` is absent. Idempotent.
    pub fn mark_complete(&self, id: &str) {
        self.set_status(id, TaskStatus::Completed);
    }

    /// No-op (no notification) when `id` is absent. Idempotent.
    pub fn mark_active(&self, id: &str) {
        self.set_status(id, TaskStatus::Active);
    }

    fn set_status(&self, id: &str, status: TaskStatus) {
        let mut inner = self.lock();
        let Some(task) = inner.tasks.iter_mut().find(|t| t.id == id) else {
            return;
        };
        task.status = status;
        task.updated_at = Utc::now();
        Self::notify(&inner);
    }

    fn notify(inner: &Inner) {
        let snapshot = inner.tasks.clone();
        for (_, observer) in &inner.observers {
            observer(&snapshot);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means an observer panicked; the task list itself is
        // still consistent (mutations complete before notify runs).
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
