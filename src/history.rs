//! Bounded history of full snapshots.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::ringbuffer::Ringbuffer;
use crate::snapshot::Snapshot;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Thread-safe, fixed-capacity sequence of past snapshots, oldest first.
pub struct History {
    inner: Mutex<Ringbuffer<Arc<Snapshot>>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Ringbuffer::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ringbuffer<Arc<Snapshot>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a snapshot, evicting the oldest one when full.
    pub fn push(&self, snapshot: Arc<Snapshot>) {
        self.lock().push(snapshot);
    }

    /// Copy of the stored snapshots in chronological order.
    pub fn to_vec(&self) -> Vec<Arc<Snapshot>> {
        self.lock().get_history()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.lock().latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}
