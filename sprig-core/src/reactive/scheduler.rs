//! Job Queue
//!
//! Batches effect re-runs. A queued effect scheduler pushes a job keyed by
//! the effect's id instead of running it; repeated triggers before the next
//! flush collapse into a single job. [`JobQueue::flush`] drains the queue in
//! enqueue order, including jobs queued by jobs that are already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use super::id::EffectId;

/// A deferred unit of work.
pub type Job = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct JobQueue {
    pending: Mutex<IndexMap<EffectId, Job>>,
    flushing: AtomicBool,
}

/// Clears the flushing flag even if a job panics.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a job. Returns `false` if a job with this id is already pending.
    pub(crate) fn enqueue(&self, id: EffectId, job: Job) -> bool {
        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            return false;
        }
        pending.insert(id, job);
        true
    }

    /// Run pending jobs until the queue is empty.
    ///
    /// A flush started from inside a running job returns 0 immediately; the
    /// outer flush picks up anything queued meanwhile.
    pub(crate) fn flush(&self) -> usize {
        if self.flushing.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let _guard = FlushGuard(&self.flushing);

        let mut ran = 0;
        loop {
            // Release the lock before running so jobs can enqueue more work.
            let next = self.pending.lock().shift_remove_index(0);
            let Some((_, job)) = next else {
                break;
            };
            job();
            ran += 1;
        }

        if ran > 0 {
            debug!(jobs = ran, "flushed job queue");
        }
        ran
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.pending.lock().clear();
    }
}
