//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a subject is read,
//! the runtime registers the current computation as a dependent.
//!
//! # Implementation
//!
//! Each runtime keeps a stack of running computations. Entering a context
//! pushes the computation and force-enables tracking; the returned guard
//! pops it and restores the previous tracking flag when dropped.
//!
//! Because the pop happens in `Drop`, the stack is restored even when the
//! computation panics, so later unrelated work never sees a stale active
//! computation. Nested contexts (a derived value read inside an effect)
//! fall out of the stack discipline.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::effect::Computation;
use super::id::EffectId;
use super::runtime::RuntimeInner;

/// Guard that pops the context when dropped.
pub(crate) struct ReactiveContext<'a> {
    runtime: &'a RuntimeInner,
    id: EffectId,
    was_tracking: bool,
}

impl<'a> ReactiveContext<'a> {
    /// Enter a new reactive context for the given computation.
    pub(crate) fn enter(runtime: &'a RuntimeInner, computation: Arc<dyn Computation>) -> Self {
        let id = computation.id();
        runtime.stack.lock().push(computation);
        let was_tracking = runtime.tracking.swap(true, Ordering::SeqCst);

        Self {
            runtime,
            id,
            was_tracking,
        }
    }
}

impl Drop for ReactiveContext<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.stack.lock().pop();
        self.runtime
            .tracking
            .store(self.was_tracking, Ordering::SeqCst);

        // Verify we're popping the right context.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.id(),
                self.id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.id,
                entry.id()
            );
        }
    }
}

/// Guard returned by [`Runtime::pause_tracking`](super::Runtime::pause_tracking).
///
/// Restores the previous tracking flag when dropped.
#[must_use = "tracking resumes as soon as the guard is dropped"]
pub struct TrackingPause<'a> {
    runtime: &'a RuntimeInner,
    was_tracking: bool,
}

impl<'a> TrackingPause<'a> {
    pub(crate) fn new(runtime: &'a RuntimeInner) -> Self {
        let was_tracking = runtime.tracking.swap(false, Ordering::SeqCst);
        Self {
            runtime,
            was_tracking,
        }
    }
}

impl Drop for TrackingPause<'_> {
    fn drop(&mut self) {
        self.runtime
            .tracking
            .store(self.was_tracking, Ordering::SeqCst);
    }
}
