//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects subjects, effects,
//! derived values and watchers. It owns the dependency store, the stack of
//! running computations, the identity cache and the job queue.
//!
//! # How It Works
//!
//! 1. When a wrapped subject is read while a computation is running, the
//!    runtime records the `(subject, key)` slot against that computation
//!    ([`Runtime::track`]).
//!
//! 2. When a wrapped subject is written, the runtime collects every
//!    computation subscribed to the affected slots and runs it, or hands it
//!    to its scheduler ([`Runtime::trigger`]).
//!
//! 3. Computations unsubscribe from everything before each run, so the
//!    store only ever reflects reads from the most recent runs.
//!
//! # Isolation
//!
//! Every `Runtime` is an independent reactive universe: handles wrapped by
//! one runtime never wake computations registered with another. Cloning a
//! `Runtime` shares the same universe.
//!
//! # Threading
//!
//! The runtime is `Send + Sync` and guards its state with `parking_lot`
//! locks, but it models a single logical thread: the active-computation
//! stack is shared, so it should be driven from one thread at a time. No
//! lock is held while user code runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use super::computed::Computed;
use super::context::TrackingPause;
use super::dep::{DepKey, DepStore, TriggerOp};
use super::effect::{Computation, Effect, EffectOptions, EffectRef};
use super::handle::{Mode, Reactive, Target};
use super::id::{EffectId, SubjectId};
use super::scheduler::JobQueue;
use super::value::{RawObject, SubjectKind};

pub(crate) struct RuntimeInner {
    pub(crate) store: Mutex<DepStore>,
    pub(crate) stack: Mutex<Vec<Arc<dyn Computation>>>,
    pub(crate) tracking: AtomicBool,
    pub(crate) cache: DashMap<(SubjectId, Mode), Weak<Target>>,
    pub(crate) jobs: JobQueue,
}

/// Handle to a reactive universe.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a new, empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                store: Mutex::new(DepStore::default()),
                stack: Mutex::new(Vec::new()),
                tracking: AtomicBool::new(true),
                cache: DashMap::new(),
                jobs: JobQueue::new(),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<RuntimeInner>) -> Self {
        Self { inner }
    }

    /// Whether both handles refer to the same universe.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Wrapping
    // ------------------------------------------------------------------

    /// Wrap a raw container in the given mode.
    ///
    /// Wrapping the same container twice in the same mode returns the same
    /// handle for as long as any clone of the first handle is alive.
    pub fn wrap(&self, raw: &RawObject, mode: Mode) -> Reactive {
        let key = (raw.id(), mode);
        let cached = self.inner.cache.get(&key).and_then(|weak| weak.upgrade());

        let target = match cached {
            Some(target) => target,
            None => {
                let target = Arc::new(Target::new(raw.clone(), mode, self.clone()));
                self.inner.cache.insert(key, Arc::downgrade(&target));
                target
            }
        };
        Reactive::from_target(target)
    }

    /// Deep, mutable wrapper.
    pub fn reactive(&self, raw: &RawObject) -> Reactive {
        self.wrap(raw, Mode::REACTIVE)
    }

    /// Mutable wrapper whose nested containers are returned raw.
    pub fn shallow_reactive(&self, raw: &RawObject) -> Reactive {
        self.wrap(raw, Mode::SHALLOW_REACTIVE)
    }

    /// Deep, read-only wrapper. Reads are not tracked.
    pub fn readonly(&self, raw: &RawObject) -> Reactive {
        self.wrap(raw, Mode::READONLY)
    }

    /// Read-only wrapper whose nested containers are returned raw.
    pub fn shallow_readonly(&self, raw: &RawObject) -> Reactive {
        self.wrap(raw, Mode::SHALLOW_READONLY)
    }

    // ------------------------------------------------------------------
    // Computations
    // ------------------------------------------------------------------

    /// Register an effect that runs now and whenever its reads change.
    pub fn effect<T, F>(&self, work: F) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Effect::register(self, work, EffectOptions::default())
    }

    /// Register an effect with explicit options.
    pub fn effect_with<T, F>(&self, work: F, options: EffectOptions) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Effect::register(self, work, options)
    }

    /// Create a lazily evaluated, cached derived value.
    pub fn computed<T, F>(&self, getter: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::new(self, getter)
    }

    /// The currently running computation, if any.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.stack.lock().last().map(|c| c.id())
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Suspend tracking until the returned guard is dropped.
    pub fn pause_tracking(&self) -> TrackingPause<'_> {
        TrackingPause::new(&self.inner)
    }

    /// Run `f` without recording any dependencies.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = self.pause_tracking();
        f()
    }

    pub fn is_tracking_enabled(&self) -> bool {
        self.inner.tracking.load(Ordering::SeqCst)
    }

    /// Record that the running computation read `key` of `subject`.
    ///
    /// No-op when nothing is running or tracking is paused.
    pub fn track(&self, subject: SubjectId, key: DepKey) {
        if !self.is_tracking_enabled() {
            return;
        }
        let Some(active) = self.inner.stack.lock().last().cloned() else {
            return;
        };

        let added = self
            .inner
            .store
            .lock()
            .subscribe(subject, key.clone(), &active);
        if added {
            trace!(subject = subject.raw(), ?key, effect = active.id().raw(), "track");
            active.record_dependency(subject, key);
        }
    }

    /// Re-invoke every computation affected by a write.
    ///
    /// `new_len` is the new length when `key` is the length of a list.
    pub fn trigger(
        &self,
        subject: SubjectId,
        kind: SubjectKind,
        key: DepKey,
        op: TriggerOp,
        new_len: Option<usize>,
    ) {
        let active = self.active_effect();
        let effects = self
            .inner
            .store
            .lock()
            .collect(subject, kind, &key, op, new_len, active);

        if effects.is_empty() {
            return;
        }
        trace!(subject = subject.raw(), ?key, ?op, count = effects.len(), "trigger");

        for effect in effects {
            match effect.scheduler() {
                Some(scheduler) => scheduler(EffectRef(effect)),
                None => effect.execute(),
            }
        }
    }

    /// Number of computations subscribed to one slot.
    pub fn subscriber_count(&self, subject: SubjectId, key: &DepKey) -> usize {
        self.inner.store.lock().subscriber_count(subject, key)
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Queue a job keyed by an effect id. Returns `false` if already queued.
    pub fn queue_job<F>(&self, id: EffectId, job: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.jobs.enqueue(id, Arc::new(job))
    }

    /// Run every queued job in enqueue order. Returns how many ran.
    pub fn flush_jobs(&self) -> usize {
        self.inner.jobs.flush()
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.len()
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Drop every subscription recorded against a subject.
    ///
    /// Returns the number of subscriptions removed. Effects that read the
    /// subject keep their own bookkeeping and shed it on their next run.
    pub fn release(&self, subject: SubjectId) -> usize {
        self.inner.store.lock().release(subject)
    }

    /// Forget all subscriptions, queued jobs and cached handles.
    ///
    /// Effects capture handles that keep the runtime alive; disposing breaks
    /// those cycles.
    pub fn dispose(&self) {
        self.inner.store.lock().clear();
        self.inner.jobs.clear();
        self.inner.cache.clear();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("active", &self.active_effect())
            .field("cached_handles", &self.inner.cache.len())
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}
