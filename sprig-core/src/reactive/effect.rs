//! Effect Implementation
//!
//! An Effect is a computation whose reads are tracked and which is
//! re-invoked when something it read changes.
//!
//! # How Effects Work
//!
//! 1. Unless registered lazily, the effect runs its function immediately to
//!    establish initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs, or is handed to its
//!    scheduler if it has one.
//!
//! 3. Before every run the effect removes itself from every slot it was
//!    subscribed to, then tracks afresh. A read on an abandoned branch
//!    therefore never wakes the effect again.
//!
//! # Return Values
//!
//! `Effect<T>` returns whatever its function returns from [`Effect::run`].
//! Derived values and watchers are built on this: they register a lazy
//! effect and call `run` themselves to recompute.
//!
//! # Stopping
//!
//! [`Effect::stop`] drops every subscription. A stopped effect is never
//! triggered again; calling `run` on it evaluates the function untracked.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::debug;

use super::context::ReactiveContext;
use super::dep::DepKey;
use super::id::{EffectId, SubjectId};
use super::runtime::{Runtime, RuntimeInner};

/// Callback deciding when a triggered effect actually runs.
///
/// Receives the effect; calling [`EffectRef::run`] runs it.
pub type Scheduler = Arc<dyn Fn(EffectRef) + Send + Sync>;

/// Type-erased view of a computation, as stored in the dependency store.
pub(crate) trait Computation: Send + Sync {
    fn id(&self) -> EffectId;

    /// Re-run in response to a trigger.
    fn execute(self: Arc<Self>);

    fn scheduler(&self) -> Option<Scheduler>;

    /// Remember a slot so the next cleanup can unsubscribe from it.
    fn record_dependency(&self, subject: SubjectId, key: DepKey);
}

/// A triggered effect, as handed to a [`Scheduler`].
#[derive(Clone)]
pub struct EffectRef(pub(crate) Arc<dyn Computation>);

impl EffectRef {
    pub fn id(&self) -> EffectId {
        self.0.id()
    }

    /// Run the effect now, discarding its return value.
    pub fn run(&self) {
        Arc::clone(&self.0).execute();
    }
}

impl fmt::Debug for EffectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EffectRef").field(&self.id()).finish()
    }
}

/// Registration options for an effect.
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run. Dependencies are collected on first `run`.
    pub lazy: bool,
    /// Called instead of running the effect when it is triggered.
    pub scheduler: Option<Scheduler>,
}

impl EffectOptions {
    /// Options for a lazy effect.
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            scheduler: None,
        }
    }

    /// Options that batch re-runs through the runtime's job queue.
    ///
    /// A triggered effect is queued once, however often it is triggered,
    /// and runs at the next [`Runtime::flush_jobs`].
    pub fn queued(runtime: &Runtime) -> Self {
        let weak = runtime.downgrade();
        Self {
            lazy: false,
            scheduler: Some(Arc::new(move |effect: EffectRef| {
                if let Some(inner) = weak.upgrade() {
                    let id = effect.id();
                    inner.jobs.enqueue(id, Arc::new(move || effect.run()));
                }
            })),
        }
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(EffectRef) + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

struct EffectCore<T> {
    id: EffectId,
    work: Box<dyn Fn() -> T + Send + Sync>,
    scheduler: Option<Scheduler>,
    /// Slots this effect is subscribed to since its last run.
    deps: Mutex<SmallVec<[(SubjectId, DepKey); 4]>>,
    runtime: Weak<RuntimeInner>,
    stopped: AtomicBool,
    run_count: AtomicUsize,
}

impl<T: 'static> EffectCore<T> {
    fn run(self: &Arc<Self>) -> T {
        let runtime = match self.runtime.upgrade() {
            Some(runtime) if !self.stopped.load(Ordering::SeqCst) => runtime,
            _ => return (self.work)(),
        };

        self.cleanup(&runtime);

        let _ctx = ReactiveContext::enter(&runtime, Arc::clone(self) as Arc<dyn Computation>);
        self.run_count.fetch_add(1, Ordering::Relaxed);
        (self.work)()
    }

    /// Unsubscribe from every slot read during the previous run.
    fn cleanup(&self, runtime: &RuntimeInner) {
        let slots = std::mem::take(&mut *self.deps.lock());
        if !slots.is_empty() {
            runtime.store.lock().unsubscribe(self.id, slots);
        }
    }
}

impl<T: 'static> Computation for EffectCore<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn execute(self: Arc<Self>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let _ = EffectCore::run(&self);
    }

    fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.clone()
    }

    fn record_dependency(&self, subject: SubjectId, key: DepKey) {
        self.deps.lock().push((subject, key));
    }
}

/// A registered computation.
///
/// Cloning the handle shares the same underlying effect.
///
/// # Example
///
/// ```rust
/// use sprig_core::reactive::{RawObject, Runtime, Value};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(&RawObject::record([("count", Value::from(0))])).into_record().unwrap();
///
/// let reader = state.clone();
/// let effect = rt.effect(move || reader.get("count").as_f64());
/// assert_eq!(effect.run_count(), 1);
///
/// state.set("count", 5).unwrap();
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect<T: 'static> {
    core: Arc<EffectCore<T>>,
}

impl<T: 'static> Effect<T> {
    pub(crate) fn register<F>(runtime: &Runtime, work: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let effect = Self {
            core: Arc::new(EffectCore {
                id: EffectId::new(),
                work: Box::new(work),
                scheduler: options.scheduler,
                deps: Mutex::new(SmallVec::new()),
                runtime: runtime.downgrade(),
                stopped: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        };

        if !options.lazy {
            effect.run();
        }

        effect
    }

    pub fn id(&self) -> EffectId {
        self.core.id
    }

    /// Run the effect now and return its result.
    ///
    /// Clears the previous dependencies first and tracks new ones.
    pub fn run(&self) -> T {
        self.core.run()
    }

    /// Unsubscribe from everything and never trigger again.
    pub fn stop(&self) {
        if self.core.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(runtime) = self.core.runtime.upgrade() {
            self.core.cleanup(&runtime);
        }
        debug!(effect = self.core.id.raw(), "effect stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.core.stopped.load(Ordering::SeqCst)
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::Relaxed)
    }

    /// Number of slots read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.core.deps.lock().len()
    }

    pub(crate) fn as_computation(&self) -> Arc<dyn Computation> {
        Arc::clone(&self.core) as Arc<dyn Computation>
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.core.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
