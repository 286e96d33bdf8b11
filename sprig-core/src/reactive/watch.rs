//! Watchers
//!
//! A watcher runs a callback with the new and previous value of a source
//! whenever the source's dependencies change.
//!
//! # Sources
//!
//! - [`Runtime::watch`] takes a getter; whatever the getter reads is tracked.
//! - [`Runtime::watch_deep`] takes a handle and reads every field of every
//!   nested container, so any change anywhere below it fires the callback.
//!
//! # Flush Timing
//!
//! With [`Flush::Sync`] the callback runs inside the write that triggered
//! it. With [`Flush::Post`] the watcher is queued on the runtime's job queue
//! and runs at the next [`Runtime::flush_jobs`]; several writes before the
//! flush produce one callback.
//!
//! # Invalidation
//!
//! The callback receives an [`OnInvalidate`]. A cleanup registered there runs
//! right before the next callback, and [`OnInvalidate::token`] hands out a
//! [`CancelToken`] that expires at the same moment. Asynchronous work started
//! by a callback checks the token before applying its result, so a slow
//! response from a stale run never overwrites a newer one.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::effect::{Effect, EffectOptions, EffectRef};
use super::handle::{Item, Reactive};
use super::id::SubjectId;
use super::runtime::Runtime;

/// When a triggered watcher runs its callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flush {
    /// Inside the triggering write.
    #[default]
    Sync,
    /// At the next job-queue flush.
    Post,
}

/// Watcher configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Run the callback once at registration, with no previous value.
    pub immediate: bool,
    pub flush: Flush,
}

impl WatchOptions {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    pub fn post() -> Self {
        Self {
            flush: Flush::Post,
            ..Self::default()
        }
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }
}

/// Cooperative cancellation flag shared with in-flight work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    expired: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    pub fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// Registrar handed to a watch callback.
pub struct OnInvalidate {
    cleanup: Arc<Mutex<Option<Cleanup>>>,
    token: CancelToken,
}

impl OnInvalidate {
    /// Run `f` before the next callback, or when the watcher stops.
    ///
    /// Registering again replaces the previous cleanup.
    pub fn register<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.cleanup.lock() = Some(Box::new(f));
    }

    /// Token for this run, expired when the next run starts.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl fmt::Debug for OnInvalidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnInvalidate")
            .field("expired", &self.token.is_expired())
            .finish()
    }
}

type Callback<T> = Box<dyn Fn(&T, Option<&T>, &OnInvalidate) + Send + Sync>;

struct Watcher<T> {
    /// Written by the effect, taken by the job.
    latest: Mutex<Option<T>>,
    old: Mutex<Option<T>>,
    cleanup: Arc<Mutex<Option<Cleanup>>>,
    token: Mutex<CancelToken>,
    callback: Callback<T>,
}

impl<T: Send + 'static> Watcher<T> {
    fn job(&self, effect: &EffectRef) {
        effect.run();
        let Some(new) = self.latest.lock().take() else {
            return;
        };

        self.invalidate();
        let token = CancelToken::new();
        *self.token.lock() = token.clone();

        let old = self.old.lock().take();
        let on_invalidate = OnInvalidate {
            cleanup: Arc::clone(&self.cleanup),
            token,
        };
        (self.callback)(&new, old.as_ref(), &on_invalidate);
        *self.old.lock() = Some(new);
    }

    /// Expire the current token and run the pending cleanup.
    fn invalidate(&self) {
        self.token.lock().expire();
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

/// Handle returned by [`Runtime::watch`].
///
/// Dropping the handle does not stop the watcher.
pub struct WatchHandle {
    effect: Effect<()>,
    on_stop: Box<dyn Fn() + Send + Sync>,
}

impl WatchHandle {
    /// Stop watching and run any pending cleanup.
    pub fn stop(&self) {
        if self.effect.is_stopped() {
            return;
        }
        self.effect.stop();
        (self.on_stop)();
    }

    pub fn is_stopped(&self) -> bool {
        self.effect.is_stopped()
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("effect", &self.effect.id())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Runtime {
    /// Watch a getter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use parking_lot::Mutex;
    /// use sprig_core::reactive::{RawObject, Runtime, Value, WatchOptions};
    ///
    /// let rt = Runtime::new();
    /// let state = rt.reactive(&RawObject::record([("n", Value::from(1))])).into_record().unwrap();
    /// let log = Arc::new(Mutex::new(Vec::new()));
    ///
    /// let reader = state.clone();
    /// let sink = log.clone();
    /// let _handle = rt.watch(
    ///     move || reader.get("n").as_f64(),
    ///     move |new, old, _| sink.lock().push((*new, old.copied().flatten())),
    ///     WatchOptions::default(),
    /// );
    ///
    /// state.set("n", 2).unwrap();
    /// assert_eq!(*log.lock(), vec![(Some(2.0), Some(1.0))]);
    /// ```
    pub fn watch<T, G, C>(&self, getter: G, callback: C, options: WatchOptions) -> WatchHandle
    where
        T: Send + Sync + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        C: Fn(&T, Option<&T>, &OnInvalidate) + Send + Sync + 'static,
    {
        let watcher = Arc::new(Watcher {
            latest: Mutex::new(None),
            old: Mutex::new(None),
            cleanup: Arc::new(Mutex::new(None)),
            token: Mutex::new(CancelToken::new()),
            callback: Box::new(callback),
        });

        let sink = Arc::clone(&watcher);
        let work = move || {
            let value = getter();
            *sink.latest.lock() = Some(value);
        };

        let job_watcher = Arc::clone(&watcher);
        let weak_rt = self.downgrade();
        let flush = options.flush;
        let scheduler = move |effect: EffectRef| match flush {
            Flush::Sync => job_watcher.job(&effect),
            Flush::Post => {
                if let Some(inner) = weak_rt.upgrade() {
                    let watcher = Arc::clone(&job_watcher);
                    let id = effect.id();
                    inner
                        .jobs
                        .enqueue(id, Arc::new(move || watcher.job(&effect)));
                }
            }
        };

        let effect = Effect::register(
            self,
            work,
            EffectOptions::lazy().with_scheduler(scheduler),
        );
        let effect_ref = EffectRef(effect.as_computation());

        if options.immediate {
            watcher.job(&effect_ref);
        } else {
            effect.run();
            let initial = watcher.latest.lock().take();
            *watcher.old.lock() = initial;
        }

        let stopped = Arc::clone(&watcher);
        WatchHandle {
            effect,
            on_stop: Box::new(move || stopped.invalidate()),
        }
    }

    /// Watch every nested field of a handle.
    ///
    /// The callback receives the handle itself as both the new and the old
    /// value.
    pub fn watch_deep<C>(&self, source: &Reactive, callback: C, options: WatchOptions) -> WatchHandle
    where
        C: Fn(&Reactive, Option<&Reactive>, &OnInvalidate) + Send + Sync + 'static,
    {
        let source = source.clone();
        self.watch(
            move || {
                traverse(&source);
                source.clone()
            },
            callback,
            options,
        )
    }
}

/// Read every field of `source` and everything below it.
pub fn traverse(source: &Reactive) {
    traverse_inner(source, &mut HashSet::new());
}

fn traverse_inner(source: &Reactive, seen: &mut HashSet<SubjectId>) {
    if !seen.insert(source.id()) {
        return;
    }

    let children: Vec<Item> = match source {
        Reactive::Record(record) => record.entries().into_iter().map(|(_, v)| v).collect(),
        Reactive::List(list) => list.to_vec(),
        Reactive::Map(map) => map
            .entries()
            .into_iter()
            .flat_map(|(k, v)| [k, v])
            .collect(),
        Reactive::Set(set) => set.values(),
    };

    for child in children {
        if let Item::Reactive(nested) = child {
            traverse_inner(&nested, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{RawObject, ReactiveRecord, Value};
    use std::sync::atomic::AtomicUsize;

    fn counter_state(rt: &Runtime) -> ReactiveRecord {
        rt.reactive(&RawObject::record([("n", Value::from(0))]))
            .into_record()
            .unwrap()
    }

    fn n_of(record: &ReactiveRecord) -> f64 {
        record.get("n").as_f64().unwrap_or_default()
    }

    #[test]
    fn sync_watch_reports_new_and_old() {
        let rt = Runtime::new();
        let state = counter_state(&rt);
        let log = Arc::new(Mutex::new(Vec::new()));

        let reader = state.clone();
        let sink = log.clone();
        let _handle = rt.watch(
            move || n_of(&reader),
            move |new, old, _| sink.lock().push((*new, old.copied())),
            WatchOptions::default(),
        );
        assert!(log.lock().is_empty());

        state.set("n", 1).unwrap();
        state.set("n", 2).unwrap();
        assert_eq!(*log.lock(), vec![(1.0, Some(0.0)), (2.0, Some(1.0))]);
    }

    #[test]
    fn immediate_fires_with_no_old_value() {
        let rt = Runtime::new();
        let state = counter_state(&rt);
        let log = Arc::new(Mutex::new(Vec::new()));

        let reader = state.clone();
        let sink = log.clone();
        let _handle = rt.watch(
            move || n_of(&reader),
            move |new, old, _| sink.lock().push((*new, old.copied())),
            WatchOptions::immediate(),
        );
        assert_eq!(*log.lock(), vec![(0.0, None)]);

        state.set("n", 3).unwrap();
        assert_eq!(log.lock().last().copied(), Some((3.0, Some(0.0))));
    }

    #[test]
    fn post_flush_batches_until_flush() {
        let rt = Runtime::new();
        let state = counter_state(&rt);
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let calls_clone = calls.clone();
        let _handle = rt.watch(
            move || n_of(&reader),
            move |_, _, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::post(),
        );

        state.set("n", 1).unwrap();
        state.set("n", 2).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(rt.pending_jobs(), 1);

        assert_eq!(rt.flush_jobs(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_runs_before_next_callback() {
        let rt = Runtime::new();
        let state = counter_state(&rt);
        let tokens = Arc::new(Mutex::new(Vec::<CancelToken>::new()));
        let cleanups = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let token_sink = tokens.clone();
        let cleanup_count = cleanups.clone();
        let handle = rt.watch(
            move || n_of(&reader),
            move |_, _, on_invalidate| {
                token_sink.lock().push(on_invalidate.token());
                let count = cleanup_count.clone();
                on_invalidate.register(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                });
            },
            WatchOptions::default(),
        );

        state.set("n", 1).unwrap();
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        state.set("n", 2).unwrap();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        {
            let tokens = tokens.lock();
            assert!(tokens[0].is_expired());
            assert!(!tokens[1].is_expired());
        }

        handle.stop();
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
        assert!(tokens.lock()[1].is_expired());

        state.set("n", 3).unwrap();
        assert_eq!(tokens.lock().len(), 2);
    }

    #[test]
    fn deep_watch_sees_nested_writes() {
        let rt = Runtime::new();
        let raw = RawObject::record([(
            "todos",
            Value::from(RawObject::list([Value::from(RawObject::record([(
                "done",
                Value::from(false),
            )]))])),
        )]);
        let root = rt.reactive(&raw);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let _handle = rt.watch_deep(
            &root,
            move |new, old, _| {
                assert!(old.is_some_and(|old| old.ptr_eq(new)));
                calls_clone.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::default(),
        );

        let todo = root
            .as_record()
            .and_then(|r| r.get("todos").as_list().map(|l| l.get(0)))
            .and_then(|item| item.as_record().cloned())
            .unwrap();
        todo.set("done", true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn traverse_survives_cycles() {
        let rt = Runtime::new();
        let raw = RawObject::record(Vec::<(String, Value)>::new());
        raw.fields().write().insert("me".into(), Value::from(raw.clone()));

        let root = rt.reactive(&raw);
        let reads = Arc::new(AtomicUsize::new(0));
        let source = root.clone();
        let reads_clone = reads.clone();
        let _effect = rt.effect(move || {
            traverse(&source);
            reads_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn options_load_from_json() {
        let options: WatchOptions = serde_json::from_str(r#"{ "flush": "post" }"#).unwrap();
        assert_eq!(options, WatchOptions::post());
    }
}
