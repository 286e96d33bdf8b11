//! Derived Values
//!
//! A `Computed<T>` wraps a getter in a lazy effect and caches its result.
//!
//! # Caching Strategy
//!
//! The value starts dirty and the getter does not run until the first
//! [`Computed::get`]. A dependency change does not recompute anything: the
//! effect's scheduler only marks the value dirty and, on the clean → dirty
//! transition, notifies readers of the derived value. The next `get`
//! recomputes.
//!
//! Several dependency changes between two reads therefore cause one
//! notification and one recomputation.
//!
//! # Readers
//!
//! Every `get` tracks a synthetic `value` slot on the derived value's own
//! identity, so an effect that reads a derived value re-runs when it goes
//! dirty, whether or not that particular read recomputed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::dep::{DepKey, TriggerOp};
use super::effect::{Effect, EffectOptions, EffectRef};
use super::id::SubjectId;
use super::runtime::Runtime;
use super::value::SubjectKind;

const VALUE_KEY: &str = "value";

fn value_key() -> DepKey {
    DepKey::Field(VALUE_KEY.to_owned())
}

struct ComputedState<T> {
    id: SubjectId,
    dirty: AtomicBool,
    cached: Mutex<Option<T>>,
}

/// A lazily evaluated, cached derived value.
///
/// # Example
///
/// ```rust
/// use sprig_core::reactive::{RawObject, Runtime, Value};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(&RawObject::record([("n", Value::from(2))])).into_record().unwrap();
///
/// let reader = state.clone();
/// let doubled = rt.computed(move || reader.get("n").as_f64().unwrap_or_default() * 2.0);
/// assert_eq!(doubled.get(), 4.0);
///
/// state.set("n", 5).unwrap();
/// assert!(doubled.is_dirty());
/// assert_eq!(doubled.get(), 10.0);
/// ```
pub struct Computed<T: 'static> {
    state: Arc<ComputedState<T>>,
    effect: Effect<T>,
    rt: Runtime,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let state = Arc::new(ComputedState {
            id: SubjectId::new(),
            dirty: AtomicBool::new(true),
            cached: Mutex::new(None),
        });

        let weak_rt = runtime.downgrade();
        let sched_state = Arc::clone(&state);
        let options = EffectOptions::lazy().with_scheduler(move |_: EffectRef| {
            if sched_state.dirty.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = weak_rt.upgrade() {
                Runtime::from_inner(inner).trigger(
                    sched_state.id,
                    SubjectKind::Record,
                    value_key(),
                    TriggerOp::Set,
                    None,
                );
            }
        });

        Self {
            state,
            effect: Effect::register(runtime, getter, options),
            rt: runtime.clone(),
        }
    }

    /// Read the value, recomputing if a dependency changed since last time.
    pub fn get(&self) -> T {
        if self.state.dirty.load(Ordering::SeqCst) {
            return self.refresh();
        }
        self.rt.track(self.state.id, value_key());

        let cached = self.state.cached.lock().clone();
        match cached {
            Some(value) => value,
            None => self.refresh(),
        }
    }

    fn refresh(&self) -> T {
        let value = self.effect.run();
        *self.state.cached.lock() = Some(value.clone());
        // A stopped getter hears no writes, so it must stay dirty.
        if !self.effect.is_stopped() {
            self.state.dirty.store(false, Ordering::SeqCst);
        }
        self.rt.track(self.state.id, value_key());
        value
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty.load(Ordering::SeqCst)
    }

    /// Identity of the synthetic subject readers subscribe to.
    pub fn id(&self) -> SubjectId {
        self.state.id
    }

    /// Stop following dependencies. Later reads recompute every time.
    pub fn stop(&self) {
        self.effect.stop();
        self.state.dirty.store(true, Ordering::SeqCst);
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            effect: self.effect.clone(),
            rt: self.rt.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.state.id.raw())
            .field("dirty", &self.state.dirty.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{RawObject, ReactiveRecord, Value};
    use std::sync::atomic::AtomicUsize;

    fn state(rt: &Runtime) -> ReactiveRecord {
        rt.reactive(&RawObject::record([
            ("a", Value::from(1)),
            ("b", Value::from(2)),
        ]))
        .into_record()
        .unwrap()
    }

    fn sum(record: &ReactiveRecord) -> f64 {
        record.get("a").as_f64().unwrap_or_default() + record.get("b").as_f64().unwrap_or_default()
    }

    #[test]
    fn getter_waits_for_first_read() {
        let rt = Runtime::new();
        let s = state(&rt);
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = s.clone();
        let calls_clone = calls.clone();
        let total = rt.computed(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            sum(&reader)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(total.get(), 3.0);
        assert_eq!(total.get(), 3.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        s.set("a", 10).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(total.get(), 12.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_write_keeps_cache() {
        let rt = Runtime::new();
        let s = state(&rt);
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = s.clone();
        let calls_clone = calls.clone();
        let total = rt.computed(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            sum(&reader)
        });
        total.get();

        s.set("a", 1).unwrap();
        assert!(!total.is_dirty());
        total.get();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn readers_are_notified_once_per_dirty_transition() {
        let rt = Runtime::new();
        let s = state(&rt);

        let reader = s.clone();
        let total = rt.computed(move || sum(&reader));

        let runs = Arc::new(AtomicUsize::new(0));
        let observed = total.clone();
        let runs_clone = runs.clone();
        let _effect = rt.effect(move || {
            observed.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The effect re-reads, so the value is clean again after each write.
        s.set("a", 5).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        s.set("b", 5).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(total.get(), 10.0);
    }

    #[test]
    fn several_writes_before_read_mark_dirty_once() {
        let rt = Runtime::new();
        let s = state(&rt);

        let reader = s.clone();
        let total = rt.computed(move || sum(&reader));
        total.get();

        let notified = Arc::new(AtomicUsize::new(0));
        let observed = total.clone();
        let notified_clone = notified.clone();
        // Subscribes without re-reading on trigger.
        let _effect = rt.effect_with(
            move || {
                observed.get();
            },
            EffectOptions::default().with_scheduler(move |_| {
                notified_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        s.set("a", 7).unwrap();
        s.set("b", 7).unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(total.get(), 14.0);
    }

    #[test]
    fn computed_of_computed() {
        let rt = Runtime::new();
        let s = state(&rt);

        let reader = s.clone();
        let total = rt.computed(move || sum(&reader));
        let inner = total.clone();
        let doubled = rt.computed(move || inner.get() * 2.0);

        assert_eq!(doubled.get(), 6.0);
        s.set("b", 4).unwrap();
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10.0);
    }

    #[test]
    fn stopped_computed_recomputes_on_every_read() {
        let rt = Runtime::new();
        let s = state(&rt);
        let calls = Arc::new(AtomicUsize::new(0));

        let reader = s.clone();
        let calls_clone = calls.clone();
        let total = rt.computed(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            sum(&reader)
        });
        assert_eq!(total.get(), 3.0);

        total.stop();
        s.set("a", 5).unwrap();
        assert_eq!(total.get(), 7.0);
        assert_eq!(total.get(), 7.0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(total.is_dirty());
    }
}
