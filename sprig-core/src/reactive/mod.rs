//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: wrapped
//! containers, effects, derived values and watchers.
//!
//! # Concepts
//!
//! ## Subjects
//!
//! A subject is a raw container ([`RawObject`]) seen through a handle
//! ([`Reactive`]). Reading a field through a handle inside a running
//! computation subscribes that computation to the field. Writing through a
//! handle re-runs every subscribed computation.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation whose reads are tracked. It re-runs when any
//! of them change, or hands itself to a scheduler that decides when.
//!
//! ## Computed
//!
//! A [`Computed`] is a cached derived value. It recomputes lazily, on the
//! first read after a dependency changed.
//!
//! ## Watchers
//!
//! [`Runtime::watch`] calls back with the new and previous value of a getter,
//! synchronously or at the next job flush.
//!
//! # Implementation Notes
//!
//! All state lives in an explicit [`Runtime`]: the dependency store, the
//! stack of running computations, the handle cache and the job queue.
//! Separate runtimes never observe each other.
//!
//! Dependencies are collected dynamically. Every run of a computation starts
//! by forgetting the previous run's dependencies, so a conditional read that
//! is no longer taken stops waking the computation.

mod collection;
mod computed;
mod context;
mod dep;
mod effect;
mod handle;
mod id;
mod list;
mod record;
mod refs;
mod runtime;
mod scheduler;
mod value;
mod watch;

pub use collection::{ReactiveMap, ReactiveSet};
pub use computed::Computed;
pub use context::TrackingPause;
pub use dep::{DepKey, TriggerOp};
pub use effect::{Effect, EffectOptions, EffectRef, Scheduler};
pub use handle::{is_reactive, is_readonly, Access, Depth, Item, Keyed, Mode, Reactive, Subject};
pub use id::{EffectId, SubjectId};
pub use list::ReactiveList;
pub use record::ReactiveRecord;
pub use refs::{to_ref, to_refs, FieldRef, Ref, RefLike};
pub use runtime::Runtime;
pub use scheduler::Job;
pub use value::{RawBody, RawObject, SubjectKind, Value};
pub use watch::{traverse, CancelToken, Flush, OnInvalidate, WatchHandle, WatchOptions};
