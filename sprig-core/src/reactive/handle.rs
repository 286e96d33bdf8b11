//! Reactive Handles
//!
//! A handle wraps a [`RawObject`] so that reads are tracked and writes
//! trigger. There is one concrete wrapper per container shape
//! ([`ReactiveRecord`], [`ReactiveList`], [`ReactiveMap`], [`ReactiveSet`]),
//! unified by the [`Reactive`] enum and the [`Subject`] trait.
//!
//! # Modes
//!
//! Every handle carries a [`Mode`]: deep or shallow, mutable or read-only.
//!
//! - Deep handles return nested containers wrapped in the same access mode,
//!   built on demand when the field is read.
//! - Shallow handles return nested containers raw.
//! - Read-only handles do not track reads, and refuse writes with
//!   [`ReactiveError::ReadOnlyViolation`].
//!
//! # Identity
//!
//! The runtime caches handles by `(raw, mode)`. Reading the same nested
//! container twice yields the same handle, so membership tests against
//! previously read items behave as expected.
//!
//! # Contamination
//!
//! Writes accept an [`Item`] and always store its raw form. A handle is never
//! stored inside raw backing storage.
//!
//! [`ReactiveRecord`]: super::ReactiveRecord
//! [`ReactiveList`]: super::ReactiveList
//! [`ReactiveMap`]: super::ReactiveMap
//! [`ReactiveSet`]: super::ReactiveSet

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::collection::{ReactiveMap, ReactiveSet};
use super::dep::{DepKey, TriggerOp};
use super::id::SubjectId;
use super::list::ReactiveList;
use super::record::ReactiveRecord;
use super::runtime::Runtime;
use super::value::{RawObject, SubjectKind, Value};
use crate::error::ReactiveError;

/// Whether nested containers are wrapped on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    Deep,
    Shallow,
}

/// Whether writes are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Mutable,
    ReadOnly,
}

/// The wrapping mode of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    pub depth: Depth,
    pub access: Access,
}

impl Mode {
    pub const REACTIVE: Mode = Mode {
        depth: Depth::Deep,
        access: Access::Mutable,
    };
    pub const SHALLOW_REACTIVE: Mode = Mode {
        depth: Depth::Shallow,
        access: Access::Mutable,
    };
    pub const READONLY: Mode = Mode {
        depth: Depth::Deep,
        access: Access::ReadOnly,
    };
    pub const SHALLOW_READONLY: Mode = Mode {
        depth: Depth::Shallow,
        access: Access::ReadOnly,
    };

    pub fn is_shallow(self) -> bool {
        self.depth == Depth::Shallow
    }

    pub fn is_readonly(self) -> bool {
        self.access == Access::ReadOnly
    }
}

/// Shared state behind every handle.
pub(crate) struct Target {
    pub(crate) raw: RawObject,
    pub(crate) mode: Mode,
    pub(crate) rt: Runtime,
}

impl Target {
    pub(crate) fn new(raw: RawObject, mode: Mode, rt: Runtime) -> Self {
        Self { raw, mode, rt }
    }

    pub(crate) fn id(&self) -> SubjectId {
        self.raw.id()
    }

    /// Track a read. Read-only handles never track.
    pub(crate) fn track(&self, key: DepKey) {
        if !self.mode.is_readonly() {
            self.rt.track(self.raw.id(), key);
        }
    }

    pub(crate) fn trigger(&self, key: DepKey, op: TriggerOp, new_len: Option<usize>) {
        self.rt
            .trigger(self.raw.id(), self.raw.kind(), key, op, new_len);
    }

    /// Refuse writes through read-only handles.
    pub(crate) fn guard_write(
        &self,
        op: &'static str,
        key: impl fmt::Debug,
    ) -> Result<(), ReactiveError> {
        if !self.mode.is_readonly() {
            return Ok(());
        }
        let key = format!("{key:?}");
        warn!(subject = self.raw.id().raw(), op, key = %key, "write to read-only subject ignored");
        Err(ReactiveError::ReadOnlyViolation { op, key })
    }

    /// Wrap a value read from the raw container according to the mode.
    pub(crate) fn wrap_read(&self, value: Value) -> Item {
        match value {
            Value::Object(raw) if !self.mode.is_shallow() => {
                let mode = Mode {
                    depth: Depth::Deep,
                    access: self.mode.access,
                };
                Item::Reactive(self.rt.wrap(&raw, mode))
            }
            value => Item::Value(value),
        }
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        self.rt
            .inner()
            .cache
            .remove_if(&(self.raw.id(), self.mode), |_, weak| weak.strong_count() == 0);
    }
}

/// Operations shared by every wrapper shape.
pub trait Subject {
    /// How entries are addressed.
    type Key;

    /// The wrapped container. Reading through it bypasses tracking.
    fn raw(&self) -> &RawObject;

    fn mode(&self) -> Mode;

    fn id(&self) -> SubjectId {
        self.raw().id()
    }

    /// Tracked membership test.
    fn has(&self, key: &Self::Key) -> bool;

    /// Tracked enumeration of keys.
    fn keys(&self) -> Vec<Self::Key>;

    /// Remove an entry. Returns whether it existed.
    fn delete(&self, key: &Self::Key) -> Result<bool, ReactiveError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Subjects whose entries can be read and written by key.
pub trait Keyed: Subject {
    fn get(&self, key: &Self::Key) -> Item;

    fn set(&self, key: Self::Key, value: Item) -> Result<(), ReactiveError>;
}

/// Any wrapped container.
#[derive(Clone)]
pub enum Reactive {
    Record(ReactiveRecord),
    List(ReactiveList),
    Map(ReactiveMap),
    Set(ReactiveSet),
}

impl Reactive {
    pub(crate) fn from_target(target: Arc<Target>) -> Self {
        match target.raw.kind() {
            SubjectKind::Record => Reactive::Record(ReactiveRecord { target }),
            SubjectKind::List => Reactive::List(ReactiveList { target }),
            SubjectKind::Map => Reactive::Map(ReactiveMap { target }),
            SubjectKind::Set => Reactive::Set(ReactiveSet { target }),
        }
    }

    fn target(&self) -> &Arc<Target> {
        match self {
            Reactive::Record(r) => &r.target,
            Reactive::List(l) => &l.target,
            Reactive::Map(m) => &m.target,
            Reactive::Set(s) => &s.target,
        }
    }

    /// The wrapped container.
    pub fn raw(&self) -> &RawObject {
        &self.target().raw
    }

    pub fn id(&self) -> SubjectId {
        self.target().id()
    }

    pub fn mode(&self) -> Mode {
        self.target().mode
    }

    pub fn kind(&self) -> SubjectKind {
        self.target().raw.kind()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.target().rt
    }

    pub fn is_readonly(&self) -> bool {
        self.mode().is_readonly()
    }

    pub fn is_shallow(&self) -> bool {
        self.mode().is_shallow()
    }

    /// Whether both handles are the same handle.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Arc::ptr_eq(self.target(), other.target())
    }

    pub fn into_record(self) -> Option<ReactiveRecord> {
        match self {
            Reactive::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<ReactiveList> {
        match self {
            Reactive::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<ReactiveMap> {
        match self {
            Reactive::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<ReactiveSet> {
        match self {
            Reactive::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ReactiveRecord> {
        match self {
            Reactive::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ReactiveList> {
        match self {
            Reactive::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ReactiveMap> {
        match self {
            Reactive::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ReactiveSet> {
        match self {
            Reactive::Set(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id().raw())
            .field("kind", &self.kind())
            .field("mode", &self.mode())
            .finish()
    }
}

macro_rules! reactive_from {
    ($($wrapper:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$wrapper> for Reactive {
                fn from(handle: $wrapper) -> Self {
                    Reactive::$variant(handle)
                }
            }

            impl From<$wrapper> for Item {
                fn from(handle: $wrapper) -> Self {
                    Item::Reactive(Reactive::$variant(handle))
                }
            }

            impl fmt::Debug for $wrapper {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($wrapper))
                        .field("id", &self.target.id().raw())
                        .field("mode", &self.target.mode)
                        .finish()
                }
            }
        )*
    };
}

reactive_from!(
    ReactiveRecord => Record,
    ReactiveList => List,
    ReactiveMap => Map,
    ReactiveSet => Set,
);

/// A value read through a handle: either plain, or a nested handle.
#[derive(Debug, Clone)]
pub enum Item {
    Value(Value),
    Reactive(Reactive),
}

impl Item {
    /// The raw form, suitable for storing in backing storage.
    pub fn into_raw(self) -> Value {
        match self {
            Item::Value(value) => value,
            Item::Reactive(handle) => Value::Object(handle.raw().clone()),
        }
    }

    pub fn to_raw(&self) -> Value {
        self.clone().into_raw()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(value) => Some(value),
            Item::Reactive(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Item::Reactive(handle) => Some(handle),
            Item::Value(_) => None,
        }
    }

    pub fn into_reactive(self) -> Option<Reactive> {
        match self {
            Item::Reactive(handle) => Some(handle),
            Item::Value(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&ReactiveRecord> {
        self.as_reactive().and_then(Reactive::as_record)
    }

    pub fn as_list(&self) -> Option<&ReactiveList> {
        self.as_reactive().and_then(Reactive::as_list)
    }

    pub fn as_map(&self) -> Option<&ReactiveMap> {
        self.as_reactive().and_then(Reactive::as_map)
    }

    pub fn as_set(&self) -> Option<&ReactiveSet> {
        self.as_reactive().and_then(Reactive::as_set)
    }
}

/// Handles compare by identity, plain values by SameValueZero. A handle
/// never equals a plain value, even the raw container it wraps.
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Item::Value(a), Item::Value(b)) => a == b,
            (Item::Reactive(a), Item::Reactive(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Default for Item {
    fn default() -> Self {
        Item::Value(Value::Null)
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Item::Value(value)
    }
}

impl From<Reactive> for Item {
    fn from(handle: Reactive) -> Self {
        Item::Reactive(handle)
    }
}

impl From<RawObject> for Item {
    fn from(raw: RawObject) -> Self {
        Item::Value(Value::Object(raw))
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Item::Value(Value::Bool(b))
    }
}

impl From<f64> for Item {
    fn from(n: f64) -> Self {
        Item::Value(Value::Number(n))
    }
}

impl From<i32> for Item {
    fn from(n: i32) -> Self {
        Item::Value(Value::from(n))
    }
}

impl From<usize> for Item {
    fn from(n: usize) -> Self {
        Item::Value(Value::from(n))
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Value(Value::from(s))
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::Value(Value::String(s))
    }
}

/// Whether an item is a reactive handle.
pub fn is_reactive(item: &Item) -> bool {
    matches!(item, Item::Reactive(_))
}

/// Whether an item is a read-only handle.
pub fn is_readonly(item: &Item) -> bool {
    matches!(item, Item::Reactive(handle) if handle.is_readonly())
}
