//! Raw Values
//!
//! The reactive layer observes plain structured data. This module defines
//! that data: scalar [`Value`]s and shared, identity-bearing containers
//! ([`RawObject`]) holding records, lists, maps or sets.
//!
//! # Identity and Equality
//!
//! Two `Value::Object`s are equal only when they point at the same raw
//! container. Numbers compare with SameValueZero semantics: `NaN` equals
//! `NaN` and `-0.0` equals `0.0`. The same relation is used for map and set
//! membership and to decide whether a write actually changed anything, so a
//! write of `NaN` over `NaN` is never reported as a change.
//!
//! # Ownership
//!
//! A `RawObject` is a cheap handle (`Arc`) onto its backing storage. The
//! storage kind is fixed at construction; only the contents are mutable.
//! Writing through [`RawObject::body`] bypasses dependency tracking entirely.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use super::id::SubjectId;

/// A plain value stored inside a raw container.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent or empty. Reads of missing fields produce this.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A nested container, compared by identity.
    Object(RawObject),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            Value::Object(raw) => Some(raw),
            _ => None,
        }
    }

    /// Convert into JSON. Cycles and revisited containers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(&self, seen: &mut HashSet<SubjectId>) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Object(raw) => {
                if !seen.insert(raw.id()) {
                    return Json::Null;
                }
                let json = match raw.body() {
                    RawBody::Record(fields) => Json::Object(
                        fields
                            .read()
                            .iter()
                            .map(|(k, v)| (k.clone(), v.to_json_inner(seen)))
                            .collect(),
                    ),
                    RawBody::List(items) => Json::Array(
                        items.read().iter().map(|v| v.to_json_inner(seen)).collect(),
                    ),
                    RawBody::Map(entries) => Json::Array(
                        entries
                            .read()
                            .iter()
                            .map(|(k, v)| {
                                Json::Array(vec![k.to_json_inner(seen), v.to_json_inner(seen)])
                            })
                            .collect(),
                    ),
                    RawBody::Set(items) => Json::Array(
                        items.read().iter().map(|v| v.to_json_inner(seen)).collect(),
                    ),
                };
                seen.remove(&raw.id());
                json
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

// SameValueZero is reflexive, so `Eq` holds.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                let bits = if *n == 0.0 {
                    0u64
                } else if n.is_nan() {
                    f64::NAN.to_bits()
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => s.hash(state),
            Value::Object(raw) => raw.id().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(raw) => raw.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<RawObject> for Value {
    fn from(raw: RawObject) -> Self {
        Value::Object(raw)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Object(RawObject::list(items.into_iter().map(Value::from))),
            Json::Object(fields) => Value::Object(RawObject::record(
                fields.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

/// The shape of a raw container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// Named fields, enumerated in insertion order.
    Record,
    /// Dense index-addressed sequence with a `length`.
    List,
    /// Value-keyed associative collection.
    Map,
    /// Collection of unique values.
    Set,
}

/// Backing storage of a raw container. The variant never changes.
pub enum RawBody {
    Record(RwLock<IndexMap<String, Value>>),
    List(RwLock<Vec<Value>>),
    Map(RwLock<IndexMap<Value, Value>>),
    Set(RwLock<IndexSet<Value>>),
}

impl RawBody {
    pub fn kind(&self) -> SubjectKind {
        match self {
            RawBody::Record(_) => SubjectKind::Record,
            RawBody::List(_) => SubjectKind::List,
            RawBody::Map(_) => SubjectKind::Map,
            RawBody::Set(_) => SubjectKind::Set,
        }
    }
}

struct RawInner {
    id: SubjectId,
    body: RawBody,
}

/// A shared structured container.
///
/// Cloning the handle does not copy the contents; both clones refer to the
/// same container and compare equal.
#[derive(Clone)]
pub struct RawObject {
    inner: Arc<RawInner>,
}

impl RawObject {
    fn from_body(body: RawBody) -> Self {
        Self {
            inner: Arc::new(RawInner {
                id: SubjectId::new(),
                body,
            }),
        }
    }

    /// Create a record from `(field, value)` pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::from_body(RawBody::Record(RwLock::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Create a list.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::from_body(RawBody::List(RwLock::new(items.into_iter().collect())))
    }

    /// Create a map from `(key, value)` pairs.
    pub fn map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        Self::from_body(RawBody::Map(RwLock::new(entries.into_iter().collect())))
    }

    /// Create a set. Duplicate values collapse.
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::from_body(RawBody::Set(RwLock::new(items.into_iter().collect())))
    }

    pub fn id(&self) -> SubjectId {
        self.inner.id
    }

    pub fn kind(&self) -> SubjectKind {
        self.inner.body.kind()
    }

    /// Direct access to the backing storage, without tracking.
    pub fn body(&self) -> &RawBody {
        &self.inner.body
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &RawObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn fields(&self) -> &RwLock<IndexMap<String, Value>> {
        match &self.inner.body {
            RawBody::Record(fields) => fields,
            _ => unreachable!("record access on a {:?} subject", self.kind()),
        }
    }

    pub(crate) fn items(&self) -> &RwLock<Vec<Value>> {
        match &self.inner.body {
            RawBody::List(items) => items,
            _ => unreachable!("list access on a {:?} subject", self.kind()),
        }
    }

    pub(crate) fn entries(&self) -> &RwLock<IndexMap<Value, Value>> {
        match &self.inner.body {
            RawBody::Map(entries) => entries,
            _ => unreachable!("map access on a {:?} subject", self.kind()),
        }
    }

    pub(crate) fn members(&self) -> &RwLock<IndexSet<Value>> {
        match &self.inner.body {
            RawBody::Set(members) => members,
            _ => unreachable!("set access on a {:?} subject", self.kind()),
        }
    }
}

impl PartialEq for RawObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for RawObject {}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawObject")
            .field("id", &self.id().raw())
            .field("kind", &self.kind())
            .finish()
    }
}
