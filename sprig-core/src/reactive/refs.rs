//! Refs
//!
//! A ref is a single reactive slot read and written through `value`.
//!
//! - [`Ref`] owns its slot: a one-field reactive record.
//! - [`FieldRef`] is a live view of one field of an existing record. Writes
//!   through the view and writes to the record are the same write.
//!
//! [`to_refs`] splits a record into one `FieldRef` per field, which lets a
//! caller hand out individual fields without losing reactivity.

use indexmap::IndexMap;

use super::handle::Item;
use super::record::ReactiveRecord;
use super::runtime::Runtime;
use super::value::RawObject;
use crate::error::ReactiveError;

const VALUE_FIELD: &str = "value";

/// Anything read and written through a single `value` slot.
pub trait RefLike {
    fn value(&self) -> Item;

    fn set_value(&self, value: Item) -> Result<(), ReactiveError>;
}

/// A standalone reactive slot.
#[derive(Debug, Clone)]
pub struct Ref {
    record: ReactiveRecord,
}

impl Ref {
    pub fn get(&self) -> Item {
        self.record.get(VALUE_FIELD)
    }

    pub fn set(&self, value: impl Into<Item>) -> Result<(), ReactiveError> {
        self.record.set(VALUE_FIELD, value)
    }

    /// The backing one-field record.
    pub fn as_record(&self) -> &ReactiveRecord {
        &self.record
    }
}

impl RefLike for Ref {
    fn value(&self) -> Item {
        self.get()
    }

    fn set_value(&self, value: Item) -> Result<(), ReactiveError> {
        self.set(value)
    }
}

/// A live view of one field of a record.
#[derive(Debug, Clone)]
pub struct FieldRef {
    record: ReactiveRecord,
    field: String,
}

impl FieldRef {
    pub fn get(&self) -> Item {
        self.record.get(&self.field)
    }

    pub fn set(&self, value: impl Into<Item>) -> Result<(), ReactiveError> {
        self.record.set(self.field.clone(), value)
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl RefLike for FieldRef {
    fn value(&self) -> Item {
        self.get()
    }

    fn set_value(&self, value: Item) -> Result<(), ReactiveError> {
        self.set(value)
    }
}

impl Runtime {
    /// Create a standalone reactive slot holding `value`.
    pub fn new_ref(&self, value: impl Into<Item>) -> Ref {
        let raw = RawObject::record([(VALUE_FIELD, value.into().into_raw())]);
        let record = match self.reactive(&raw).into_record() {
            Some(record) => record,
            None => unreachable!("a record wraps as a record"),
        };
        Ref { record }
    }
}

/// View one field of `record` as a ref.
pub fn to_ref(record: &ReactiveRecord, field: impl Into<String>) -> FieldRef {
    FieldRef {
        record: record.clone(),
        field: field.into(),
    }
}

/// View every current field of `record` as a ref.
pub fn to_refs(record: &ReactiveRecord) -> IndexMap<String, FieldRef> {
    record
        .keys()
        .into_iter()
        .map(|field| (field.clone(), to_ref(record, field)))
        .collect()
}
