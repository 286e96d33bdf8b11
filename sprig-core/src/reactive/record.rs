//! Reactive records: named fields in insertion order.

use std::sync::Arc;

use super::dep::{DepKey, TriggerOp};
use super::handle::{Item, Keyed, Mode, Subject, Target};
use super::value::{RawObject, Value};
use crate::error::ReactiveError;

/// Handle onto a record.
#[derive(Clone)]
pub struct ReactiveRecord {
    pub(crate) target: Arc<Target>,
}

impl ReactiveRecord {
    /// Read a field. Missing fields read as null.
    pub fn get(&self, field: &str) -> Item {
        self.target.track(DepKey::Field(field.to_owned()));
        let value = self
            .target
            .raw
            .fields()
            .read()
            .get(field)
            .cloned()
            .unwrap_or_default();
        self.target.wrap_read(value)
    }

    /// Write a field.
    ///
    /// Triggers ADD for a new field, SET for a changed one, and nothing when
    /// the stored value is already equal.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Item>) -> Result<(), ReactiveError> {
        let field = field.into();
        self.target.guard_write("set", &field)?;

        let value = value.into().into_raw();
        let old = self
            .target
            .raw
            .fields()
            .write()
            .insert(field.clone(), value.clone());

        match old {
            None => self.target.trigger(DepKey::Field(field), TriggerOp::Add, None),
            Some(old) if old != value => {
                self.target.trigger(DepKey::Field(field), TriggerOp::Set, None)
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub fn has(&self, field: &str) -> bool {
        self.target.track(DepKey::Field(field.to_owned()));
        self.target.raw.fields().read().contains_key(field)
    }

    /// Field names in insertion order. Tracks enumeration.
    pub fn keys(&self) -> Vec<String> {
        self.target.track(DepKey::Iterate);
        self.target.raw.fields().read().keys().cloned().collect()
    }

    /// Remove a field, keeping the order of the rest.
    pub fn remove(&self, field: &str) -> Result<bool, ReactiveError> {
        self.target.guard_write("delete", field)?;

        let removed = self.target.raw.fields().write().shift_remove(field);
        if removed.is_some() {
            self.target
                .trigger(DepKey::Field(field.to_owned()), TriggerOp::Delete, None);
        }
        Ok(removed.is_some())
    }

    pub fn len(&self) -> usize {
        self.target.track(DepKey::Iterate);
        self.target.raw.fields().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every field with its value. Tracks enumeration and each field.
    pub fn entries(&self) -> Vec<(String, Item)> {
        self.keys()
            .into_iter()
            .map(|field| {
                let item = self.get(&field);
                (field, item)
            })
            .collect()
    }

    pub fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    pub fn mode(&self) -> Mode {
        self.target.mode
    }

    pub fn ptr_eq(&self, other: &ReactiveRecord) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }

    /// Snapshot of the raw contents as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        Value::Object(self.target.raw.clone()).to_json()
    }
}

impl Subject for ReactiveRecord {
    type Key = String;

    fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    fn mode(&self) -> Mode {
        self.target.mode
    }

    fn has(&self, key: &String) -> bool {
        ReactiveRecord::has(self, key)
    }

    fn keys(&self) -> Vec<String> {
        ReactiveRecord::keys(self)
    }

    fn delete(&self, key: &String) -> Result<bool, ReactiveError> {
        self.remove(key)
    }

    fn len(&self) -> usize {
        ReactiveRecord::len(self)
    }
}

impl Keyed for ReactiveRecord {
    fn get(&self, key: &String) -> Item {
        ReactiveRecord::get(self, key)
    }

    fn set(&self, key: String, value: Item) -> Result<(), ReactiveError> {
        ReactiveRecord::set(self, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(rt: &Runtime) -> ReactiveRecord {
        rt.reactive(&RawObject::record([
            ("ok", Value::from(true)),
            ("text", Value::from("hello")),
        ]))
        .into_record()
        .unwrap()
    }

    #[test]
    fn branch_switch_drops_stale_dependency() {
        let rt = Runtime::new();
        let state = record(&rt);
        let runs = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let runs_clone = runs.clone();
        let _effect = rt.effect(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            if reader.get("ok").as_bool() == Some(true) {
                reader.get("text");
            }
        });

        state.set("ok", false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        state.set("text", "changed").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_write_does_not_trigger() {
        let rt = Runtime::new();
        let state = rt
            .reactive(&RawObject::record([("n", Value::from(f64::NAN))]))
            .into_record()
            .unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let runs_clone = runs.clone();
        let _effect = rt.effect(move || {
            reader.get("n");
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        state.set("n", f64::NAN).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn add_and_delete_reach_enumerators() {
        let rt = Runtime::new();
        let state = record(&rt);
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let seen_clone = seen.clone();
        let _effect = rt.effect(move || {
            seen_clone.store(reader.keys().len(), Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        state.set("extra", 1).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        // SET on an existing field leaves the key list alone.
        state.set("extra", 2).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        assert!(state.remove("ok").unwrap());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!state.remove("ok").unwrap());
    }

    #[test]
    fn has_tracks_the_field() {
        let rt = Runtime::new();
        let state = record(&rt);
        let found = Arc::new(AtomicUsize::new(0));

        let reader = state.clone();
        let found_clone = found.clone();
        let _effect = rt.effect(move || {
            found_clone.store(reader.has("later") as usize, Ordering::SeqCst);
        });
        assert_eq!(found.load(Ordering::SeqCst), 0);

        state.set("later", Value::Null).unwrap();
        assert_eq!(found.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn storing_a_handle_stores_its_raw() {
        let rt = Runtime::new();
        let state = record(&rt);
        let child_raw = RawObject::list([Value::from(1)]);
        let child = rt.reactive(&child_raw);

        state.set("child", child.clone()).unwrap();

        let stored = state.raw().fields().read().get("child").cloned();
        assert_eq!(stored, Some(Value::Object(child_raw)));
        assert!(state.get("child").as_reactive().unwrap().ptr_eq(&child));
    }
}
