//! Reactive Maps and Sets
//!
//! Maps and sets are addressed by value rather than by name. Each key or
//! member is its own dependency slot (`DepKey::Entry`), compared with the
//! same SameValueZero relation the raw collections use.
//!
//! # Enumeration
//!
//! - `len`, `for_each`, `entries` and `values` track `Iterate`.
//! - `keys` tracks `KeyIterate`.
//!
//! Changing the value under an existing map key reaches `Iterate` readers
//! (they observe values) but not `KeyIterate` readers. Adding or removing a
//! key reaches both.
//!
//! Keys, members and values yielded by a deep handle are wrapped, so mutating
//! a yielded container is itself observable.

use std::sync::Arc;

use super::dep::{DepKey, TriggerOp};
use super::handle::{Item, Keyed, Mode, Subject, Target};
use super::value::{RawObject, Value};
use crate::error::ReactiveError;

/// Handle onto a map.
#[derive(Clone)]
pub struct ReactiveMap {
    pub(crate) target: Arc<Target>,
}

impl ReactiveMap {
    pub fn get(&self, key: impl Into<Item>) -> Item {
        let key = key.into().into_raw();
        let value = self
            .target
            .raw
            .entries()
            .read()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        self.target.track(DepKey::Entry(key));
        self.target.wrap_read(value)
    }

    pub fn has(&self, key: impl Into<Item>) -> bool {
        let key = key.into().into_raw();
        let found = self.target.raw.entries().read().contains_key(&key);
        self.target.track(DepKey::Entry(key));
        found
    }

    /// Insert or overwrite an entry.
    pub fn set(&self, key: impl Into<Item>, value: impl Into<Item>) -> Result<(), ReactiveError> {
        let key = key.into().into_raw();
        self.target.guard_write("set", &key)?;

        let value = value.into().into_raw();
        let old = self
            .target
            .raw
            .entries()
            .write()
            .insert(key.clone(), value.clone());

        match old {
            None => self.target.trigger(DepKey::Entry(key), TriggerOp::Add, None),
            Some(old) if old != value => {
                self.target.trigger(DepKey::Entry(key), TriggerOp::Set, None)
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub fn remove(&self, key: impl Into<Item>) -> Result<bool, ReactiveError> {
        let key = key.into().into_raw();
        self.target.guard_write("delete", &key)?;

        let removed = self.target.raw.entries().write().shift_remove(&key);
        if removed.is_some() {
            self.target.trigger(DepKey::Entry(key), TriggerOp::Delete, None);
        }
        Ok(removed.is_some())
    }

    /// Remove every entry. Each affected computation reruns once.
    pub fn clear(&self) -> Result<(), ReactiveError> {
        self.target.guard_write("clear", "*")?;

        let removed = std::mem::take(&mut *self.target.raw.entries().write());
        if !removed.is_empty() {
            self.target.trigger(DepKey::Iterate, TriggerOp::Clear, None);
        }
        Ok(())
    }

    /// Number of entries. Tracks enumeration.
    pub fn len(&self) -> usize {
        self.target.track(DepKey::Iterate);
        self.target.raw.entries().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn for_each(&self, mut f: impl FnMut(Item, Item)) {
        for (key, value) in self.entries() {
            f(value, key);
        }
    }

    pub fn entries(&self) -> Vec<(Item, Item)> {
        self.target.track(DepKey::Iterate);
        let snapshot: Vec<(Value, Value)> = self
            .target
            .raw
            .entries()
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        snapshot
            .into_iter()
            .map(|(k, v)| (self.target.wrap_read(k), self.target.wrap_read(v)))
            .collect()
    }

    pub fn values(&self) -> Vec<Item> {
        self.target.track(DepKey::Iterate);
        let snapshot: Vec<Value> = self.target.raw.entries().read().values().cloned().collect();
        snapshot
            .into_iter()
            .map(|v| self.target.wrap_read(v))
            .collect()
    }

    /// Keys in insertion order. Value-only writes do not re-run readers.
    pub fn keys(&self) -> Vec<Item> {
        self.target.track(DepKey::KeyIterate);
        let snapshot: Vec<Value> = self.target.raw.entries().read().keys().cloned().collect();
        snapshot
            .into_iter()
            .map(|k| self.target.wrap_read(k))
            .collect()
    }

    pub fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    pub fn mode(&self) -> Mode {
        self.target.mode
    }

    pub fn ptr_eq(&self, other: &ReactiveMap) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

impl Subject for ReactiveMap {
    type Key = Item;

    fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    fn mode(&self) -> Mode {
        self.target.mode
    }

    fn has(&self, key: &Item) -> bool {
        ReactiveMap::has(self, key.clone())
    }

    fn keys(&self) -> Vec<Item> {
        ReactiveMap::keys(self)
    }

    fn delete(&self, key: &Item) -> Result<bool, ReactiveError> {
        self.remove(key.clone())
    }

    fn len(&self) -> usize {
        ReactiveMap::len(self)
    }
}

impl Keyed for ReactiveMap {
    fn get(&self, key: &Item) -> Item {
        ReactiveMap::get(self, key.clone())
    }

    fn set(&self, key: Item, value: Item) -> Result<(), ReactiveError> {
        ReactiveMap::set(self, key, value)
    }
}

/// Handle onto a set.
#[derive(Clone)]
pub struct ReactiveSet {
    pub(crate) target: Arc<Target>,
}

impl ReactiveSet {
    /// Add a member. Returns whether it was new.
    pub fn add(&self, member: impl Into<Item>) -> Result<bool, ReactiveError> {
        let member = member.into().into_raw();
        self.target.guard_write("add", &member)?;

        let added = self.target.raw.members().write().insert(member.clone());
        if added {
            self.target.trigger(DepKey::Entry(member), TriggerOp::Add, None);
        }
        Ok(added)
    }

    pub fn has(&self, member: impl Into<Item>) -> bool {
        let member = member.into().into_raw();
        let found = self.target.raw.members().read().contains(&member);
        self.target.track(DepKey::Entry(member));
        found
    }

    pub fn remove(&self, member: impl Into<Item>) -> Result<bool, ReactiveError> {
        let member = member.into().into_raw();
        self.target.guard_write("delete", &member)?;

        let removed = self.target.raw.members().write().shift_remove(&member);
        if removed {
            self.target.trigger(DepKey::Entry(member), TriggerOp::Delete, None);
        }
        Ok(removed)
    }

    /// Remove every member. Each affected computation reruns once.
    pub fn clear(&self) -> Result<(), ReactiveError> {
        self.target.guard_write("clear", "*")?;

        let removed = std::mem::take(&mut *self.target.raw.members().write());
        if !removed.is_empty() {
            self.target.trigger(DepKey::Iterate, TriggerOp::Clear, None);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.target.track(DepKey::Iterate);
        self.target.raw.members().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn for_each(&self, mut f: impl FnMut(Item)) {
        for member in self.values() {
            f(member);
        }
    }

    pub fn values(&self) -> Vec<Item> {
        self.target.track(DepKey::Iterate);
        self.snapshot()
    }

    /// Same members as [`values`](Self::values), tracked as key enumeration.
    pub fn keys(&self) -> Vec<Item> {
        self.target.track(DepKey::KeyIterate);
        self.snapshot()
    }

    /// Each member paired with itself.
    pub fn entries(&self) -> Vec<(Item, Item)> {
        self.values()
            .into_iter()
            .map(|member| (member.clone(), member))
            .collect()
    }

    fn snapshot(&self) -> Vec<Item> {
        let members: Vec<Value> = self.target.raw.members().read().iter().cloned().collect();
        members
            .into_iter()
            .map(|m| self.target.wrap_read(m))
            .collect()
    }

    pub fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    pub fn mode(&self) -> Mode {
        self.target.mode
    }

    pub fn ptr_eq(&self, other: &ReactiveSet) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

impl Subject for ReactiveSet {
    type Key = Item;

    fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    fn mode(&self) -> Mode {
        self.target.mode
    }

    fn has(&self, member: &Item) -> bool {
        ReactiveSet::has(self, member.clone())
    }

    fn keys(&self) -> Vec<Item> {
        ReactiveSet::keys(self)
    }

    fn delete(&self, member: &Item) -> Result<bool, ReactiveError> {
        self.remove(member.clone())
    }

    fn len(&self) -> usize {
        ReactiveSet::len(self)
    }
}
