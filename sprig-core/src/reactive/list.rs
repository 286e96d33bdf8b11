//! Reactive Lists
//!
//! Index reads track `Index(i)`; anything that depends on how many items
//! there are tracks `Length`.
//!
//! # Search
//!
//! `includes`, `index_of`, `last_index_of`, `find` and `find_index` first
//! compare against the items as they would be read through the handle, then
//! fall back to the raw backing values. A caller may hold either a handle or the raw container it
//! wraps; both are found.
//!
//! # Stack Operations
//!
//! `push`, `pop`, `shift`, `unshift`, `insert`, `remove` and `splice` read
//! and write the length internally. They run with tracking paused, so an
//! effect that calls `push` does not end up subscribed to the length it is
//! changing. Two such effects would otherwise re-trigger each other forever.

use std::sync::Arc;

use super::dep::{DepKey, TriggerOp};
use super::handle::{Item, Keyed, Mode, Subject, Target};
use super::value::{RawObject, Value};
use crate::error::ReactiveError;

/// Handle onto a list.
#[derive(Clone)]
pub struct ReactiveList {
    pub(crate) target: Arc<Target>,
}

impl ReactiveList {
    /// Read one item. Out-of-range reads yield null.
    pub fn get(&self, index: usize) -> Item {
        self.target.track(DepKey::Index(index));
        let value = self
            .target
            .raw
            .items()
            .read()
            .get(index)
            .cloned()
            .unwrap_or_default();
        self.target.wrap_read(value)
    }

    /// Write one item.
    ///
    /// Writing at or past the end is an ADD and extends the list, filling
    /// any gap with nulls.
    pub fn set(&self, index: usize, value: impl Into<Item>) -> Result<(), ReactiveError> {
        self.target.guard_write("set", index)?;
        let value = value.into().into_raw();

        let op = {
            let mut items = self.target.raw.items().write();
            if index >= items.len() {
                items.resize(index, Value::Null);
                items.push(value);
                Some(TriggerOp::Add)
            } else if items[index] != value {
                items[index] = value;
                Some(TriggerOp::Set)
            } else {
                None
            }
        };

        if let Some(op) = op {
            self.target.trigger(DepKey::Index(index), op, None);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.target.track(DepKey::Length);
        self.target.raw.items().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resize the list. Readers of indices that fall off the end re-run.
    pub fn set_len(&self, len: usize) -> Result<(), ReactiveError> {
        self.target.guard_write("set", "length")?;

        let changed = {
            let mut items = self.target.raw.items().write();
            let changed = items.len() != len;
            items.resize(len, Value::Null);
            changed
        };

        if changed {
            self.target
                .trigger(DepKey::Length, TriggerOp::Set, Some(len));
        }
        Ok(())
    }

    /// Null out an index without shifting. Returns whether it was in range.
    pub fn delete(&self, index: usize) -> Result<bool, ReactiveError> {
        self.target.guard_write("delete", index)?;

        let old = {
            let mut items = self.target.raw.items().write();
            items.get_mut(index).map(std::mem::take)
        };

        if old.is_some() {
            self.target
                .trigger(DepKey::Index(index), TriggerOp::Delete, None);
        }
        Ok(old.is_some())
    }

    /// Every item, in order. Tracks the length and each index.
    pub fn to_vec(&self) -> Vec<Item> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Item> {
        self.to_vec().into_iter()
    }

    pub fn includes(&self, needle: impl Into<Item>) -> bool {
        self.search(&needle.into(), false).is_some()
    }

    pub fn index_of(&self, needle: impl Into<Item>) -> Option<usize> {
        self.search(&needle.into(), false)
    }

    pub fn last_index_of(&self, needle: impl Into<Item>) -> Option<usize> {
        self.search(&needle.into(), true)
    }

    fn search(&self, needle: &Item, from_end: bool) -> Option<usize> {
        let items = self.to_vec();
        let found = if from_end {
            items.iter().rposition(|item| item == needle)
        } else {
            items.iter().position(|item| item == needle)
        };
        if found.is_some() {
            return found;
        }

        let raw = needle.to_raw();
        let values = self.target.raw.items().read();
        if from_end {
            values.iter().rposition(|value| *value == raw)
        } else {
            values.iter().position(|value| *value == raw)
        }
    }

    pub fn find(&self, predicate: impl Fn(&Item) -> bool) -> Option<Item> {
        self.to_vec()
            .into_iter()
            .find(|item| predicate(item))
            .or_else(|| self.raw_items().into_iter().find(|item| predicate(item)))
    }

    /// Like `index_of`, the predicate sees the wrapped items first and the
    /// raw backing values second.
    pub fn find_index(&self, predicate: impl Fn(&Item) -> bool) -> Option<usize> {
        self.to_vec()
            .iter()
            .position(&predicate)
            .or_else(|| self.raw_items().iter().position(&predicate))
    }

    /// Backing values as plain items. The lock is released before any
    /// caller code sees them.
    fn raw_items(&self) -> Vec<Item> {
        let values = self.target.raw.items().read().clone();
        values.into_iter().map(Item::Value).collect()
    }

    /// Append an item. Returns the new length.
    pub fn push(&self, value: impl Into<Item>) -> Result<usize, ReactiveError> {
        let value = value.into().into_raw();
        self.apply("push", |items| {
            items.push(value);
            items.len()
        })
    }

    pub fn pop(&self) -> Result<Option<Item>, ReactiveError> {
        let popped = self.apply("pop", |items| items.pop())?;
        Ok(popped.map(|value| self.target.wrap_read(value)))
    }

    pub fn shift(&self) -> Result<Option<Item>, ReactiveError> {
        let shifted = self.apply("shift", |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })?;
        Ok(shifted.map(|value| self.target.wrap_read(value)))
    }

    /// Prepend an item. Returns the new length.
    pub fn unshift(&self, value: impl Into<Item>) -> Result<usize, ReactiveError> {
        let value = value.into().into_raw();
        self.apply("unshift", |items| {
            items.insert(0, value);
            items.len()
        })
    }

    /// Insert before `index`, clamped to the length.
    pub fn insert(&self, index: usize, value: impl Into<Item>) -> Result<(), ReactiveError> {
        let value = value.into().into_raw();
        self.apply("insert", |items| {
            let at = index.min(items.len());
            items.insert(at, value);
        })
    }

    /// Remove and return the item at `index`, shifting the rest down.
    pub fn remove(&self, index: usize) -> Result<Option<Item>, ReactiveError> {
        let removed = self.apply("remove", |items| {
            (index < items.len()).then(|| items.remove(index))
        })?;
        Ok(removed.map(|value| self.target.wrap_read(value)))
    }

    /// Replace `delete_count` items starting at `start` with `replacement`.
    ///
    /// Out-of-range bounds are clamped. Returns the removed items.
    pub fn splice<I>(
        &self,
        start: usize,
        delete_count: usize,
        replacement: I,
    ) -> Result<Vec<Item>, ReactiveError>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let replacement: Vec<Value> = replacement
            .into_iter()
            .map(|item| item.into().into_raw())
            .collect();

        let removed = self.apply("splice", |items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, replacement).collect::<Vec<_>>()
        })?;
        Ok(removed
            .into_iter()
            .map(|value| self.target.wrap_read(value))
            .collect())
    }

    /// Run a bulk mutation with tracking paused, then trigger per index.
    ///
    /// Each index that was added or changed triggers like an individual
    /// write, and a shrink triggers the length so readers of removed indices
    /// re-run.
    fn apply<R>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> Result<R, ReactiveError> {
        self.target.guard_write(op, "length")?;
        let _pause = self.target.rt.pause_tracking();

        let (before, after, result) = {
            let mut items = self.target.raw.items().write();
            let before = items.clone();
            let result = mutate(&mut items);
            (before, items.clone(), result)
        };

        for (index, value) in after.iter().enumerate() {
            match before.get(index) {
                None => self.target.trigger(DepKey::Index(index), TriggerOp::Add, None),
                Some(old) if old != value => {
                    self.target.trigger(DepKey::Index(index), TriggerOp::Set, None)
                }
                Some(_) => {}
            }
        }
        if after.len() < before.len() {
            self.target
                .trigger(DepKey::Length, TriggerOp::Set, Some(after.len()));
        }

        Ok(result)
    }

    pub fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    pub fn mode(&self) -> Mode {
        self.target.mode
    }

    pub fn ptr_eq(&self, other: &ReactiveList) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

impl Subject for ReactiveList {
    type Key = usize;

    fn raw(&self) -> &RawObject {
        &self.target.raw
    }

    fn mode(&self) -> Mode {
        self.target.mode
    }

    fn has(&self, index: &usize) -> bool {
        self.target.track(DepKey::Index(*index));
        *index < self.target.raw.items().read().len()
    }

    /// Indices `0..len`. Enumerating a list tracks its length.
    fn keys(&self) -> Vec<usize> {
        (0..ReactiveList::len(self)).collect()
    }

    fn delete(&self, index: &usize) -> Result<bool, ReactiveError> {
        ReactiveList::delete(self, *index)
    }

    fn len(&self) -> usize {
        ReactiveList::len(self)
    }
}

impl Keyed for ReactiveList {
    fn get(&self, index: &usize) -> Item {
        ReactiveList::get(self, *index)
    }

    fn set(&self, index: usize, value: Item) -> Result<(), ReactiveError> {
        ReactiveList::set(self, index, value)
    }
}
