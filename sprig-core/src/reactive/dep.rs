//! Dependency Store
//!
//! Maps `(subject, key)` pairs to the computations that read them during
//! their most recent run.
//!
//! # Keys
//!
//! Besides concrete fields, indices and collection entries there are three
//! structural keys:
//!
//! - `Length`: the length of a list. Enumerating a list tracks this.
//! - `Iterate`: whole-structure enumeration of records, maps and sets.
//! - `KeyIterate`: key-only enumeration of maps and sets. Kept apart from
//!   `Iterate` so that a value-only map write does not wake key readers.
//!
//! # Fan-out
//!
//! [`DepStore::collect`] decides which sets a mutation reaches:
//!
//! 1. The mutated key itself.
//! 2. `Iterate` for ADD and DELETE, and for SET on maps.
//! 3. `KeyIterate` for ADD and DELETE on maps and sets.
//! 4. `Length` for ADD on lists.
//! 5. Every `Index(i)` with `i >= new_len` when a list's length is written.
//! 6. Every key subscribed on the subject for CLEAR, in one pass.
//!
//! Computations are deduplicated and returned in accumulation order.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use super::effect::Computation;
use super::id::{EffectId, SubjectId};
use super::value::{SubjectKind, Value};

/// One observable slot of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    /// A named record field.
    Field(String),
    /// A list index.
    Index(usize),
    /// The length of a list.
    Length,
    /// A map key or set member.
    Entry(Value),
    /// Whole-structure enumeration.
    Iterate,
    /// Key-only enumeration of maps and sets.
    KeyIterate,
}

/// How a write changed its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOp {
    /// The key did not exist before.
    Add,
    /// An existing key got a different value.
    Set,
    /// An existing key was removed.
    Delete,
    /// Every entry of a map or set was removed at once.
    Clear,
}

type Subscribers = IndexMap<EffectId, Arc<dyn Computation>>;

/// Subject → key → subscribed computations.
#[derive(Default)]
pub(crate) struct DepStore {
    subjects: HashMap<SubjectId, HashMap<DepKey, Subscribers>>,
}

impl DepStore {
    /// Subscribe a computation. Returns `false` if it was already subscribed.
    pub(crate) fn subscribe(
        &mut self,
        subject: SubjectId,
        key: DepKey,
        computation: &Arc<dyn Computation>,
    ) -> bool {
        let subscribers = self
            .subjects
            .entry(subject)
            .or_default()
            .entry(key)
            .or_default();

        let id = computation.id();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, Arc::clone(computation));
        true
    }

    /// Remove a computation from each of the given slots.
    pub(crate) fn unsubscribe<I>(&mut self, id: EffectId, slots: I)
    where
        I: IntoIterator<Item = (SubjectId, DepKey)>,
    {
        for (subject, key) in slots {
            let Some(fields) = self.subjects.get_mut(&subject) else {
                continue;
            };
            if let Some(subscribers) = fields.get_mut(&key) {
                subscribers.shift_remove(&id);
                if subscribers.is_empty() {
                    fields.remove(&key);
                }
            }
            if fields.is_empty() {
                self.subjects.remove(&subject);
            }
        }
    }

    /// Drop every subscription recorded against a subject.
    pub(crate) fn release(&mut self, subject: SubjectId) -> usize {
        self.subjects
            .remove(&subject)
            .map(|fields| fields.values().map(IndexMap::len).sum())
            .unwrap_or(0)
    }

    pub(crate) fn subscriber_count(&self, subject: SubjectId, key: &DepKey) -> usize {
        self.subjects
            .get(&subject)
            .and_then(|fields| fields.get(key))
            .map(IndexMap::len)
            .unwrap_or(0)
    }

    pub(crate) fn clear(&mut self) {
        self.subjects.clear();
    }

    /// Gather the computations a mutation must re-invoke.
    ///
    /// `exclude` is the currently running computation; it never re-triggers
    /// itself.
    pub(crate) fn collect(
        &self,
        subject: SubjectId,
        kind: SubjectKind,
        key: &DepKey,
        op: TriggerOp,
        new_len: Option<usize>,
        exclude: Option<EffectId>,
    ) -> Vec<Arc<dyn Computation>> {
        let Some(fields) = self.subjects.get(&subject) else {
            return Vec::new();
        };

        let mut out: Subscribers = IndexMap::new();
        let mut add = |key: &DepKey| {
            if let Some(subscribers) = fields.get(key) {
                for (id, computation) in subscribers {
                    if Some(*id) != exclude {
                        out.entry(*id).or_insert_with(|| Arc::clone(computation));
                    }
                }
            }
        };

        if op == TriggerOp::Clear {
            for key in fields.keys() {
                add(key);
            }
            return out.into_values().collect();
        }

        add(key);

        let structural = matches!(op, TriggerOp::Add | TriggerOp::Delete);
        if structural || (op == TriggerOp::Set && kind == SubjectKind::Map) {
            add(&DepKey::Iterate);
        }
        if structural && matches!(kind, SubjectKind::Map | SubjectKind::Set) {
            add(&DepKey::KeyIterate);
        }
        if op == TriggerOp::Add && kind == SubjectKind::List {
            add(&DepKey::Length);
        }
        if *key == DepKey::Length && kind == SubjectKind::List {
            if let Some(len) = new_len {
                let mut truncated: Vec<usize> = fields
                    .keys()
                    .filter_map(|k| match k {
                        DepKey::Index(i) if *i >= len => Some(*i),
                        _ => None,
                    })
                    .collect();
                truncated.sort_unstable();
                for index in truncated {
                    add(&DepKey::Index(index));
                }
            }
        }

        out.into_values().collect()
    }
}
