//! Identifiers for subjects and computations.
//!
//! Raw containers and computations each get a process-unique id when they
//! are created. The dependency store, the identity cache and the job queue
//! are all keyed by these ids instead of by pointer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an observable subject.
///
/// Every raw container owns one, and derived values allocate one for their
/// synthetic `value` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Generate a new unique subject ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a computation (effect, derived value or watcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_ids_are_unique() {
        let id1 = SubjectId::new();
        let id2 = SubjectId::new();
        let id3 = SubjectId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn effect_ids_increase() {
        let first = EffectId::new();
        let second = EffectId::new();
        assert!(second.raw() > first.raw());
    }
}
