//! Error types.

use thiserror::Error;

use crate::render::Key;

/// Errors raised by reactive handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A write or delete was attempted through a read-only handle.
    ///
    /// The underlying data is left untouched. Callers that want the
    /// permissive behaviour (log and carry on) can simply ignore this.
    #[error("cannot {op} `{key}`: subject is read-only")]
    ReadOnlyViolation { op: &'static str, key: String },
}

/// Errors raised while reconciling node trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Two siblings in one child list share a key.
    #[error("duplicate key `{0}` in sibling list")]
    DuplicateKey(Key),

    /// The node tree is malformed and cannot be realized.
    #[error("malformed node tree: {0}")]
    Structural(String),
}
