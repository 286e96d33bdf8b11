//! Sprig Core
//!
//! This crate provides the core runtime for the Sprig reactive UI layer.
//! It implements:
//!
//! - Fine-grained dependency tracking over records, lists, maps and sets
//! - Effects, computed values, watchers and a batching job queue
//! - A virtual node model and keyed reconciliation of node trees
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: reactive handles, the dependency store and computations
//! - `render`: virtual nodes, the reconciler and host backends
//!
//! `render::mount_reactive` joins them: a view closure runs inside an
//! effect and every re-run is reconciled against the previous tree.
//!
//! # Example
//!
//! ```rust
//! use sprig_core::reactive::{RawObject, Runtime, Value};
//!
//! let rt = Runtime::new();
//! let state = rt
//!     .reactive(&RawObject::record([("count", Value::from(0))]))
//!     .into_record()
//!     .unwrap();
//!
//! let reader = state.clone();
//! let doubled = rt.computed(move || reader.get("count").as_f64().unwrap_or_default() * 2.0);
//!
//! state.set("count", 5).unwrap();
//! assert_eq!(doubled.get(), 10.0);
//! ```

pub mod reactive;
pub mod render;

mod error;

pub use error::{ReactiveError, RenderError};
