//! Keyed Reconciliation
//!
//! This module turns a description of the output (a tree of [`VNode`]s) into
//! the smallest set of platform operations that makes the realized output
//! match it.
//!
//! # Layers
//!
//! ```text
//! view closure ──► VNode tree ──► Renderer (Host) ──► HostOps backend
//!                                    │    ▲
//!                                    ▼    │
//!                                  reconcile (keyed lists, LIS)
//! ```
//!
//! - [`reconcile`] diffs two sibling lists, calling only the four [`Host`]
//!   operations. It knows nothing about elements or props.
//! - [`Renderer`] implements `Host` over any [`HostOps`] backend and handles
//!   single nodes: props, text, type changes and fragments.
//! - [`MemoryHost`] is a headless backend that records every operation.
//! - [`mount_reactive`] runs a view inside an effect, re-rendering when the
//!   reactive state it reads changes.
//!
//! # Example
//!
//! ```rust
//! use sprig_core::render::{MemoryHost, Renderer, VNode};
//!
//! let mut host = MemoryHost::new();
//! let root = host.create_root("div");
//! let mut renderer = Renderer::new(host);
//!
//! let list = |keys: &[i64]| {
//!     VNode::element("ul").with_children(
//!         keys.iter().map(|k| VNode::element("li").with_key(*k).with_text(k.to_string())).collect(),
//!     )
//! };
//!
//! let mut tree = None;
//! renderer.render(&root, &mut tree, Some(list(&[1, 2, 3]))).unwrap();
//! renderer.render(&root, &mut tree, Some(list(&[3, 1, 2]))).unwrap();
//! assert_eq!(
//!     renderer.ops().inner_markup(root),
//!     "<ul><li>3</li><li>1</li><li>2</li></ul>"
//! );
//! ```

mod diff;
mod driver;
mod host;
mod lis;
mod memory;
mod renderer;
mod vnode;

pub use diff::reconcile;
pub use driver::{mount_reactive, MountHandle};
pub use host::{Host, HostOps};
pub use lis::longest_increasing_subsequence;
pub use memory::{HostOp, MemoryHost, NodeId};
pub use renderer::Renderer;
pub use vnode::{Children, Key, Props, VNode, VNodeKind};
