//! Host Contracts
//!
//! The reconciler is platform-agnostic. Two traits connect it to a platform:
//!
//! - [`Host`] is what [`reconcile`](super::reconcile) calls: mount, unmount,
//!   patch and move whole virtual nodes. Nothing else.
//! - [`HostOps`] is the low-level node API of a concrete platform (create,
//!   insert, remove, set text, set a property). [`Renderer`](super::Renderer)
//!   implements `Host` on top of any `HostOps`.

use std::fmt;

use super::vnode::VNode;
use crate::error::RenderError;

/// Node-level operations the reconciler drives.
pub trait Host {
    /// Handle to a realized node. Also used for containers.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Realize `node` and insert it into `container` before `anchor`, or at
    /// the end when `anchor` is `None`. Sets `node.el`.
    fn mount(
        &mut self,
        node: &mut VNode<Self::Node>,
        container: &Self::Node,
        anchor: Option<&Self::Node>,
    ) -> Result<(), RenderError>;

    /// Remove a realized node from the output.
    fn unmount(&mut self, node: &VNode<Self::Node>) -> Result<(), RenderError>;

    /// Update the realization of `old` to match `new`, recursing into
    /// children. Copies the realized node into `new.el`.
    ///
    /// `anchor` is the node currently following `old` in `container`. It
    /// positions whatever `new` mounts when `old` realized nothing, such as
    /// an empty fragment.
    fn patch(
        &mut self,
        old: &VNode<Self::Node>,
        new: &mut VNode<Self::Node>,
        container: &Self::Node,
        anchor: Option<&Self::Node>,
    ) -> Result<(), RenderError>;

    /// Move an already realized node before `anchor`.
    fn move_node(
        &mut self,
        node: &VNode<Self::Node>,
        container: &Self::Node,
        anchor: Option<&Self::Node>,
    ) -> Result<(), RenderError>;
}

/// Primitive operations of an output platform.
pub trait HostOps {
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;

    fn create_text(&mut self, text: &str) -> Self::Node;

    fn create_comment(&mut self, text: &str) -> Self::Node;

    /// Replace the content of a text or comment node.
    fn set_text(&mut self, node: &Self::Node, text: &str);

    /// Replace all content of an element with a text run.
    fn set_element_text(&mut self, el: &Self::Node, text: &str);

    /// Insert (or move) `node` into `parent` before `anchor`.
    fn insert(&mut self, parent: &Self::Node, node: &Self::Node, anchor: Option<&Self::Node>);

    /// Detach `node` from its parent.
    fn remove(&mut self, node: &Self::Node);

    /// Set, change or (with `new == None`) clear one property.
    fn patch_prop(
        &mut self,
        el: &Self::Node,
        key: &str,
        old: Option<&serde_json::Value>,
        new: Option<&serde_json::Value>,
    );

    /// The node following `node` in its parent.
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
}
