//! Renderer
//!
//! [`Renderer`] implements [`Host`] on top of any [`HostOps`] backend. It is
//! the node-level half of rendering; [`reconcile`] is the list-level half, and
//! the two recurse into each other through `patch_children`.
//!
//! # Patch Dispatch
//!
//! - Different node types: the old node is unmounted and the new one mounted
//!   where the old one ended.
//! - Text and comment: the host node is reused; `set_text` runs only when the
//!   content changed.
//! - Element: props are diffed, then children.
//! - Fragment: children only, anchored after the old fragment's last node,
//!   or at the caller's anchor when the old fragment was empty.

use tracing::debug;

use super::diff::{ensure_unique_keys, reconcile};
use super::host::{Host, HostOps};
use super::vnode::{Children, Props, VNode, VNodeKind};
use crate::error::RenderError;

/// Node-level renderer over a platform backend.
#[derive(Debug, Default)]
pub struct Renderer<O> {
    ops: O,
}

impl<O: HostOps> Renderer<O> {
    pub fn new(ops: O) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn ops_mut(&mut self) -> &mut O {
        &mut self.ops
    }

    pub fn into_ops(self) -> O {
        self.ops
    }

    /// Render `next` into `container`, replacing `current`.
    ///
    /// `current` is the tree from the previous call (or `None` the first
    /// time) and is updated to the realized `next`. Passing `None` as `next`
    /// unmounts everything.
    ///
    /// `next` is checked for duplicate keys and malformed children before
    /// the host is touched. A rejected tree leaves `current` and the host
    /// output as they were.
    pub fn render(
        &mut self,
        container: &O::Node,
        current: &mut Option<VNode<O::Node>>,
        next: Option<VNode<O::Node>>,
    ) -> Result<(), RenderError> {
        if let Some(node) = &next {
            validate(node)?;
        }
        match (current.take(), next) {
            (None, None) => {}
            (Some(old), None) => {
                self.unmount(&old)?;
                debug!("unmounted root");
            }
            (None, Some(mut node)) => {
                self.mount(&mut node, container, None)?;
                *current = Some(node);
            }
            (Some(old), Some(mut node)) => {
                self.patch(&old, &mut node, container, None)?;
                *current = Some(node);
            }
        }
        Ok(())
    }

    fn patch_props(&mut self, el: &O::Node, old: &Props, new: &Props) {
        for (key, value) in new {
            let previous = old.get(key);
            if previous != Some(value) {
                self.ops.patch_prop(el, key, previous, Some(value));
            }
        }
        for (key, value) in old {
            if !new.contains_key(key) {
                self.ops.patch_prop(el, key, Some(value), None);
            }
        }
    }

    /// Turn the children of `container` from `old` into `new`.
    ///
    /// `anchor` bounds the children from the right; it is `None` for an
    /// element's own children and the following sibling for a fragment.
    fn patch_children(
        &mut self,
        old: &Children<O::Node>,
        new: &mut Children<O::Node>,
        container: &O::Node,
        anchor: Option<&O::Node>,
    ) -> Result<(), RenderError> {
        match (old, new) {
            (Children::Nodes(old_nodes), Children::Nodes(new_nodes)) => {
                reconcile(self, old_nodes, new_nodes, container, anchor)
            }
            (Children::Nodes(old_nodes), Children::Text(text)) => {
                for node in old_nodes {
                    self.unmount(node)?;
                }
                self.ops.set_element_text(container, text);
                Ok(())
            }
            (Children::Nodes(old_nodes), Children::Empty) => {
                for node in old_nodes {
                    self.unmount(node)?;
                }
                Ok(())
            }
            (Children::Text(old_text), Children::Text(text)) => {
                if old_text != text {
                    self.ops.set_element_text(container, text);
                }
                Ok(())
            }
            (Children::Text(_), Children::Nodes(new_nodes)) => {
                self.ops.set_element_text(container, "");
                for node in new_nodes {
                    self.mount(node, container, anchor)?;
                }
                Ok(())
            }
            (Children::Text(_), Children::Empty) => {
                self.ops.set_element_text(container, "");
                Ok(())
            }
            (Children::Empty, Children::Text(text)) => {
                self.ops.set_element_text(container, text);
                Ok(())
            }
            (Children::Empty, Children::Nodes(new_nodes)) => {
                for node in new_nodes {
                    self.mount(node, container, anchor)?;
                }
                Ok(())
            }
            (Children::Empty, Children::Empty) => Ok(()),
        }
    }

    /// The host node right after everything `node` realized. A node that
    /// realized nothing sits wherever `fallback` says.
    fn after(&self, node: &VNode<O::Node>, fallback: Option<&O::Node>) -> Option<O::Node> {
        match node.last_el() {
            Some(el) => self.ops.next_sibling(&el),
            None => fallback.cloned(),
        }
    }
}

/// Structural checks that must pass before any host operation runs.
fn validate<N>(node: &VNode<N>) -> Result<(), RenderError> {
    match (&node.kind, &node.children) {
        (VNodeKind::Fragment, Children::Text(_)) => Err(RenderError::Structural(
            "fragment children must be nodes, not text".to_owned(),
        )),
        (VNodeKind::Text | VNodeKind::Comment, Children::Nodes(_)) => Err(RenderError::Structural(
            format!("{:?} node cannot have child nodes", node.kind),
        )),
        (_, Children::Nodes(nodes)) => {
            ensure_unique_keys(nodes)?;
            nodes.iter().try_for_each(validate::<N>)
        }
        _ => Ok(()),
    }
}

fn realized<N: Clone>(node: &VNode<N>) -> Result<N, RenderError> {
    node.el
        .clone()
        .ok_or_else(|| RenderError::Structural(format!("{:?} node is not mounted", node.kind)))
}

impl<O: HostOps> Host for Renderer<O> {
    type Node = O::Node;

    fn mount(
        &mut self,
        node: &mut VNode<O::Node>,
        container: &O::Node,
        anchor: Option<&O::Node>,
    ) -> Result<(), RenderError> {
        let VNode {
            kind,
            props,
            children,
            el,
            ..
        } = node;

        match kind {
            VNodeKind::Element(tag) => {
                let created = self.ops.create_element(tag);
                match children {
                    Children::Empty => {}
                    Children::Text(text) => self.ops.set_element_text(&created, text),
                    Children::Nodes(nodes) => {
                        for child in nodes {
                            self.mount(child, &created, None)?;
                        }
                    }
                }
                for (key, value) in props.iter() {
                    self.ops.patch_prop(&created, key, None, Some(value));
                }
                self.ops.insert(container, &created, anchor);
                *el = Some(created);
            }
            VNodeKind::Text | VNodeKind::Comment => {
                let content = match children {
                    Children::Text(text) => text.as_str(),
                    Children::Empty => "",
                    Children::Nodes(_) => {
                        return Err(RenderError::Structural(format!(
                            "{kind:?} node cannot have child nodes"
                        )))
                    }
                };
                let created = if *kind == VNodeKind::Text {
                    self.ops.create_text(content)
                } else {
                    self.ops.create_comment(content)
                };
                self.ops.insert(container, &created, anchor);
                *el = Some(created);
            }
            VNodeKind::Fragment => match children {
                Children::Empty => {}
                Children::Text(_) => {
                    return Err(RenderError::Structural(
                        "fragment children must be nodes, not text".to_owned(),
                    ))
                }
                Children::Nodes(nodes) => {
                    for child in nodes {
                        self.mount(child, container, anchor)?;
                    }
                }
            },
        }
        Ok(())
    }

    fn unmount(&mut self, node: &VNode<O::Node>) -> Result<(), RenderError> {
        match node.kind {
            VNodeKind::Fragment => {
                for child in node.child_nodes() {
                    self.unmount(child)?;
                }
            }
            _ => {
                let el = realized(node)?;
                self.ops.remove(&el);
            }
        }
        Ok(())
    }

    fn patch(
        &mut self,
        old: &VNode<O::Node>,
        new: &mut VNode<O::Node>,
        container: &O::Node,
        anchor: Option<&O::Node>,
    ) -> Result<(), RenderError> {
        if !old.same_type(new) {
            let anchor = self.after(old, anchor);
            self.unmount(old)?;
            return self.mount(new, container, anchor.as_ref());
        }

        match &new.kind {
            VNodeKind::Text | VNodeKind::Comment => {
                let el = realized(old)?;
                if old.text_content() != new.text_content() {
                    self.ops.set_text(&el, new.text_content());
                }
                new.el = Some(el);
            }
            VNodeKind::Element(_) => {
                let el = realized(old)?;
                self.patch_props(&el, &old.props, &new.props);
                self.patch_children(&old.children, &mut new.children, &el, None)?;
                new.el = Some(el);
            }
            VNodeKind::Fragment => {
                if matches!(new.children, Children::Text(_)) {
                    return Err(RenderError::Structural(
                        "fragment children must be nodes, not text".to_owned(),
                    ));
                }
                let anchor = self.after(old, anchor);
                self.patch_children(&old.children, &mut new.children, container, anchor.as_ref())?;
            }
        }
        Ok(())
    }

    fn move_node(
        &mut self,
        node: &VNode<O::Node>,
        container: &O::Node,
        anchor: Option<&O::Node>,
    ) -> Result<(), RenderError> {
        match node.kind {
            VNodeKind::Fragment => {
                for child in node.child_nodes() {
                    self.move_node(child, container, anchor)?;
                }
            }
            _ => {
                let el = realized(node)?;
                self.ops.insert(container, &el, anchor);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::memory::{HostOp, MemoryHost, NodeId};
    use crate::render::vnode::Key;

    fn setup() -> (Renderer<MemoryHost>, NodeId) {
        let mut host = MemoryHost::new();
        let root = host.create_root("div");
        (Renderer::new(host), root)
    }

    fn item(key: i64) -> VNode<NodeId> {
        VNode::element("li").with_key(key).with_text(key.to_string())
    }

    fn list(keys: &[i64]) -> VNode<NodeId> {
        VNode::element("ul").with_children(keys.iter().map(|k| item(*k)).collect())
    }

    #[test]
    fn mount_builds_markup() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        let view = VNode::element("p")
            .with_prop("class", "lead")
            .with_children(vec![VNode::text("hi "), VNode::comment("c")]);

        renderer.render(&root, &mut tree, Some(view)).unwrap();
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<p class=\"lead\">hi <!--c--></p>"
        );
        assert!(tree.as_ref().and_then(|t| t.el).is_some());
    }

    #[test]
    fn text_patch_reuses_node() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer
            .render(&root, &mut tree, Some(VNode::element("p").with_children(vec![VNode::text("a")])))
            .unwrap();
        renderer.ops_mut().take_ops();

        renderer
            .render(&root, &mut tree, Some(VNode::element("p").with_children(vec![VNode::text("b")])))
            .unwrap();
        let ops = renderer.ops_mut().take_ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], HostOp::SetText { text, .. } if text == "b"));

        // Unchanged text does nothing.
        renderer
            .render(&root, &mut tree, Some(VNode::element("p").with_children(vec![VNode::text("b")])))
            .unwrap();
        assert!(renderer.ops().ops().is_empty());
    }

    #[test]
    fn props_are_diffed() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer
            .render(
                &root,
                &mut tree,
                Some(VNode::element("a").with_prop("href", "/x").with_prop("title", "t")),
            )
            .unwrap();
        renderer.ops_mut().take_ops();

        renderer
            .render(
                &root,
                &mut tree,
                Some(VNode::element("a").with_prop("href", "/y").with_prop("title", "t")),
            )
            .unwrap();
        let ops = renderer.ops_mut().take_ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], HostOp::PatchProp { key, .. } if key == "href"));

        renderer
            .render(&root, &mut tree, Some(VNode::element("a").with_prop("href", "/y")))
            .unwrap();
        let ops = renderer.ops_mut().take_ops();
        assert!(matches!(&ops[0], HostOp::PatchProp { key, value: None, .. } if key == "title"));
        assert_eq!(renderer.ops().inner_markup(root), "<a href=\"/y\"></a>");
    }

    #[test]
    fn type_change_replaces_in_place() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        let first = VNode::element("div").with_children(vec![
            VNode::element("a").with_key(1),
            VNode::element("b").with_key(2),
            VNode::element("c").with_key(3),
        ]);
        renderer.render(&root, &mut tree, Some(first)).unwrap();

        let second = VNode::element("div").with_children(vec![
            VNode::element("a").with_key(1),
            VNode::text("two").with_key(2),
            VNode::element("c").with_key(3),
        ]);
        renderer.render(&root, &mut tree, Some(second)).unwrap();
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<div><a></a>two<c></c></div>"
        );
    }

    #[test]
    fn keyed_children_are_moved_not_recreated() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer.render(&root, &mut tree, Some(list(&[1, 2, 3, 4]))).unwrap();
        renderer.ops_mut().take_ops();

        renderer.render(&root, &mut tree, Some(list(&[4, 1, 2, 3]))).unwrap();
        let ops = renderer.ops_mut().take_ops();
        let created = ops
            .iter()
            .filter(|op| matches!(op, HostOp::CreateElement { .. }))
            .count();
        let inserts = ops.iter().filter(|op| matches!(op, HostOp::Insert { .. })).count();
        assert_eq!(created, 0);
        assert_eq!(inserts, 1);
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<ul><li>4</li><li>1</li><li>2</li><li>3</li></ul>"
        );
    }

    #[test]
    fn text_children_switch_to_nodes_and_back() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer
            .render(&root, &mut tree, Some(VNode::element("p").with_text("plain")))
            .unwrap();
        assert_eq!(renderer.ops().inner_markup(root), "<p>plain</p>");

        renderer
            .render(
                &root,
                &mut tree,
                Some(VNode::element("p").with_children(vec![VNode::element("b")])),
            )
            .unwrap();
        assert_eq!(renderer.ops().inner_markup(root), "<p><b></b></p>");

        renderer
            .render(&root, &mut tree, Some(VNode::element("p").with_text("again")))
            .unwrap();
        assert_eq!(renderer.ops().inner_markup(root), "<p>again</p>");
    }

    #[test]
    fn fragments_patch_in_place() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        let view = |keys: &[i64]| {
            VNode::element("div").with_children(vec![
                VNode::text("["),
                VNode::fragment(keys.iter().map(|k| item(*k)).collect()),
                VNode::text("]"),
            ])
        };

        renderer.render(&root, &mut tree, Some(view(&[1, 2]))).unwrap();
        renderer.render(&root, &mut tree, Some(view(&[2, 3, 1]))).unwrap();
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<div>[<li>2</li><li>3</li><li>1</li>]</div>"
        );

        renderer.render(&root, &mut tree, Some(view(&[]))).unwrap();
        assert_eq!(renderer.ops().inner_markup(root), "<div>[]</div>");

        // An emptied fragment refills between its neighbours.
        renderer.render(&root, &mut tree, Some(view(&[2]))).unwrap();
        assert_eq!(renderer.ops().inner_markup(root), "<div>[<li>2</li>]</div>");
    }

    #[test]
    fn empty_fragment_refills_before_moved_sibling() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        let view = |order: &[&str], keys: &[i64]| {
            VNode::element("div").with_children(
                order
                    .iter()
                    .map(|name| match *name {
                        "frag" => VNode::fragment(keys.iter().map(|k| item(*k)).collect())
                            .with_key("frag"),
                        other => VNode::element(other).with_key(other),
                    })
                    .collect(),
            )
        };

        renderer.render(&root, &mut tree, Some(view(&["a", "frag", "b"], &[]))).unwrap();
        renderer.render(&root, &mut tree, Some(view(&["frag", "b", "a"], &[1]))).unwrap();
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<div><li>1</li><b></b><a></a></div>"
        );
    }

    #[test]
    fn rejected_render_keeps_previous_output() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer.render(&root, &mut tree, Some(list(&[1, 2]))).unwrap();
        renderer.ops_mut().take_ops();

        let err = renderer.render(&root, &mut tree, Some(list(&[1, 1]))).unwrap_err();
        assert_eq!(err, RenderError::DuplicateKey(Key::Int(1)));
        assert!(renderer.ops().ops().is_empty());
        assert!(tree.is_some());

        renderer.render(&root, &mut tree, Some(list(&[1, 2]))).unwrap();
        assert_eq!(
            renderer.ops().inner_markup(root),
            "<ul><li>1</li><li>2</li></ul>"
        );
        assert!(renderer
            .ops()
            .ops()
            .iter()
            .all(|op| !matches!(op, HostOp::CreateElement { .. })));
    }

    #[test]
    fn fragment_with_text_children_is_structural() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        let mut bad = VNode::fragment(Vec::new());
        bad.children = Children::Text("nope".to_owned());

        let err = renderer.render(&root, &mut tree, Some(bad)).unwrap_err();
        assert!(matches!(err, RenderError::Structural(_)));
    }

    #[test]
    fn render_none_unmounts() {
        let (mut renderer, root) = setup();
        let mut tree = None;
        renderer.render(&root, &mut tree, Some(list(&[1, 2]))).unwrap();
        renderer.render(&root, &mut tree, None).unwrap();
        assert!(tree.is_none());
        assert_eq!(renderer.ops().inner_markup(root), "");
        assert_eq!(renderer.ops().node_count(), 1);
    }
}
