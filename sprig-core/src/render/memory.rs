//! In-Memory Host
//!
//! `MemoryHost` is a [`HostOps`] backend that keeps the realized tree in an
//! arena. It records every primitive operation, which makes it useful for
//! headless rendering and for asserting exactly what a render did.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::host::HostOps;

/// Handle to a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One primitive operation, as recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    CreateComment { node: NodeId, text: String },
    SetText { node: NodeId, text: String },
    SetElementText { node: NodeId, text: String },
    Insert { parent: NodeId, node: NodeId, anchor: Option<NodeId> },
    Remove { node: NodeId },
    PatchProp { node: NodeId, key: String, value: Option<serde_json::Value> },
}

#[derive(Debug)]
enum NodeData {
    Element {
        tag: String,
        props: IndexMap<String, serde_json::Value>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct MemNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed output tree.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<NodeId, MemNode>,
    next_id: u64,
    log: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to render into. Not logged.
    pub fn create_root(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_owned(),
            props: IndexMap::new(),
        })
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            MemNode {
                data,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Operations recorded so far.
    pub fn ops(&self) -> &[HostOp] {
        &self.log
    }

    /// Take and clear the operation log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.log)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn prop(&self, node: NodeId, key: &str) -> Option<&serde_json::Value> {
        match self.nodes.get(&node).map(|n| &n.data) {
            Some(NodeData::Element { props, .. }) => props.get(key),
            _ => None,
        }
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serialize the subtree under `node` as markup.
    ///
    /// Props render as attributes in insertion order; string values are
    /// written bare, anything else as JSON.
    pub fn to_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    /// Markup of the children of `node`, without `node` itself.
    pub fn inner_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_markup(*child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeData::Element { tag, props } => {
                let _ = write!(out, "<{tag}");
                for (key, value) in props {
                    match value {
                        serde_json::Value::String(s) => {
                            let _ = write!(out, " {key}=\"{s}\"");
                        }
                        other => {
                            let _ = write!(out, " {key}=\"{other}\"");
                        }
                    }
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get_mut(&node).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
    }

    /// Drop a detached subtree from the arena.
    fn free(&mut self, node: NodeId) {
        if let Some(removed) = self.nodes.remove(&node) {
            for child in removed.children {
                self.free(child);
            }
        }
    }
}

impl HostOps for MemoryHost {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.alloc(NodeData::Element {
            tag: tag.to_owned(),
            props: IndexMap::new(),
        });
        self.log.push(HostOp::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.alloc(NodeData::Text(text.to_owned()));
        self.log.push(HostOp::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        let node = self.alloc(NodeData::Comment(text.to_owned()));
        self.log.push(HostOp::CreateComment {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        if let Some(mem) = self.nodes.get_mut(node) {
            match &mut mem.data {
                NodeData::Text(content) | NodeData::Comment(content) => *content = text.to_owned(),
                NodeData::Element { .. } => return,
            }
        }
        self.log.push(HostOp::SetText {
            node: *node,
            text: text.to_owned(),
        });
    }

    fn set_element_text(&mut self, el: &NodeId, text: &str) {
        let old_children = self
            .nodes
            .get_mut(el)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in old_children {
            self.free(child);
        }
        if !text.is_empty() {
            let child = self.alloc(NodeData::Text(text.to_owned()));
            if let Some(mem) = self.nodes.get_mut(&child) {
                mem.parent = Some(*el);
            }
            if let Some(parent) = self.nodes.get_mut(el) {
                parent.children.push(child);
            }
        }
        self.log.push(HostOp::SetElementText {
            node: *el,
            text: text.to_owned(),
        });
    }

    fn insert(&mut self, parent: &NodeId, node: &NodeId, anchor: Option<&NodeId>) {
        self.detach(*node);
        if let Some(mem) = self.nodes.get_mut(node) {
            mem.parent = Some(*parent);
        }
        if let Some(container) = self.nodes.get_mut(parent) {
            let at = anchor
                .and_then(|a| container.children.iter().position(|c| c == a))
                .unwrap_or(container.children.len());
            container.children.insert(at, *node);
        }
        self.log.push(HostOp::Insert {
            parent: *parent,
            node: *node,
            anchor: anchor.copied(),
        });
    }

    fn remove(&mut self, node: &NodeId) {
        self.detach(*node);
        self.free(*node);
        self.log.push(HostOp::Remove { node: *node });
    }

    fn patch_prop(
        &mut self,
        el: &NodeId,
        key: &str,
        _old: Option<&serde_json::Value>,
        new: Option<&serde_json::Value>,
    ) {
        if let Some(NodeData::Element { props, .. }) = self.nodes.get_mut(el).map(|n| &mut n.data) {
            match new {
                Some(value) => {
                    props.insert(key.to_owned(), value.clone());
                }
                None => {
                    props.shift_remove(key);
                }
            }
        }
        self.log.push(HostOp::PatchProp {
            node: *el,
            key: key.to_owned(),
            value: new.cloned(),
        });
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let parent = self.parent(*node)?;
        let siblings = self.children(parent);
        let at = siblings.iter().position(|c| c == node)?;
        siblings.get(at + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_respects_anchor_and_moves() {
        let mut host = MemoryHost::new();
        let root = host.create_root("ul");
        let a = host.create_text("a");
        let b = host.create_text("b");
        let c = host.create_text("c");

        host.insert(&root, &a, None);
        host.insert(&root, &c, None);
        host.insert(&root, &b, Some(&c));
        assert_eq!(host.inner_markup(root), "abc");

        // Re-inserting moves.
        host.insert(&root, &a, None);
        assert_eq!(host.inner_markup(root), "bca");
        assert_eq!(host.next_sibling(&b), Some(c));
        assert_eq!(host.next_sibling(&a), None);
    }

    #[test]
    fn remove_frees_subtree() {
        let mut host = MemoryHost::new();
        let root = host.create_root("div");
        let p = host.create_element("p");
        let t = host.create_text("x");
        host.insert(&p, &t, None);
        host.insert(&root, &p, None);
        assert_eq!(host.node_count(), 3);

        host.remove(&p);
        assert_eq!(host.node_count(), 1);
        assert_eq!(host.to_markup(root), "<div></div>");
    }

    #[test]
    fn markup_includes_props_and_comments() {
        let mut host = MemoryHost::new();
        let root = host.create_root("div");
        host.patch_prop(&root, "id", None, Some(&serde_json::json!("app")));
        host.patch_prop(&root, "tabindex", None, Some(&serde_json::json!(1)));
        let note = host.create_comment("note");
        host.insert(&root, &note, None);
        host.set_element_text(&root, "");

        assert_eq!(host.to_markup(root), "<div id=\"app\" tabindex=\"1\"></div>");
        assert_eq!(host.node_count(), 1);
    }
}
