//! Virtual Nodes
//!
//! A `VNode` describes one piece of output: an element, a text run, a
//! comment, or a fragment grouping several siblings without a wrapper.
//!
//! `VNode<N>` is generic over the host's node handle. `el` is `None` until the
//! node is mounted, then holds the host node it realized as. Patching copies
//! `el` from the old node to the new one. Fragments never hold an `el`;
//! their position is that of their first realized child.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identity of a node among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(i64::from(n))
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Int(n as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// Element attributes and properties.
pub type Props = IndexMap<String, serde_json::Value>;

/// What a node realizes as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNodeKind {
    Element(String),
    Text,
    Comment,
    Fragment,
}

/// Content of a node.
///
/// Text and comment nodes carry their content as `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Children<N> {
    Empty,
    Text(String),
    Nodes(Vec<VNode<N>>),
}

impl<N> Default for Children<N> {
    fn default() -> Self {
        Children::Empty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VNode<N> {
    pub kind: VNodeKind,
    pub key: Option<Key>,
    pub props: Props,
    pub children: Children<N>,
    pub el: Option<N>,
}

impl<N> VNode<N> {
    fn new(kind: VNodeKind, children: Children<N>) -> Self {
        Self {
            kind,
            key: None,
            props: Props::new(),
            children,
            el: None,
        }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(VNodeKind::Element(tag.into()), Children::Empty)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(VNodeKind::Text, Children::Text(content.into()))
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(VNodeKind::Comment, Children::Text(content.into()))
    }

    pub fn fragment(children: Vec<VNode<N>>) -> Self {
        Self::new(VNodeKind::Fragment, Children::Nodes(children))
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<VNode<N>>) -> Self {
        self.children = Children::Nodes(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children = Children::Text(text.into());
        self
    }

    /// Whether patching `self` into `other` can reuse the realized node.
    pub fn same_type(&self, other: &VNode<N>) -> bool {
        self.kind == other.kind
    }

    /// Text content of a text or comment node.
    pub fn text_content(&self) -> &str {
        match &self.children {
            Children::Text(text) => text,
            _ => "",
        }
    }

    pub fn child_nodes(&self) -> &[VNode<N>] {
        match &self.children {
            Children::Nodes(nodes) => nodes,
            _ => &[],
        }
    }
}

impl<N: Clone> VNode<N> {
    /// First realized host node, looking inside fragments.
    pub fn first_el(&self) -> Option<N> {
        match self.kind {
            VNodeKind::Fragment => self.child_nodes().iter().find_map(VNode::first_el),
            _ => self.el.clone(),
        }
    }

    /// Last realized host node, looking inside fragments.
    pub fn last_el(&self) -> Option<N> {
        match self.kind {
            VNodeKind::Fragment => self.child_nodes().iter().rev().find_map(VNode::last_el),
            _ => self.el.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_deserialize_untagged() {
        let keys: Vec<Key> = serde_json::from_str(r#"[1, "a"]"#).unwrap();
        assert_eq!(keys, vec![Key::Int(1), Key::from("a")]);
        assert_eq!(Key::from(7).to_string(), "7");
    }

    #[test]
    fn fragment_edges_skip_empty_children() {
        let mut first = VNode::<u32>::text("a");
        first.el = Some(1);
        let mut last = VNode::<u32>::text("b");
        last.el = Some(2);

        let node = VNode::fragment(vec![
            VNode::fragment(Vec::new()),
            first,
            last,
            VNode::fragment(Vec::new()),
        ]);
        assert_eq!(node.first_el(), Some(1));
        assert_eq!(node.last_el(), Some(2));
    }

    #[test]
    fn builders_compose() {
        let node = VNode::<u32>::element("li")
            .with_key("a")
            .with_prop("class", "item")
            .with_text("hello");

        assert_eq!(node.key, Some(Key::from("a")));
        assert_eq!(node.props.get("class"), Some(&serde_json::json!("item")));
        assert_eq!(node.text_content(), "hello");
        assert!(node.same_type(&VNode::element("li")));
        assert!(!node.same_type(&VNode::element("p")));
    }
}
