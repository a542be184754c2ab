//! A minimal DOM as a plain value.
//!
//! [`DomTree`] is an arena of element and text nodes addressed by
//! [`NodeId`]. It supports exactly what the highlight engine needs from a
//! browser DOM: attribute/class selectors, parent and sibling navigation,
//! `textContent`, child replacement, and `normalize()`. Keeping it a value
//! lets locate/consolidate/splice run as ordinary functions in tests; the
//! app crate shares one tree behind a mutex and re-queries it on every
//! operation instead of caching node ids across renders.
//!
//! Detached nodes stay in the arena (ids are never reused) but are no
//! longer reachable from the root.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Index of a node inside a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Simple selectors: `[name="value"]`, `[name]` and `.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Attr { name: String, value: String },
    HasAttr(String),
    Class(String),
}

impl Selector {
    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attr {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }
}

#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// A tree with a single `<div>` root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create_element("div");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Text(_))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Set an attribute. No-op on text nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(id).kind {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        match selector {
            Selector::Attr { name, value } => self.attr(id, name) == Some(value.as_str()),
            Selector::HasAttr(name) => self.attr(id, name).is_some(),
            Selector::Class(class) => self.has_class(id, class),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    /// Parent, but only if it is an element (mirrors `parentElement`).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| !self.is_text(*p))
    }

    /// The `n`-th ancestor (`n = 1` is the parent).
    pub fn ancestor(&self, id: NodeId, n: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..n {
            current = self.parent(current)?;
        }
        Some(current)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    fn sibling(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        if forward {
            siblings.get(pos + 1).copied()
        } else {
            pos.checked_sub(1).map(|p| siblings[p])
        }
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, false)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, true)
    }

    /// True when `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Concatenated text of `id` and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.data(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replace all content of `id` with a single text node (or set the text
    /// of a text node).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(t) = &mut self.data_mut(id).kind {
            *t = text.to_string();
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Detach every child of `id` (`innerHTML = ""`).
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.data_mut(id).children);
        for child in children {
            self.data_mut(child).parent = None;
        }
    }

    /// Remove `id` from its parent, if it has one.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.data_mut(id).parent.take() {
            self.data_mut(parent).children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Put `new` where `old` is in `parent`'s children. Returns false if
    /// `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> bool {
        let Some(pos) = self.children(parent).iter().position(|c| *c == old) else {
            return false;
        };
        self.detach(new);
        self.data_mut(parent).children[pos] = new;
        self.data_mut(new).parent = Some(parent);
        self.data_mut(old).parent = None;
        true
    }

    /// Merge adjacent text nodes and drop empty ones under `id`, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            match self.data(child).kind.clone() {
                NodeKind::Text(text) => {
                    if text.is_empty() {
                        self.data_mut(child).parent = None;
                        continue;
                    }
                    let merged = match kept.last() {
                        Some(&last) => match &mut self.data_mut(last).kind {
                            NodeKind::Text(prev) => {
                                prev.push_str(&text);
                                true
                            }
                            NodeKind::Element { .. } => false,
                        },
                        None => false,
                    };
                    if merged {
                        self.data_mut(child).parent = None;
                    } else {
                        kept.push(child);
                    }
                }
                NodeKind::Element { .. } => {
                    self.normalize(child);
                    kept.push(child);
                }
            }
        }

        self.data_mut(id).children = kept;
    }

    /// Descendants of `id` in document order (pre-order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// `querySelectorAll` scoped to the descendants of `scope`.
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.matches(*n, selector))
            .collect()
    }

    /// `querySelector` scoped to the descendants of `scope`.
    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Find the rendered element of a document block.
    pub fn find_block(&self, block_id: &str) -> Option<NodeId> {
        self.query(self.root, &Selector::attr("data-block-id", block_id))
    }

    /// Serialize the subtree under `id` (inclusive) as HTML.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialize only the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match &self.data(id).kind {
            NodeKind::Text(t) => out.push_str(&escape(t, false)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.set_attr(p, "data-block-id", "b1");
        tree.append_child(tree.root(), p);
        let a = tree.create_text("Hello ");
        let em = tree.create_element("em");
        tree.add_class(em, "x");
        let b = tree.create_text("world");
        tree.append_child(p, a);
        tree.append_child(p, em);
        tree.append_child(em, b);
        (tree, p, a, em)
    }

    #[test]
    fn test_text_content_and_html() {
        let (tree, p, _, _) = sample();
        assert_eq!(tree.text_content(p), "Hello world");
        assert_eq!(
            tree.to_html(p),
            r#"<p data-block-id="b1">Hello <em class="x">world</em></p>"#
        );
    }

    #[test]
    fn test_queries() {
        let (tree, p, _, em) = sample();
        assert_eq!(tree.find_block("b1"), Some(p));
        assert_eq!(tree.query(tree.root(), &Selector::class("x")), Some(em));
        assert!(tree.find_block("nope").is_none());
        assert_eq!(
            tree.query_all(tree.root(), &Selector::HasAttr("data-block-id".into())),
            vec![p]
        );
    }

    #[test]
    fn test_siblings_and_ancestors() {
        let (tree, p, a, em) = sample();
        assert_eq!(tree.next_sibling(a), Some(em));
        assert_eq!(tree.previous_sibling(em), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
        let inner = tree.children(em)[0];
        assert_eq!(tree.ancestor(inner, 2), Some(p));
        assert_eq!(tree.parent_element(inner), Some(em));
    }

    #[test]
    fn test_replace_and_normalize() {
        let (mut tree, p, _, em) = sample();
        let text = tree.create_text("world");
        assert!(tree.replace_child(p, text, em));
        assert!(!tree.is_attached(em));
        assert_eq!(tree.children(p).len(), 2);
        tree.normalize(p);
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.text_content(p), "Hello world");
    }

    #[test]
    fn test_set_text_content_replaces_children() {
        let (mut tree, p, _, _) = sample();
        tree.set_text_content(p, "plain");
        assert_eq!(tree.inner_html(p), "plain");
        tree.set_text_content(p, "");
        assert!(tree.children(p).is_empty());
    }

    #[test]
    fn test_escape() {
        let mut tree = DomTree::new();
        let s = tree.create_element("span");
        tree.set_attr(s, "title", "a\"b");
        let t = tree.create_text("<&>");
        tree.append_child(s, t);
        assert_eq!(tree.to_html(s), r#"<span title="a&quot;b">&lt;&amp;&gt;</span>"#);
    }
}
