//! Render a [`Document`] into the DOM structure the editor produces.
//!
//! ```text
//! <p data-block-id="…" data-slate-node="element">
//!   <span data-slate-node="text">
//!     <span data-slate-leaf="true">
//!       [<mark class="slate-highlight">]
//!         <span data-slate-string="true">text</span>
//!       [</mark>]
//!     </span>
//!   </span>
//! </p>
//! ```
//!
//! The highlight applicator and the adjacent-highlight resolver rely on
//! these attribute names and on the fixed depth between a string span and
//! its block element.

use crate::dom::{DomTree, NodeId, Selector};
use crate::models::{BlockNode, Document, InlineRun};

pub const BLOCK_ID_ATTR: &str = "data-block-id";
pub const NODE_ATTR: &str = "data-slate-node";
pub const LEAF_ATTR: &str = "data-slate-leaf";
pub const STRING_ATTR: &str = "data-slate-string";
/// Class of the persistent highlight mark wrapper.
pub const HIGHLIGHT_MARK_CLASS: &str = "slate-highlight";

/// Levels between a `data-slate-string` span and its block element when the
/// run is highlighted: string → mark → leaf → text → block.
pub const STRING_TO_BLOCK_DEPTH: usize = 4;

/// Selector for inline text runs.
pub fn text_run_selector() -> Selector {
    Selector::attr(NODE_ATTR, "text")
}

/// Selector for the literal string span inside a run.
pub fn string_selector() -> Selector {
    Selector::attr(STRING_ATTR, "true")
}

/// Build the `text > leaf > string` wrapper holding `text`.
///
/// Returns `(outer text span, string span)`.
pub fn create_text_run(tree: &mut DomTree, text: &str) -> (NodeId, NodeId) {
    let outer = tree.create_element("span");
    tree.set_attr(outer, NODE_ATTR, "text");
    let leaf = tree.create_element("span");
    tree.set_attr(leaf, LEAF_ATTR, "true");
    let string = tree.create_element("span");
    tree.set_attr(string, STRING_ATTR, "true");
    tree.set_text_content(string, text);
    tree.append_child(leaf, string);
    tree.append_child(outer, leaf);
    (outer, string)
}

fn render_run(tree: &mut DomTree, run: &InlineRun) -> NodeId {
    let (outer, string) = create_text_run(tree, &run.text);
    if run.is_highlighted() {
        let leaf = tree.children(outer)[0];
        let mark = tree.create_element("mark");
        tree.add_class(mark, HIGHLIGHT_MARK_CLASS);
        tree.append_child(leaf, mark);
        tree.append_child(mark, string);
    }
    outer
}

/// Render one block and append it to `parent`.
pub fn render_block(tree: &mut DomTree, parent: NodeId, block: &BlockNode) -> NodeId {
    let element = tree.create_element(&block.kind);
    tree.set_attr(element, BLOCK_ID_ATTR, &block.id);
    tree.set_attr(element, NODE_ATTR, "element");
    for run in &block.children {
        let run = render_run(tree, run);
        tree.append_child(element, run);
    }
    tree.append_child(parent, element);
    element
}

/// Render a whole document under a fresh tree's root.
pub fn render_document(document: &Document) -> DomTree {
    let mut tree = DomTree::new();
    let root = tree.root();
    for block in &document.blocks {
        render_block(&mut tree, root, block);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_structure() {
        let doc = Document::new(vec![BlockNode::new(
            "b1",
            vec![InlineRun::plain("Hello "), InlineRun::highlighted("world")],
        )])
        .unwrap();
        let tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        assert_eq!(tree.text_content(block), "Hello world");
        assert_eq!(tree.query_all(block, &text_run_selector()).len(), 2);

        let strings = tree.query_all(block, &string_selector());
        assert_eq!(strings.len(), 2);
        assert!(tree.parent(strings[0]).is_some_and(|p| !tree.has_class(p, HIGHLIGHT_MARK_CLASS)));
        let mark = tree.parent(strings[1]).unwrap();
        assert!(tree.has_class(mark, HIGHLIGHT_MARK_CLASS));
        assert_eq!(tree.ancestor(strings[1], STRING_TO_BLOCK_DEPTH), Some(block));
    }

    #[test]
    fn test_html_output() {
        let doc = Document::new(vec![BlockNode::paragraph("b1", "Hi")]).unwrap();
        let tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        assert_eq!(
            tree.to_html(block),
            concat!(
                r#"<p data-block-id="b1" data-slate-node="element">"#,
                r#"<span data-slate-node="text"><span data-slate-leaf="true">"#,
                r#"<span data-slate-string="true">Hi</span></span></span></p>"#
            )
        );
    }
}
