//! Resolve a clicked highlight fragment into the whole logical highlight.
//!
//! A persisted highlight can span several blocks; the renderer then shows
//! one `mark.slate-highlight` per block. Clicking any fragment must select
//! the whole highlight, so the resolver looks at the neighbouring blocks for
//! a mark that continues the clicked one (trailing text of the previous
//! block, leading text of the next) and stitches the text together. The
//! combined string is then matched against the document model's own
//! highlighted runs.

use crate::dom::{DomTree, NodeId, Selector};
use crate::models::BlockNode;
use crate::render::{HIGHLIGHT_MARK_CLASS, STRING_TO_BLOCK_DEPTH};

/// Highlight marks continuing into the neighbouring blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjacentHighlights {
    pub previous: Option<NodeId>,
    pub next: Option<NodeId>,
}

/// A clicked highlight fragment resolved to its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickedHighlight {
    pub block: NodeId,
    pub adjacent: AdjacentHighlights,
    /// Previous fragment + clicked text + next fragment.
    pub text: String,
}

/// A highlighted inline run of the document model and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRef {
    /// `[block index, child index]`.
    pub path: [usize; 2],
    pub block_id: String,
    pub text: String,
}

fn mark_selector() -> Selector {
    Selector::class(HIGHLIGHT_MARK_CLASS)
}

/// Walk the siblings of `block` looking for marks that continue it.
///
/// Siblings with only whitespace are skipped. The first sibling with text
/// ends the walk in that direction; its mark is recorded only when the mark
/// is the sibling's trailing text (previous side) or leading text (next
/// side).
pub fn find_adjacent_highlights(tree: &DomTree, block: NodeId) -> AdjacentHighlights {
    AdjacentHighlights {
        previous: walk(tree, block, false),
        next: walk(tree, block, true),
    }
}

fn walk(tree: &DomTree, block: NodeId, forward: bool) -> Option<NodeId> {
    let step = |n: NodeId| {
        if forward {
            tree.next_sibling(n)
        } else {
            tree.previous_sibling(n)
        }
    };

    let mut current = step(block);
    while let Some(sibling) = current {
        let marks = tree.query_all(sibling, &mark_selector());
        let mark = if forward { marks.first() } else { marks.last() };
        let sibling_text = tree.text_content(sibling);
        let sibling_text = sibling_text.trim();

        if let Some(&mark) = mark {
            let mark_text = tree.text_content(mark);
            let mark_text = mark_text.trim();
            let continues = if forward {
                sibling_text.starts_with(mark_text)
            } else {
                sibling_text.ends_with(mark_text)
            };
            return continues.then_some(mark);
        }
        if !sibling_text.is_empty() {
            return None;
        }
        current = step(sibling);
    }
    None
}

/// `previous + base + next`, skipping absent sides.
pub fn combine_highlight_text(tree: &DomTree, base: &str, adjacent: &AdjacentHighlights) -> String {
    let mut combined = String::new();
    if let Some(prev) = adjacent.previous {
        combined.push_str(&tree.text_content(prev));
    }
    combined.push_str(base);
    if let Some(next) = adjacent.next {
        combined.push_str(&tree.text_content(next));
    }
    combined
}

/// Resolve a click on `clicked` (normally a `data-slate-string` span).
///
/// Returns `None` unless the clicked element sits directly inside a
/// highlight mark.
pub fn resolve_clicked_highlight(tree: &DomTree, clicked: NodeId) -> Option<ClickedHighlight> {
    let wrapper = tree.parent_element(clicked)?;
    if !tree.has_class(wrapper, HIGHLIGHT_MARK_CLASS) {
        return None;
    }
    let block = tree.ancestor(clicked, STRING_TO_BLOCK_DEPTH)?;
    let adjacent = find_adjacent_highlights(tree, block);
    let text = combine_highlight_text(tree, &tree.text_content(clicked), &adjacent);
    Some(ClickedHighlight {
        block,
        adjacent,
        text,
    })
}

/// Highlighted runs whose text is contained in `highlight_text`, in
/// document order.
pub fn find_matching_marks(nodes: &[BlockNode], highlight_text: &str) -> Vec<MarkRef> {
    let mut marks = Vec::new();
    for (b, block) in nodes.iter().enumerate() {
        for (c, run) in block.children.iter().enumerate() {
            if run.is_highlighted() && highlight_text.contains(run.text.as_str()) {
                marks.push(MarkRef {
                    path: [b, c],
                    block_id: block.id.clone(),
                    text: run.text.clone(),
                });
            }
        }
    }
    marks
}

/// The last block holding a highlighted run whose text equals `text`.
pub fn find_highlighted_block<'a>(nodes: &'a [BlockNode], text: &str) -> Option<&'a BlockNode> {
    nodes
        .iter()
        .rev()
        .find(|n| n.children.iter().any(|c| c.is_highlighted() && c.text == text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, InlineRun};
    use crate::render::{render_document, string_selector};

    fn nodes() -> Vec<BlockNode> {
        vec![
            BlockNode::new(
                "b0",
                vec![InlineRun::plain("Intro. "), InlineRun::highlighted("It was the best")],
            ),
            BlockNode::paragraph("gap", "   "),
            BlockNode::new(
                "b1",
                vec![InlineRun::highlighted("of times,"), InlineRun::plain(" it was")],
            ),
            BlockNode::new(
                "b2",
                vec![InlineRun::highlighted("the worst"), InlineRun::plain(" of times.")],
            ),
            BlockNode::new(
                "b3",
                vec![InlineRun::plain("Other "), InlineRun::highlighted("note"), InlineRun::plain(" here")],
            ),
        ]
    }

    fn clicked_string(tree: &DomTree, block_id: &str) -> NodeId {
        let block = tree.find_block(block_id).unwrap();
        tree.query_all(block, &string_selector())
            .into_iter()
            .find(|s| {
                tree.parent(*s)
                    .is_some_and(|p| tree.has_class(p, HIGHLIGHT_MARK_CLASS))
            })
            .unwrap()
    }

    #[test]
    fn test_previous_continuation_across_whitespace_block() {
        let doc = Document::new(nodes()).unwrap();
        let tree = render_document(&doc);
        let clicked = clicked_string(&tree, "b1");
        let resolved = resolve_clicked_highlight(&tree, clicked).unwrap();

        assert_eq!(resolved.block, tree.find_block("b1").unwrap());
        assert!(resolved.adjacent.previous.is_some());
        // b2 leads with a mark, so it continues the highlight.
        assert!(resolved.adjacent.next.is_some());
        assert_eq!(resolved.text, "It was the bestof times,the worst");
    }

    #[test]
    fn test_non_continuing_neighbours_are_ignored() {
        let doc = Document::new(vec![
            BlockNode::new("a", vec![InlineRun::highlighted("mark"), InlineRun::plain(" tail")]),
            BlockNode::new("b", vec![InlineRun::highlighted("middle")]),
            BlockNode::new("c", vec![InlineRun::plain("head "), InlineRun::highlighted("mark")]),
        ])
        .unwrap();
        let tree = render_document(&doc);
        let clicked = clicked_string(&tree, "b");
        let resolved = resolve_clicked_highlight(&tree, clicked).unwrap();
        assert_eq!(resolved.adjacent, AdjacentHighlights::default());
        assert_eq!(resolved.text, "middle");
    }

    #[test]
    fn test_plain_text_neighbour_stops_walk() {
        let doc = Document::new(vec![
            BlockNode::new("a", vec![InlineRun::highlighted("far")]),
            BlockNode::paragraph("plain", "words"),
            BlockNode::new("b", vec![InlineRun::highlighted("clicked")]),
        ])
        .unwrap();
        let tree = render_document(&doc);
        let block = tree.find_block("b").unwrap();
        assert!(find_adjacent_highlights(&tree, block).previous.is_none());
    }

    #[test]
    fn test_click_outside_mark_is_noop() {
        let doc = Document::new(nodes()).unwrap();
        let tree = render_document(&doc);
        let block = tree.find_block("b0").unwrap();
        let plain = tree.query(block, &string_selector()).unwrap();
        assert!(resolve_clicked_highlight(&tree, plain).is_none());
    }

    #[test]
    fn test_find_matching_marks_in_order() {
        let marks = find_matching_marks(&nodes(), "It was the bestof times,the worst");
        let paths: Vec<[usize; 2]> = marks.iter().map(|m| m.path).collect();
        assert_eq!(paths, vec![[0, 1], [2, 0], [3, 0]]);
        assert_eq!(marks[1].block_id, "b1");
    }

    #[test]
    fn test_find_highlighted_block() {
        let nodes = nodes();
        assert_eq!(find_highlighted_block(&nodes, "note").unwrap().id, "b3");
        assert!(find_highlighted_block(&nodes, "Other ").is_none());
    }
}
