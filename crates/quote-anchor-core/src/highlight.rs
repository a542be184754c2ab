//! Locate a snippet inside a rendered block and splice in a marker span.
//!
//! This is the synchronous half of the highlight applicator: every function
//! here takes the tree by `&mut` and finishes within one call. Timers,
//! scrolling and shared state live in the app crate.
//!
//! # Algorithm
//!
//! 1. Enumerate the block's text runs (`[data-slate-node="text"]`). None → stop.
//! 2. Several runs: concatenate their text and replace them with one
//!    consolidated `text > leaf > string` wrapper, because re-rendering can
//!    split a sentence across runs and the search must see all of it.
//!    Search the citation-normalized snippet in the citation-normalized
//!    combined text.
//! 3. One run: require [`text_similarity_with`] ≥ the single-run threshold,
//!    then search the same way inside that run's string span.
//! 4. On a hit, map the normalized match back to raw text and rewrite the
//!    target as `before`, `<span class="highlighted-text">match</span>`,
//!    `after`. On a miss nothing is spliced.

use crate::dom::{DomTree, NodeId, Selector};
use crate::normalize::{normalize_text, normalize_with_offsets, NormalizeMode};
use crate::render::{create_text_run, string_selector, text_run_selector};
use crate::score::{text_similarity_with, MatchThresholds};

/// Class of the transient marker span.
pub const MARKER_CLASS: &str = "highlighted-text";
/// Presentation classes added alongside [`MARKER_CLASS`].
pub const MARKER_STYLE: &str = "bg-yellow-200 text-yellow-900";

/// Lifecycle of a transient highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightPhase {
    #[default]
    Idle,
    /// Runs enumerated (and consolidated if needed), snippet not yet placed.
    Located,
    /// Marker inserted, cleanup pending.
    Spliced,
    /// Cleanup timer fired, markers being removed.
    Cleaning,
}

/// Result of a successful splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// The block element the snippet was found in.
    pub block: NodeId,
    /// The inserted marker span.
    pub marker: NodeId,
    /// The raw text wrapped by the marker.
    pub highlighted: String,
    /// Whether several runs were merged first.
    pub consolidated: bool,
}

/// Build a marker span holding `text`.
pub fn create_marker(tree: &mut DomTree, text: &str) -> NodeId {
    let span = tree.create_element("span");
    tree.set_attr(span, "class", &format!("{} {}", MARKER_CLASS, MARKER_STYLE));
    tree.set_text_content(span, text);
    span
}

/// Replace every marker in the tree with its plain text and merge the
/// resulting adjacent text nodes. Returns how many markers were removed.
pub fn remove_markers(tree: &mut DomTree) -> usize {
    let markers = tree.query_all(tree.root(), &Selector::class(MARKER_CLASS));
    let mut removed = 0;
    for marker in markers {
        let Some(parent) = tree.parent(marker) else {
            continue;
        };
        let text = tree.text_content(marker);
        let replacement = tree.create_text(&text);
        if tree.replace_child(parent, replacement, marker) {
            tree.normalize(parent);
            removed += 1;
        }
    }
    removed
}

/// Rewrite `target`'s content as `before` / marker / `after`, where the
/// marker wraps `original[range]`.
pub fn splice_marker(
    tree: &mut DomTree,
    target: NodeId,
    original: &str,
    range: std::ops::Range<usize>,
) -> NodeId {
    let before = &original[..range.start];
    let highlighted = &original[range.clone()];
    let after = &original[range.end..];

    tree.clear_children(target);
    if !before.is_empty() {
        let node = tree.create_text(before);
        tree.append_child(target, node);
    }
    let marker = create_marker(tree, highlighted);
    tree.append_child(target, marker);
    if !after.is_empty() {
        let node = tree.create_text(after);
        tree.append_child(target, node);
    }
    marker
}

/// Merge several text runs into one, appended to the first run's parent.
///
/// Returns the new string span, or `None` when there is nothing to merge
/// (fewer than two runs) or the runs are detached.
pub fn consolidate_text_runs(tree: &mut DomTree, runs: &[NodeId]) -> Option<NodeId> {
    if runs.len() <= 1 {
        return None;
    }
    let combined: String = runs.iter().map(|r| tree.text_content(*r)).collect();
    let parent = tree.parent_element(runs[0]);

    for run in runs {
        tree.detach(*run);
    }

    let parent = parent?;
    let (outer, string) = create_text_run(tree, &combined);
    tree.append_child(parent, outer);
    Some(string)
}

/// Find `snippet` in `block` and splice a marker around it.
///
/// Pure locate+splice; does not clear pre-existing markers (callers do that
/// first) and schedules nothing. `on_located` is invoked once runs are
/// enumerated, so callers can track [`HighlightPhase::Located`].
pub fn highlight_in_block(
    tree: &mut DomTree,
    block: NodeId,
    snippet: &str,
    thresholds: &MatchThresholds,
    mut on_located: impl FnMut(),
) -> Option<Splice> {
    let runs = tree.query_all(block, &text_run_selector());
    let needle = normalize_text(snippet, NormalizeMode::Citation);
    if runs.is_empty() || needle.is_empty() {
        tracing::debug!(runs = runs.len(), "nothing to search in block");
        return None;
    }

    let consolidated = runs.len() > 1;
    let target = if consolidated {
        consolidate_text_runs(tree, &runs)?
    } else {
        tree.query(runs[0], &string_selector())?
    };
    on_located();

    let original = tree.text_content(target);
    if !consolidated {
        let similarity = text_similarity_with(
            &needle,
            &normalize_text(&original, NormalizeMode::Citation),
            thresholds,
        );
        if similarity < thresholds.single_run_similarity {
            tracing::debug!(similarity, "single run does not resemble snippet");
            return None;
        }
    }

    let haystack = normalize_with_offsets(&original, NormalizeMode::Citation);
    let Some(range) = haystack.find_raw(&needle) else {
        tracing::debug!(snippet, "snippet not found in block text");
        return None;
    };

    let highlighted = original[range.clone()].to_string();
    let marker = splice_marker(tree, target, &original, range);
    Some(Splice {
        block,
        marker,
        highlighted,
        consolidated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockNode, Document, InlineRun};
    use crate::render::render_document;

    fn fox_tree() -> (DomTree, NodeId) {
        let doc = Document::new(vec![BlockNode::new(
            "b1",
            vec![
                InlineRun::plain("The quick "),
                InlineRun::plain("brown "),
                InlineRun::plain("fox jumps"),
            ],
        )])
        .unwrap();
        let tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        (tree, block)
    }

    fn markers(tree: &DomTree) -> Vec<NodeId> {
        tree.query_all(tree.root(), &Selector::class(MARKER_CLASS))
    }

    #[test]
    fn test_multi_run_consolidates_and_wraps_exact_snippet() {
        let (mut tree, block) = fox_tree();
        let mut located = false;
        let splice = highlight_in_block(&mut tree, block, "fox", &MatchThresholds::default(), || {
            located = true
        })
        .unwrap();
        assert!(located);
        assert!(splice.consolidated);
        assert_eq!(splice.highlighted, "fox");
        assert_eq!(tree.text_content(splice.marker), "fox");
        assert_eq!(tree.query_all(block, &text_run_selector()).len(), 1);
        assert_eq!(tree.text_content(block), "The quick brown fox jumps");

        let string = tree.query(block, &string_selector()).unwrap();
        let parts: Vec<String> = tree
            .children(string)
            .iter()
            .map(|c| tree.text_content(*c))
            .collect();
        assert_eq!(parts, vec!["The quick brown ", "fox", " jumps"]);
    }

    #[test]
    fn test_single_run_match() {
        let doc =
            Document::new(vec![BlockNode::paragraph("b1", "Call me Ishmael. Some years ago")])
                .unwrap();
        let mut tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        let splice =
            highlight_in_block(&mut tree, block, "call me ishmael", &MatchThresholds::default(), || {})
                .unwrap();
        assert!(!splice.consolidated);
        assert_eq!(splice.highlighted, "Call me Ishmael");
    }

    #[test]
    fn test_punctuation_inside_match_is_preserved() {
        let doc = Document::new(vec![BlockNode::paragraph("b1", "Well, “really” now")]).unwrap();
        let mut tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        let splice =
            highlight_in_block(&mut tree, block, "well really", &MatchThresholds::default(), || {})
                .unwrap();
        assert_eq!(splice.highlighted, "Well, “really");
    }

    #[test]
    fn test_miss_is_noop_for_single_run() {
        let doc = Document::new(vec![BlockNode::paragraph("b1", "nothing relevant")]).unwrap();
        let mut tree = render_document(&doc);
        let block = tree.find_block("b1").unwrap();
        let before = tree.to_html(block);
        assert!(highlight_in_block(&mut tree, block, "fox", &MatchThresholds::default(), || {}).is_none());
        assert_eq!(tree.to_html(block), before);
    }

    #[test]
    fn test_no_runs_returns_none() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p);
        assert!(highlight_in_block(&mut tree, p, "x", &MatchThresholds::default(), || {}).is_none());
    }

    #[test]
    fn test_consolidate_requires_parent() {
        let mut tree = DomTree::new();
        let (a, _) = create_text_run(&mut tree, "a");
        let (b, _) = create_text_run(&mut tree, "b");
        assert!(consolidate_text_runs(&mut tree, &[a, b]).is_none());
        assert!(consolidate_text_runs(&mut tree, &[a]).is_none());
    }

    #[test]
    fn test_remove_markers_restores_text() {
        let (mut tree, block) = fox_tree();
        highlight_in_block(&mut tree, block, "brown fox", &MatchThresholds::default(), || {}).unwrap();
        assert_eq!(markers(&tree).len(), 1);
        assert_eq!(remove_markers(&mut tree), 1);
        assert!(markers(&tree).is_empty());
        let string = tree.query(block, &string_selector()).unwrap();
        assert_eq!(tree.children(string).len(), 1);
        assert_eq!(tree.text_content(block), "The quick brown fox jumps");
        assert_eq!(remove_markers(&mut tree), 0);
    }
}
