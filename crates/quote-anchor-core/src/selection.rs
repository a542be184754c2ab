//! Selection arithmetic over the block model.
//!
//! Applying the highlight mark to a selection that starts mid-run splits
//! that run in two, so the highlighted text moves to the next child index.
//! [`adjust_selection_for_mark`] predicts that shift so the hash computed
//! before the split matches the paths the saved highlight will have;
//! [`set_mark`] performs the split itself on the block model.

use crate::adjacent::MarkRef;
use crate::models::{BlockNode, InlineRun, Point, Range};

/// Shift a selection to where its text lands after the mark splits a run.
///
/// Anchor offset ≠ 0 → `path[1] += 1` on both points, offsets kept.
/// Otherwise, or when either path has fewer than two components, the range
/// is returned unchanged.
///
/// ```rust
/// use quote_anchor_core::models::{Point, Range};
/// use quote_anchor_core::selection::adjust_selection_for_mark;
///
/// let r = Range::new(Point::new(vec![0, 0], 4), Point::new(vec![0, 0], 9));
/// let adjusted = adjust_selection_for_mark(&r);
/// assert_eq!(adjusted.anchor.path, vec![0, 1]);
/// assert_eq!(adjusted.focus.offset, 9);
/// ```
pub fn adjust_selection_for_mark(range: &Range) -> Range {
    if range.anchor.offset == 0 || range.anchor.path.len() < 2 || range.focus.path.len() < 2 {
        return range.clone();
    }
    let mut adjusted = range.clone();
    adjusted.anchor.path[1] += 1;
    adjusted.focus.path[1] += 1;
    adjusted
}

/// The selection covering a resolved set of marks.
///
/// One mark selects its whole run. Several select from the start of the
/// first through offset 0 of the child after the last.
pub fn selection_for_marks(marks: &[MarkRef]) -> Option<Range> {
    let first = marks.first()?;
    let last = marks.last()?;
    let anchor = Point::new(first.path.to_vec(), 0);
    if marks.len() == 1 {
        let focus = Point::new(first.path.to_vec(), first.text.chars().count());
        return Some(Range::new(anchor, focus));
    }
    let focus = Point::new(vec![last.path[0], last.path[1] + 1], 0);
    Some(Range::new(anchor, focus))
}

fn run_key(point: &Point) -> Option<(usize, usize)> {
    match point.path.as_slice() {
        [b, c, ..] => Some((*b, *c)),
        _ => None,
    }
}

/// Runs touched by `range`, with the char span selected in each.
fn touched_runs<'a>(
    nodes: &'a [BlockNode],
    range: &Range,
) -> Vec<(&'a InlineRun, usize, usize)> {
    let (start, end) = range.edges();
    let (Some(start_key), Some(end_key)) = (run_key(start), run_key(end)) else {
        return Vec::new();
    };

    let mut touched = Vec::new();
    for (b, block) in nodes.iter().enumerate() {
        for (c, run) in block.children.iter().enumerate() {
            let key = (b, c);
            if key < start_key || key > end_key {
                continue;
            }
            let len = run.text.chars().count();
            let from = if key == start_key { start.offset.min(len) } else { 0 };
            let to = if key == end_key { end.offset.min(len) } else { len };
            touched.push((run, from, to.max(from)));
        }
    }
    touched
}

/// The text a range covers, concatenated across runs and blocks.
pub fn range_text(nodes: &[BlockNode], range: &Range) -> String {
    touched_runs(nodes, range)
        .into_iter()
        .map(|(run, from, to)| run.text.chars().skip(from).take(to - from).collect::<String>())
        .collect()
}

/// True when every run the range touches carries the highlight mark.
///
/// A collapsed range tests the run it sits in. For an expanded range, runs
/// contributing no characters at either edge are ignored.
pub fn range_has_mark(nodes: &[BlockNode], range: &Range) -> bool {
    let touched = touched_runs(nodes, range);
    let relevant: Vec<_> = if range.is_collapsed() {
        touched
    } else {
        touched.into_iter().filter(|(_, from, to)| to > from).collect()
    };
    !relevant.is_empty() && relevant.iter().all(|(run, _, _)| run.is_highlighted())
}

/// Set or clear the highlight mark over `range`, splitting runs at its
/// edges the way the editor does.
///
/// Empty pieces are dropped, so a range starting at offset 0 keeps its
/// child index and one starting mid-run moves to the next index. Returns
/// the range now covering the affected text (start of the first affected
/// piece to the end of the last), or `None` when the range touches no
/// text.
pub fn set_mark(blocks: &mut [BlockNode], range: &Range, highlight: bool) -> Option<Range> {
    let (start, end) = range.edges();
    let (start_key, end_key) = (run_key(start)?, run_key(end)?);

    let mut first: Option<Point> = None;
    let mut last: Option<Point> = None;

    for (b, block) in blocks.iter_mut().enumerate() {
        if b < start_key.0 || b > end_key.0 {
            continue;
        }
        let mut children = Vec::with_capacity(block.children.len() + 2);
        for (c, run) in block.children.drain(..).enumerate() {
            let key = (b, c);
            if key < start_key || key > end_key {
                children.push(run);
                continue;
            }
            let chars: Vec<char> = run.text.chars().collect();
            let from = if key == start_key { start.offset.min(chars.len()) } else { 0 };
            let to = if key == end_key { end.offset.min(chars.len()) } else { chars.len() };
            if to <= from {
                children.push(run);
                continue;
            }

            let piece = |a: usize, z: usize| chars[a..z].iter().collect::<String>();
            if from > 0 {
                children.push(InlineRun {
                    text: piece(0, from),
                    highlight: run.highlight,
                });
            }
            let marked_at = vec![b, children.len()];
            children.push(InlineRun {
                text: piece(from, to),
                highlight,
            });
            if first.is_none() {
                first = Some(Point::new(marked_at.clone(), 0));
            }
            last = Some(Point::new(marked_at, to - from));
            if to < chars.len() {
                children.push(InlineRun {
                    text: piece(to, chars.len()),
                    highlight: run.highlight,
                });
            }
        }
        block.children = children;
    }

    Some(Range::new(first?, last?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(a: (Vec<usize>, usize), f: (Vec<usize>, usize)) -> Range {
        Range::new(Point::new(a.0, a.1), Point::new(f.0, f.1))
    }

    fn nodes() -> Vec<BlockNode> {
        vec![
            BlockNode::new(
                "b0",
                vec![InlineRun::plain("The sky "), InlineRun::highlighted("is blue"), InlineRun::plain(".")],
            ),
            BlockNode::new("b1", vec![InlineRun::highlighted("Grass"), InlineRun::plain(" is green")]),
        ]
    }

    #[test]
    fn test_adjust_mid_run_selection() {
        let adjusted = adjust_selection_for_mark(&r((vec![2, 0], 4), (vec![2, 0], 9)));
        assert_eq!(adjusted, r((vec![2, 1], 4), (vec![2, 1], 9)));
    }

    #[test]
    fn test_adjust_run_start_is_unchanged() {
        let sel = r((vec![2, 0], 0), (vec![2, 0], 9));
        assert_eq!(adjust_selection_for_mark(&sel), sel);
    }

    #[test]
    fn test_adjust_short_path_is_unchanged() {
        let sel = r((vec![2], 3), (vec![2], 5));
        assert_eq!(adjust_selection_for_mark(&sel), sel);
    }

    #[test]
    fn test_adjust_shifts_focus_in_other_block() {
        let adjusted = adjust_selection_for_mark(&r((vec![0, 0], 2), (vec![3, 2], 1)));
        assert_eq!(adjusted.anchor.path, vec![0, 1]);
        assert_eq!(adjusted.focus.path, vec![3, 3]);
        assert_eq!(adjusted.focus.offset, 1);
    }

    #[test]
    fn test_selection_for_single_mark() {
        let marks = vec![MarkRef {
            path: [1, 0],
            block_id: "b1".into(),
            text: "Grass".into(),
        }];
        assert_eq!(
            selection_for_marks(&marks).unwrap(),
            r((vec![1, 0], 0), (vec![1, 0], 5))
        );
    }

    #[test]
    fn test_selection_for_several_marks() {
        let marks = vec![
            MarkRef {
                path: [0, 1],
                block_id: "b0".into(),
                text: "is blue".into(),
            },
            MarkRef {
                path: [1, 0],
                block_id: "b1".into(),
                text: "Grass".into(),
            },
        ];
        assert_eq!(
            selection_for_marks(&marks).unwrap(),
            r((vec![0, 1], 0), (vec![1, 1], 0))
        );
        assert!(selection_for_marks(&[]).is_none());
    }

    #[test]
    fn test_range_text_within_and_across_runs() {
        let nodes = nodes();
        assert_eq!(range_text(&nodes, &r((vec![0, 0], 4), (vec![0, 0], 7))), "sky");
        assert_eq!(range_text(&nodes, &r((vec![0, 0], 4), (vec![0, 1], 2))), "sky is");
        // Backward selections read in document order.
        assert_eq!(range_text(&nodes, &r((vec![1, 0], 5), (vec![0, 2], 0))), ".Grass");
    }

    #[test]
    fn test_range_has_mark() {
        let nodes = nodes();
        assert!(range_has_mark(&nodes, &r((vec![0, 1], 0), (vec![0, 1], 7))));
        assert!(range_has_mark(&nodes, &r((vec![0, 1], 0), (vec![0, 2], 0))));
        assert!(!range_has_mark(&nodes, &r((vec![0, 0], 4), (vec![0, 1], 2))));
        assert!(range_has_mark(&nodes, &r((vec![1, 0], 2), (vec![1, 0], 2))));
        assert!(!range_has_mark(&nodes, &r((vec![9, 0], 0), (vec![9, 0], 1))));
    }

    #[test]
    fn test_set_mark_mid_run_matches_adjusted_paths() {
        let mut blocks = vec![BlockNode::paragraph("b0", "The sky is blue.")];
        let sel = r((vec![0, 0], 8), (vec![0, 0], 15));
        let marked = set_mark(&mut blocks, &sel, true).unwrap();

        let texts: Vec<&str> = blocks[0].children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["The sky ", "is blue", "."]);
        assert!(blocks[0].children[1].is_highlighted());
        assert_eq!(marked, r((vec![0, 1], 0), (vec![0, 1], 7)));
        assert_eq!(adjust_selection_for_mark(&sel).anchor.path, marked.anchor.path);
    }

    #[test]
    fn test_set_mark_from_run_start_keeps_index() {
        let mut blocks = vec![BlockNode::paragraph("b0", "Grass is green")];
        let marked = set_mark(&mut blocks, &r((vec![0, 0], 0), (vec![0, 0], 5)), true).unwrap();
        assert_eq!(marked.anchor.path, vec![0, 0]);
        assert_eq!(blocks[0].children.len(), 2);
        assert_eq!(range_text(&blocks, &marked), "Grass");
    }

    #[test]
    fn test_set_mark_across_blocks_and_clear() {
        let mut blocks = nodes();
        let marked = set_mark(&mut blocks, &r((vec![0, 0], 4), (vec![1, 1], 3)), true).unwrap();
        assert!(range_has_mark(&blocks, &marked));
        assert_eq!(range_text(&blocks, &marked), "sky is blue.Grass is");

        let cleared = set_mark(&mut blocks, &marked, false).unwrap();
        assert!(!range_has_mark(&blocks, &cleared));
        assert_eq!(blocks[0].text(), "The sky is blue.");
    }

    #[test]
    fn test_set_mark_collapsed_is_none() {
        let mut blocks = nodes();
        assert!(set_mark(&mut blocks, &r((vec![0, 0], 2), (vec![0, 0], 2)), true).is_none());
        assert_eq!(blocks, nodes());
    }
}
