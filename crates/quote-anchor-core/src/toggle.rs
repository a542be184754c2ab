//! The highlight toggle flow.
//!
//! 1. Selection already carries the mark → hash it and delete every record
//!    with that hash. A selection spanning runs is hashed as the range of
//!    marked runs it covers ([`ToggleRequest::marked`]), so a caret resting
//!    at the start of the following run does not change the identity.
//! 2. Otherwise hash the paths the text will occupy once marked and create
//!    the record. A selection inside one run is shifted with
//!    [`adjust_selection_for_mark`]; a selection spanning runs uses the
//!    range [`set_mark`](crate::selection::set_mark) reports in
//!    [`ToggleRequest::marked`].
//!
//! Because creation hashes the post-split paths, toggling the same text a
//! second time (now selected across its own runs) yields the same hash and
//! removes the record.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::hash::create_highlight_hash;
use crate::models::{Highlight, HighlightRecord, Range};
use crate::selection::adjust_selection_for_mark;
use crate::store::HighlightStore;

/// Everything needed to toggle one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub book: String,
    pub chapter: String,
    pub user: String,
    pub selection: Range,
    /// The selected text.
    pub text: String,
    /// Whether the selection currently carries the highlight mark.
    pub has_mark: bool,
    /// Range of the runs the toggle affects, as returned by
    /// [`set_mark`](crate::selection::set_mark) on the selection. Used when
    /// the selection spans more than one run.
    #[serde(default)]
    pub marked: Option<Range>,
}

fn spans_runs(selection: &Range) -> bool {
    selection.anchor.path != selection.focus.path
}

/// The selection a new highlight is stored (and hashed) under.
fn stored_selection(request: &ToggleRequest) -> Range {
    let selection = &request.selection;
    if !spans_runs(selection) {
        return adjust_selection_for_mark(selection);
    }
    request.marked.clone().unwrap_or_else(|| selection.clone())
}

/// The selection an existing highlight is looked up by.
fn marked_selection(request: &ToggleRequest) -> Range {
    match &request.marked {
        Some(marked) if spans_runs(&request.selection) => marked.clone(),
        _ => request.selection.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Created(HighlightRecord),
    Deleted { hash: String, removed: usize },
}

pub async fn toggle_highlight(store: &dyn HighlightStore, request: ToggleRequest) -> Result<ToggleOutcome> {
    if request.has_mark {
        let selection = marked_selection(&request);
        let hash = create_highlight_hash(&request.book, &request.chapter, &selection, &request.text).await?;
        let removed = store.delete_highlight_by_hash(&hash).await?;
        tracing::debug!(%hash, removed, "highlight removed");
        return Ok(ToggleOutcome::Deleted { hash, removed });
    }

    let selection = stored_selection(&request);
    let hash = create_highlight_hash(&request.book, &request.chapter, &selection, &request.text).await?;
    let record = store
        .create_highlight(Highlight {
            book: request.book,
            chapter: request.chapter,
            text: request.text,
            selection,
            hash,
            user: request.user,
        })
        .await?;
    tracing::debug!(id = %record.id, hash = %record.highlight.hash, "highlight created");
    Ok(ToggleOutcome::Created(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;
    use crate::store::memory::InMemoryHighlightStore;

    fn request(selection: Range, has_mark: bool) -> ToggleRequest {
        ToggleRequest {
            book: "book-1".into(),
            chapter: "ch-3".into(),
            user: "reader".into(),
            selection,
            text: "is blue".into(),
            has_mark,
            marked: None,
        }
    }

    #[tokio::test]
    async fn test_create_uses_adjusted_selection() {
        let store = InMemoryHighlightStore::new();
        let sel = Range::new(Point::new(vec![0, 0], 8), Point::new(vec![0, 0], 15));
        let outcome = toggle_highlight(&store, request(sel, false)).await.unwrap();
        let ToggleOutcome::Created(record) = outcome else {
            panic!("expected a created record");
        };
        assert_eq!(record.highlight.selection.anchor.path, vec![0, 1]);
        let expected = create_highlight_hash("book-1", "ch-3", &record.highlight.selection, "is blue")
            .await
            .unwrap();
        assert_eq!(record.highlight.hash, expected);
    }

    #[tokio::test]
    async fn test_toggle_twice_removes_highlight() {
        let store = InMemoryHighlightStore::new();
        let sel = Range::new(Point::new(vec![0, 0], 8), Point::new(vec![0, 0], 15));
        let ToggleOutcome::Created(record) = toggle_highlight(&store, request(sel, false)).await.unwrap()
        else {
            panic!("expected a created record");
        };
        assert_eq!(store.len(), 1);

        // After the split the text sits in its own run at the shifted path.
        let outcome = toggle_highlight(&store, request(record.highlight.selection.clone(), true))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::Deleted {
                hash: record.highlight.hash,
                removed: 1
            }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cross_run_create_hashes_marked_range() {
        let store = InMemoryHighlightStore::new();
        let sel = Range::new(Point::new(vec![0, 0], 4), Point::new(vec![1, 0], 5));
        let marked = Range::new(Point::new(vec![0, 1], 0), Point::new(vec![1, 0], 5));
        let mut create = request(sel, false);
        create.marked = Some(marked.clone());

        let ToggleOutcome::Created(record) = toggle_highlight(&store, create).await.unwrap() else {
            panic!("expected a created record");
        };
        assert_eq!(record.highlight.selection, marked);

        // Caret resting at the start of the run after the highlight.
        let reselected = Range::new(Point::new(vec![0, 1], 0), Point::new(vec![1, 1], 0));
        let mut delete = request(reselected, true);
        delete.marked = Some(marked);
        let outcome = toggle_highlight(&store, delete).await.unwrap();
        assert!(matches!(outcome, ToggleOutcome::Deleted { removed: 1, .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_unknown_selection_removes_nothing() {
        let store = InMemoryHighlightStore::new();
        let sel = Range::new(Point::new(vec![4, 0], 0), Point::new(vec![4, 0], 3));
        let outcome = toggle_highlight(&store, request(sel, true)).await.unwrap();
        assert!(matches!(outcome, ToggleOutcome::Deleted { removed: 0, .. }));
    }
}
