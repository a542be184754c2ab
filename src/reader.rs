//! One open chapter: document model, rendered DOM, transient highlights
//! and persisted highlights.
//!
//! [`ReaderSession`] is the editor host. It keeps the block model and the
//! rendered [`SharedDom`] in step, turns the current selection into highlight
//! toggles against a [`HighlightStore`], resolves clicks on highlight
//! fragments, and drives the [`HighlightApplicator`] for citations and saved
//! highlights.
//!
//! # Flows
//!
//! | Entry point | Steps |
//! |-------------|-------|
//! | [`toggle_highlight`](ReaderSession::toggle_highlight) | selection → text + mark state → hash → store → mark the model → re-render |
//! | [`handle_click`](ReaderSession::handle_click) | clicked string → adjacent marks → matching runs → selection |
//! | [`go_to_citation`](ReaderSession::go_to_citation) | settle delay → indexed block or best match → 10 s highlight |
//! | [`reveal_highlight`](ReaderSession::reveal_highlight) | block holding the saved text → scroll |

use std::sync::{Arc, Mutex, PoisonError};

use quote_anchor_core::adjacent::{find_highlighted_block, find_matching_marks, resolve_clicked_highlight};
use quote_anchor_core::citation::locate_citation_node;
use quote_anchor_core::dom::NodeId;
use quote_anchor_core::models::{Citation, Document, HighlightRecord, Range};
use quote_anchor_core::render::render_document;
use quote_anchor_core::score::MatchThresholds;
use quote_anchor_core::selection::{range_has_mark, range_text, selection_for_marks, set_mark};
use quote_anchor_core::store::HighlightStore;
use quote_anchor_core::toggle::{toggle_highlight, ToggleOutcome, ToggleRequest};

use crate::applicator::{lock_dom, shared_dom, HighlightApplicator, ScrollOptions, SharedDom, Viewport};
use crate::commands::{CommandReceiver, ReaderCommand};
use crate::config::{Config, HighlightConfig};
use crate::schedule::CleanupHandle;

pub struct ReaderSession {
    book: String,
    chapter: String,
    user: String,
    document: Document,
    dom: SharedDom,
    applicator: HighlightApplicator,
    store: Arc<dyn HighlightStore>,
    highlight: HighlightConfig,
    thresholds: MatchThresholds,
    selection: Option<Range>,
    current_citation: Arc<Mutex<Option<Citation>>>,
}

impl ReaderSession {
    pub fn new(
        book: impl Into<String>,
        chapter: impl Into<String>,
        document: Document,
        store: Arc<dyn HighlightStore>,
        viewport: Arc<dyn Viewport>,
        config: &Config,
    ) -> Self {
        let dom = shared_dom(render_document(&document));
        let applicator = HighlightApplicator::new(dom.clone(), viewport, config.matching).with_scroll(
            ScrollOptions {
                smooth: config.highlight.smooth_scroll,
                center: true,
            },
        );
        Self {
            book: book.into(),
            chapter: chapter.into(),
            user: config.reader.user.clone(),
            document,
            dom,
            applicator,
            store,
            highlight: config.highlight.clone(),
            thresholds: config.matching,
            selection: None,
            current_citation: Arc::new(Mutex::new(None)),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn dom(&self) -> &SharedDom {
        &self.dom
    }

    pub fn applicator(&self) -> &HighlightApplicator {
        &self.applicator
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Range>) {
        self.selection = selection;
    }

    /// The citation currently being shown, cleared when its highlight
    /// times out.
    pub fn current_citation(&self) -> Option<Citation> {
        self.current_citation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new document model (e.g. after the chapter reloads) and
    /// re-render. Any transient highlight is dropped.
    pub fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.rerender();
    }

    fn rerender(&mut self) {
        self.applicator.remove_all_highlights();
        *lock_dom(&self.dom) = render_document(&self.document);
    }

    /// Highlight the current selection, or remove the highlight it carries.
    ///
    /// Returns `None` when there is nothing to toggle (no selection,
    /// collapsed, no text) or when hashing/storage failed; failures are
    /// logged and leave the document untouched.
    pub async fn toggle_highlight(&mut self) -> Option<ToggleOutcome> {
        let selection = self.selection.clone().filter(|s| !s.is_collapsed())?;
        let (start, end) = selection.edges();
        let selection = Range::new(start.clone(), end.clone());
        let text = range_text(&self.document.blocks, &selection);
        if text.is_empty() {
            return None;
        }
        let has_mark = range_has_mark(&self.document.blocks, &selection);

        // Mark a copy first so the hash sees the paths the text ends up at.
        let mut blocks = self.document.blocks.clone();
        let marked = set_mark(&mut blocks, &selection, !has_mark);

        let request = ToggleRequest {
            book: self.book.clone(),
            chapter: self.chapter.clone(),
            user: self.user.clone(),
            selection,
            text,
            has_mark,
            marked: marked.clone(),
        };
        let outcome = match toggle_highlight(self.store.as_ref(), request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "highlight toggle skipped");
                return None;
            }
        };

        self.document.blocks = blocks;
        self.selection = marked;
        self.rerender();
        Some(outcome)
    }

    /// Resolve a click on a rendered string span. A click on a highlight
    /// fragment selects the whole highlight and returns the new selection.
    pub fn handle_click(&mut self, clicked: NodeId) -> Option<Range> {
        let resolved = resolve_clicked_highlight(&lock_dom(&self.dom), clicked)?;
        let marks = find_matching_marks(&self.document.blocks, &resolved.text);
        let selection = selection_for_marks(&marks)?;
        tracing::debug!(text = %resolved.text, marks = marks.len(), "highlight clicked");
        self.selection = Some(selection.clone());
        Some(selection)
    }

    /// Show the passage a citation points at.
    ///
    /// Waits for the render to settle, then tries the block at the
    /// citation's index before scanning the chapter. The highlight clears
    /// itself after the citation timeout, and so does
    /// [`current_citation`](Self::current_citation).
    pub async fn go_to_citation(&self, citation: &Citation) -> Option<CleanupHandle> {
        if citation.chapter != self.chapter {
            tracing::debug!(chapter = %citation.chapter, "citation belongs to another chapter");
            return None;
        }
        *self
            .current_citation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(citation.clone());

        tokio::time::sleep(self.highlight.citation_delay()).await;

        let Some(found) = locate_citation_node(&self.document.blocks, citation, &self.thresholds) else {
            tracing::debug!(quote = %citation.quote, "citation not found in chapter");
            return None;
        };
        tracing::debug!(
            block = %found.node.id,
            positional = found.positional,
            similarity = found.similarity,
            "citation located"
        );

        let current = self.current_citation.clone();
        self.applicator.highlight_block(
            &found.node.id,
            &citation.quote,
            self.highlight.citation_cleanup(),
            Some(Box::new(move || {
                *current.lock().unwrap_or_else(PoisonError::into_inner) = None;
            })),
        )
    }

    /// Scroll to the block holding a saved highlight. Returns its block id.
    pub fn reveal_highlight(&self, record: &HighlightRecord) -> Option<String> {
        if record.highlight.chapter != self.chapter {
            return None;
        }
        let block = find_highlighted_block(&self.document.blocks, &record.highlight.text)?;
        self.applicator.scroll_to_block(&block.id).then(|| block.id.clone())
    }

    /// Briefly highlight `snippet` in a block (search results, previews).
    pub fn flash_snippet(&self, block_id: &str, snippet: &str) -> Option<CleanupHandle> {
        self.applicator
            .highlight_block(block_id, snippet, self.highlight.flash_cleanup(), None)
    }

    /// Apply one command.
    pub async fn dispatch(&mut self, command: ReaderCommand) {
        match command {
            ReaderCommand::ToggleHighlight => {
                self.toggle_highlight().await;
            }
            ReaderCommand::GoToCitation(citation) => {
                self.go_to_citation(&citation).await;
            }
            ReaderCommand::RevealHighlight(record) => {
                self.reveal_highlight(&record);
            }
            ReaderCommand::ClearHighlights => {
                self.applicator.remove_all_highlights();
            }
        }
    }

    /// Drain commands until every sender is dropped.
    pub async fn run(&mut self, mut commands: CommandReceiver) {
        while let Some(command) = commands.recv().await {
            tracing::debug!(?command, "reader command");
            self.dispatch(command).await;
        }
    }
}
