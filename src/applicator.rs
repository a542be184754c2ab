//! Transient highlight applicator over a shared DOM.
//!
//! Wraps the synchronous splice in [`quote_anchor_core::highlight`] with the
//! parts that need a runtime: scrolling the block into view, the timed
//! cleanup and phase tracking.
//!
//! # Lifecycle
//!
//! | Phase | Entered when |
//! |-------|--------------|
//! | `Idle` | nothing shown, or cleanup finished |
//! | `Located` | text runs enumerated (and consolidated) in the block |
//! | `Spliced` | marker inserted, cleanup timer pending |
//! | `Cleaning` | timer fired, `on_complete` and marker removal running |
//!
//! Only one transient highlight exists at a time. Every apply clears all
//! markers and cancels the previous pending cleanup first. Each apply also
//! starts a new generation; a cleanup whose timer fired for an older
//! generation leaves the state and the DOM alone.
//!
//! The DOM is locked for each operation and re-queried by selector; no
//! [`NodeId`] is held across an `.await`. Locks are always taken DOM first,
//! then applicator state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use quote_anchor_core::dom::{DomTree, NodeId};
use quote_anchor_core::highlight::{highlight_in_block, remove_markers, HighlightPhase};
use quote_anchor_core::score::MatchThresholds;

use crate::schedule::{schedule_cleanup, CleanupHandle};

/// The rendered chapter, shared between the session and cleanup tasks.
pub type SharedDom = Arc<Mutex<DomTree>>;

pub fn shared_dom(tree: DomTree) -> SharedDom {
    Arc::new(Mutex::new(tree))
}

/// Lock the DOM. A panic in another holder leaves the tree structurally
/// valid, so poisoning is ignored.
pub fn lock_dom(dom: &SharedDom) -> MutexGuard<'_, DomTree> {
    dom.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback run when a highlight's cleanup timer fires.
pub type OnComplete = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub smooth: bool,
    pub center: bool,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            smooth: true,
            center: true,
        }
    }
}

/// Whatever can bring a block on screen.
pub trait Viewport: Send + Sync {
    fn scroll_into_view(&self, tree: &DomTree, node: NodeId, options: ScrollOptions);
}

/// Viewport for headless use; logs the request and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopViewport;

impl Viewport for NoopViewport {
    fn scroll_into_view(&self, tree: &DomTree, node: NodeId, options: ScrollOptions) {
        tracing::debug!(
            block = tree.attr(node, quote_anchor_core::render::BLOCK_ID_ATTR).unwrap_or(""),
            smooth = options.smooth,
            center = options.center,
            "scroll into view"
        );
    }
}

/// Viewport that remembers which blocks were scrolled to.
#[derive(Debug, Default)]
pub struct RecordingViewport {
    scrolled: Mutex<Vec<String>>,
}

impl RecordingViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block ids in scroll order.
    pub fn scrolled(&self) -> Vec<String> {
        self.scrolled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Viewport for RecordingViewport {
    fn scroll_into_view(&self, tree: &DomTree, node: NodeId, _options: ScrollOptions) {
        let id = tree
            .attr(node, quote_anchor_core::render::BLOCK_ID_ATTR)
            .unwrap_or_default()
            .to_string();
        self.scrolled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }
}

#[derive(Debug, Default)]
struct ApplicatorState {
    phase: HighlightPhase,
    pending: Option<CleanupHandle>,
    generation: u64,
}

/// Applies one transient highlight at a time to a [`SharedDom`].
#[derive(Clone)]
pub struct HighlightApplicator {
    dom: SharedDom,
    viewport: Arc<dyn Viewport>,
    thresholds: MatchThresholds,
    scroll: ScrollOptions,
    state: Arc<Mutex<ApplicatorState>>,
}

impl HighlightApplicator {
    pub fn new(dom: SharedDom, viewport: Arc<dyn Viewport>, thresholds: MatchThresholds) -> Self {
        Self {
            dom,
            viewport,
            thresholds,
            scroll: ScrollOptions::default(),
            state: Arc::new(Mutex::new(ApplicatorState::default())),
        }
    }

    pub fn with_scroll(mut self, scroll: ScrollOptions) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn dom(&self) -> &SharedDom {
        &self.dom
    }

    pub fn phase(&self) -> HighlightPhase {
        self.state().phase
    }

    /// True while a cleanup timer is waiting to fire.
    pub fn has_pending_cleanup(&self) -> bool {
        self.state()
            .pending
            .as_ref()
            .is_some_and(CleanupHandle::is_pending)
    }

    fn state(&self) -> MutexGuard<'_, ApplicatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: HighlightPhase) {
        self.state().phase = phase;
    }

    /// Start a new generation and cancel the pending cleanup of the old one.
    fn supersede(&self) -> u64 {
        let mut state = self.state();
        state.generation += 1;
        if let Some(handle) = state.pending.take() {
            if handle.cancel() {
                tracing::debug!("cancelled previous highlight cleanup");
            }
        }
        state.generation
    }

    /// Highlight `snippet` inside `block` and schedule its removal after
    /// `duration`.
    ///
    /// Returns `None` (and shows nothing) when the block has no text runs or
    /// the snippet is not found. Cancelling the returned handle keeps the
    /// marker and skips `on_complete`.
    pub fn highlight_in_element(
        &self,
        block: NodeId,
        snippet: &str,
        duration: Duration,
        on_complete: Option<OnComplete>,
    ) -> Option<CleanupHandle> {
        let mut tree = lock_dom(&self.dom);
        let generation = self.supersede();
        let cleared = remove_markers(&mut tree);
        if cleared > 0 {
            tracing::debug!(cleared, "cleared existing highlight markers");
        }
        self.set_phase(HighlightPhase::Idle);

        let splice = highlight_in_block(&mut tree, block, snippet, &self.thresholds, || {
            self.set_phase(HighlightPhase::Located)
        });
        let Some(splice) = splice else {
            self.set_phase(HighlightPhase::Idle);
            return None;
        };

        self.viewport.scroll_into_view(&tree, splice.block, self.scroll);

        // Register the handle before releasing the DOM so a fast timer finds
        // it in place.
        let mut state = self.state();
        let applicator = self.clone();
        let handle = schedule_cleanup(duration, move || applicator.finish_cleanup(generation, on_complete));
        state.phase = HighlightPhase::Spliced;
        state.pending = Some(handle.clone());
        drop(state);
        drop(tree);

        tracing::debug!(text = %splice.highlighted, consolidated = splice.consolidated, "highlight applied");
        Some(handle)
    }

    /// Timer body: run `on_complete`, then remove the markers, unless a
    /// newer apply or [`remove_all_highlights`](Self::remove_all_highlights)
    /// has started another generation.
    fn finish_cleanup(&self, generation: u64, on_complete: Option<OnComplete>) {
        {
            let mut state = self.state();
            if state.generation != generation {
                tracing::debug!(generation, "stale highlight cleanup ignored");
                return;
            }
            state.phase = HighlightPhase::Cleaning;
            state.pending = None;
        }
        if let Some(on_complete) = on_complete {
            on_complete();
        }

        let mut tree = lock_dom(&self.dom);
        let mut state = self.state();
        if state.generation != generation {
            return;
        }
        let removed = remove_markers(&mut tree);
        state.phase = HighlightPhase::Idle;
        tracing::debug!(removed, "highlight cleanup fired");
    }

    /// [`highlight_in_element`](Self::highlight_in_element) for the block
    /// with `block_id`.
    pub fn highlight_block(
        &self,
        block_id: &str,
        snippet: &str,
        duration: Duration,
        on_complete: Option<OnComplete>,
    ) -> Option<CleanupHandle> {
        let block = lock_dom(&self.dom).find_block(block_id);
        let Some(block) = block else {
            tracing::debug!(block_id, "block not rendered");
            return None;
        };
        self.highlight_in_element(block, snippet, duration, on_complete)
    }

    /// Scroll the block with `block_id` into view without marking it.
    pub fn scroll_to_block(&self, block_id: &str) -> bool {
        let tree = lock_dom(&self.dom);
        match tree.find_block(block_id) {
            Some(block) => {
                self.viewport.scroll_into_view(&tree, block, self.scroll);
                true
            }
            None => false,
        }
    }

    /// Remove every marker now and cancel any pending cleanup. Returns how
    /// many markers were removed.
    pub fn remove_all_highlights(&self) -> usize {
        let mut tree = lock_dom(&self.dom);
        self.supersede();
        let removed = remove_markers(&mut tree);
        self.set_phase(HighlightPhase::Idle);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_anchor_core::dom::Selector;
    use quote_anchor_core::highlight::MARKER_CLASS;
    use quote_anchor_core::models::{BlockNode, Document};
    use quote_anchor_core::render::render_document;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn applicator() -> HighlightApplicator {
        let document = Document::new(vec![
            BlockNode::paragraph("b0", "It was a bright cold day in April"),
            BlockNode::paragraph("b1", "The clocks were striking thirteen"),
        ])
        .unwrap();
        HighlightApplicator::new(
            shared_dom(render_document(&document)),
            Arc::new(NoopViewport),
            MatchThresholds::default(),
        )
    }

    fn markers(applicator: &HighlightApplicator) -> Vec<String> {
        let tree = lock_dom(applicator.dom());
        tree.query_all(tree.root(), &Selector::class(MARKER_CLASS))
            .into_iter()
            .map(|m| tree.text_content(m))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_from_older_generation_is_ignored() {
        let applicator = applicator();
        let calls = Arc::new(AtomicUsize::new(0));

        applicator
            .highlight_block("b0", "April", Duration::from_secs(10), None)
            .unwrap();
        let stale = applicator.state().generation;
        applicator
            .highlight_block("b1", "striking thirteen", Duration::from_secs(10), None)
            .unwrap();

        // A timer of the first apply that got past its cancel flag.
        let c = calls.clone();
        applicator.finish_cleanup(
            stale,
            Some(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(markers(&applicator), vec!["striking thirteen"]);
        assert_eq!(applicator.phase(), HighlightPhase::Spliced);
        assert!(applicator.has_pending_cleanup());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_after_remove_all_is_ignored() {
        let applicator = applicator();
        applicator
            .highlight_block("b0", "bright cold day", Duration::from_secs(10), None)
            .unwrap();
        let stale = applicator.state().generation;
        assert_eq!(applicator.remove_all_highlights(), 1);

        applicator
            .highlight_block("b1", "clocks", Duration::from_secs(10), None)
            .unwrap();
        applicator.finish_cleanup(stale, None);
        assert_eq!(markers(&applicator), vec!["clocks"]);
    }
}
