//! # Quote Anchor Core
//!
//! Pure logic for anchoring assistant citations and reader highlights to an
//! e-book chapter: data models, text normalization and scoring, citation
//! matching, identifiers, a DOM tree value and renderer, highlight
//! splicing, adjacent-highlight resolution, selection arithmetic and the
//! highlight store seam.
//!
//! This crate contains no tokio runtime, filesystem I/O, or timers. The
//! `quote-anchor` app crate adds scheduling, the command channel and the
//! CLI on top.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Citations, chat messages, blocks, selections, highlights |
//! | [`normalize`] | Comparison and citation normalization with raw offsets |
//! | [`score`] | Citation scores, word-overlap similarity, thresholds |
//! | [`citation`] | Best-citation lookup, node location, display rewriting |
//! | [`hash`] | Short text hash and SHA-256 highlight hash |
//! | [`dom`] | Arena DOM tree with selectors |
//! | [`render`] | Block model → editor DOM structure |
//! | [`highlight`] | Run consolidation and marker splicing |
//! | [`adjacent`] | Resolve a clicked fragment into the full highlight |
//! | [`selection`] | Selection shift, mark ranges, range text |
//! | [`store`] | `HighlightStore` trait and in-memory store |
//! | [`toggle`] | Create-or-delete highlight flow |

pub mod adjacent;
pub mod citation;
pub mod dom;
pub mod hash;
pub mod highlight;
pub mod models;
pub mod normalize;
pub mod render;
pub mod score;
pub mod selection;
pub mod store;
pub mod toggle;
