//! # Quote Anchor
//!
//! Anchors AI citations and reader highlights to the text of an e-book
//! chapter.
//!
//! An assistant answers questions about a book and cites verbatim quotes.
//! Quote Anchor links each quoted span in the answer to its citation, finds
//! the passage in the rendered chapter even when the index has drifted or
//! the text was split across inline runs, flashes a temporary highlight
//! around it, and gives persistent user highlights a stable identity so
//! they can be toggled on and off.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  commands  ┌──────────────────┐   ┌──────────────────┐
//! │ Toolbar/Chat │──────────▶│  ReaderSession   │──▶│  HighlightStore  │
//! └──────────────┘            │ document + DOM   │   └──────────────────┘
//!                             └────────┬─────────┘
//!                                      ▼
//!                             ┌──────────────────┐   ┌──────────────────┐
//!                             │   Applicator     │──▶│ cleanup timers   │
//!                             │ splice + scroll  │   │ (tokio tasks)    │
//!                             └──────────────────┘   └──────────────────┘
//! ```
//!
//! Matching, hashing, rendering and splicing live in `quote-anchor-core`;
//! this crate adds the runtime pieces and the `anchor` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`schedule`] | Cancellable delayed cleanup tasks |
//! | [`applicator`] | Transient highlights over a shared DOM |
//! | [`commands`] | Command channel from reader chrome |
//! | [`reader`] | Per-chapter session tying it together |
//! | [`inspect`] | CLI command implementations |

pub mod applicator;
pub mod commands;
pub mod config;
pub mod inspect;
pub mod reader;
pub mod schedule;
