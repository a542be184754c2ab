//! Highlight persistence abstraction.
//!
//! The [`HighlightStore`] trait is the seam between the reader and whatever
//! keeps highlights (a remote API, a local database, the
//! [`memory::InMemoryHighlightStore`] used in tests and the CLI).
//!
//! The highlight `hash` is the primary key for create and delete; record
//! ids exist for callers that already hold a record.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Highlight, HighlightRecord};

/// Abstract storage backend for highlights.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_highlight`](HighlightStore::create_highlight) | Persist a highlight, keyed by its hash |
/// | [`delete_highlight_by_hash`](HighlightStore::delete_highlight_by_hash) | Remove every record with a hash |
/// | [`delete_highlight`](HighlightStore::delete_highlight) | Remove one record by id |
/// | [`get_highlight_by_hash`](HighlightStore::get_highlight_by_hash) | Look up a record by hash |
/// | [`list_highlights`](HighlightStore::list_highlights) | Records for a book, optionally one chapter |
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Persist a highlight. Creating a hash that already exists returns
    /// the stored record unchanged.
    async fn create_highlight(&self, highlight: Highlight) -> Result<HighlightRecord>;

    /// Remove all records with `hash`. Returns how many were removed.
    async fn delete_highlight_by_hash(&self, hash: &str) -> Result<usize>;

    /// Remove the record with `id`. Returns whether it existed.
    async fn delete_highlight(&self, id: &str) -> Result<bool>;

    async fn get_highlight_by_hash(&self, hash: &str) -> Result<Option<HighlightRecord>>;

    /// Records for `book`, oldest first. `chapter` narrows to one chapter.
    async fn list_highlights(&self, book: &str, chapter: Option<&str>) -> Result<Vec<HighlightRecord>>;
}
