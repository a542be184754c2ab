//! In-memory [`HighlightStore`] for tests and the CLI.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Highlight, HighlightRecord};

use super::HighlightStore;

/// In-memory highlight store.
#[derive(Debug, Default)]
pub struct InMemoryHighlightStore {
    records: RwLock<Vec<HighlightRecord>>,
}

impl InMemoryHighlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, e.g. loaded from a file.
    pub fn with_records(records: Vec<HighlightRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<HighlightRecord>>> {
        self.records
            .read()
            .map_err(|_| anyhow!("highlight store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<HighlightRecord>>> {
        self.records
            .write()
            .map_err(|_| anyhow!("highlight store lock poisoned"))
    }
}

#[async_trait]
impl HighlightStore for InMemoryHighlightStore {
    async fn create_highlight(&self, highlight: Highlight) -> Result<HighlightRecord> {
        let mut records = self.write()?;
        if let Some(existing) = records.iter().find(|r| r.highlight.hash == highlight.hash) {
            tracing::debug!(hash = %highlight.hash, "highlight already stored");
            return Ok(existing.clone());
        }
        let record = HighlightRecord {
            id: Uuid::new_v4().to_string(),
            highlight,
            created: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn delete_highlight_by_hash(&self, hash: &str) -> Result<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.highlight.hash != hash);
        Ok(before - records.len())
    }

    async fn delete_highlight(&self, id: &str) -> Result<bool> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn get_highlight_by_hash(&self, hash: &str) -> Result<Option<HighlightRecord>> {
        let records = self.read()?;
        Ok(records.iter().find(|r| r.highlight.hash == hash).cloned())
    }

    async fn list_highlights(&self, book: &str, chapter: Option<&str>) -> Result<Vec<HighlightRecord>> {
        let records = self.read()?;
        Ok(records
            .iter()
            .filter(|r| r.highlight.book == book)
            .filter(|r| chapter.map_or(true, |c| r.highlight.chapter == c))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Point, Range};

    fn highlight(chapter: &str, hash: &str) -> Highlight {
        Highlight {
            book: "book-1".into(),
            chapter: chapter.into(),
            text: "is blue".into(),
            selection: Range::new(Point::new(vec![0, 1], 0), Point::new(vec![0, 1], 7)),
            hash: hash.into(),
            user: "user-1".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryHighlightStore::new();
        let record = store.create_highlight(highlight("ch1", "h1")).await.unwrap();
        assert!(!record.id.is_empty());
        let found = store.get_highlight_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.get_highlight_by_hash("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_hash_returns_existing() {
        let store = InMemoryHighlightStore::new();
        let first = store.create_highlight(highlight("ch1", "h1")).await.unwrap();
        let second = store.create_highlight(highlight("ch1", "h1")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_hash_and_id() {
        let store = InMemoryHighlightStore::new();
        store.create_highlight(highlight("ch1", "h1")).await.unwrap();
        let other = store.create_highlight(highlight("ch1", "h2")).await.unwrap();

        assert_eq!(store.delete_highlight_by_hash("h1").await.unwrap(), 1);
        assert_eq!(store.delete_highlight_by_hash("h1").await.unwrap(), 0);
        assert!(store.delete_highlight(&other.id).await.unwrap());
        assert!(!store.delete_highlight(&other.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_by_book_and_chapter() {
        let store = InMemoryHighlightStore::new();
        store.create_highlight(highlight("ch1", "a")).await.unwrap();
        store.create_highlight(highlight("ch2", "b")).await.unwrap();
        let mut foreign = highlight("ch1", "c");
        foreign.book = "book-2".into();
        store.create_highlight(foreign).await.unwrap();

        assert_eq!(store.list_highlights("book-1", None).await.unwrap().len(), 2);
        let ch2 = store.list_highlights("book-1", Some("ch2")).await.unwrap();
        assert_eq!(ch2.len(), 1);
        assert_eq!(ch2[0].highlight.hash, "b");
    }
}
