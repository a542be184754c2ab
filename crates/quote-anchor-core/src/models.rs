//! Core data models shared by every Quote Anchor component.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Citation`] | A pointer from an AI answer back to a source quote |
//! | [`ChatMessage`] | One chat turn, optionally carrying citations |
//! | [`Point`] / [`Range`] | Editor selection expressed as paths + offsets |
//! | [`BlockNode`] / [`InlineRun`] | Read-only view of the block document model |
//! | [`Document`] | An ordered, validated list of block nodes |
//! | [`Highlight`] / [`HighlightRecord`] | A user highlight before and after storage |
//!
//! The document model is validated once at load time
//! ([`Document::from_json`]); every other component can then rely on
//! unique, non-empty block ids and typed inline runs.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A citation attached to an AI answer.
///
/// `index` is the 1-based marker number exactly as it appeared inline in the
/// raw answer (`[n]`), kept as a string because that is how the answer
/// payload carries it. `id` is derived by [`crate::citation::CitationMap`]
/// and is never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(alias = "text")]
    pub quote: String,
    pub index: String,
    pub chapter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Citation {
    pub fn new(quote: impl Into<String>, index: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            quote: quote.into(),
            index: index.into(),
            chapter: chapter.into(),
            id: None,
        }
    }

    /// The marker number parsed as an integer, if it is one.
    pub fn index_number(&self) -> Option<usize> {
        self.index.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat message as stored by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub citations: Option<Vec<Citation>>,
}

/// A position inside the block tree: `path` addresses the node
/// (`[block, child]` for inline runs), `offset` counts chars into its text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// An editor selection. `anchor` is where the selection started, `focus`
/// where it ended; a backward selection has `focus < anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Returns `(start, end)` in document order.
    pub fn edges(&self) -> (&Point, &Point) {
        if self.focus < self.anchor {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// A contiguous span of text with uniform marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlight: bool,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight: false,
        }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight: true,
        }
    }

    /// True when this leaf carries the highlight mark and has visible text.
    pub fn is_highlighted(&self) -> bool {
        self.highlight && !self.text.is_empty()
    }
}

fn default_block_type() -> String {
    "p".to_string()
}

/// One structural unit of the document (paragraph, heading, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: String,
    #[serde(rename = "type", default = "default_block_type")]
    pub kind: String,
    pub children: Vec<InlineRun>,
}

impl BlockNode {
    pub fn new(id: impl Into<String>, children: Vec<InlineRun>) -> Self {
        Self {
            id: id.into(),
            kind: default_block_type(),
            children,
        }
    }

    /// A block holding a single plain run.
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, vec![InlineRun::plain(text)])
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.children.iter().map(|c| c.text.as_str()).collect()
    }
}

/// A chapter's content as an ordered list of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub blocks: Vec<BlockNode>,
}

impl Document {
    /// Build a document from blocks, enforcing the model invariants.
    pub fn new(blocks: Vec<BlockNode>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (i, block) in blocks.iter().enumerate() {
            if block.id.trim().is_empty() {
                bail!("block {} has an empty id", i);
            }
            if !seen.insert(block.id.as_str()) {
                bail!("duplicate block id '{}'", block.id);
            }
        }
        Ok(Self { blocks })
    }

    /// Parse and validate a JSON array of block nodes.
    pub fn from_json(json: &str) -> Result<Self> {
        let blocks: Vec<BlockNode> =
            serde_json::from_str(json).context("Failed to parse document JSON")?;
        Self::new(blocks)
    }

    pub fn block(&self, id: &str) -> Option<&BlockNode> {
        self.blocks.iter().find(|b| b.id == id)
    }
}

/// A user highlight as submitted to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub book: String,
    pub chapter: String,
    pub text: String,
    pub selection: Range,
    pub hash: String,
    pub user: String,
}

/// A highlight as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub id: String,
    #[serde(flatten)]
    pub highlight: Highlight,
    pub created: DateTime<Utc>,
}
