//! Citation matching: answer quotes → citations, citations → document blocks.
//!
//! # In-answer matching
//!
//! The AI answer quotes source text inline as `"quoted text" [n]`. For each
//! such span, [`find_citation_for_marker`] scores every candidate citation
//! with [`score_citation`] and keeps the best one above the threshold; if
//! none clears it, the citation whose `index` equals `n` is used.
//!
//! # In-document matching
//!
//! [`locate_citation_node`] first trusts the citation's numeric index as a
//! block offset, then verifies it with [`text_similarity`]. Indices drift when
//! answer generation and document indexing disagree, so a failed check
//! falls back to [`find_best_matching_node`], a full scan over the chapter.
//!
//! # Display
//!
//! [`process_citations_for_display`] rewrites answer text into links keyed by
//! the ids a [`CitationMap`] hands out.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::hash::generate_text_hash;
use crate::models::{BlockNode, ChatMessage, Citation, Role};
use crate::normalize::{normalize_text, NormalizeMode};
use crate::score::{score_normalized, text_similarity_with, MatchThresholds};

static QUOTED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"\s*\[(\d+)\]"#).expect("static regex"));
static BARE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("static regex"));

/// Best citation for `quote` using the default threshold.
pub fn find_best_citation<'a>(quote: &str, citations: &'a [Citation]) -> Option<&'a Citation> {
    find_best_citation_with(quote, citations, &MatchThresholds::default())
}

/// Split `[n]` markers off a quoted span: the text with every marker
/// removed, and the number of the last marker if there is one.
///
/// ```rust
/// use quote_anchor_core::citation::split_index_marker;
///
/// assert_eq!(split_index_marker("the sky [2]"), ("the sky".to_string(), Some("2".to_string())));
/// assert_eq!(split_index_marker("plain"), ("plain".to_string(), None));
/// ```
pub fn split_index_marker(quote: &str) -> (String, Option<String>) {
    let marker = BARE_MARKER
        .captures_iter(quote)
        .last()
        .map(|caps| caps[1].to_string());
    let text = BARE_MARKER.replace_all(quote, "").trim().to_string();
    (text, marker)
}

/// Highest-scoring citation strictly above `thresholds.citation_score`.
/// Ties keep the earliest candidate.
///
/// A `[n]` marker inside `quote` is not scored; when no citation clears the
/// threshold, the citation whose `index` is `n` is returned instead.
pub fn find_best_citation_with<'a>(
    quote: &str,
    citations: &'a [Citation],
    thresholds: &MatchThresholds,
) -> Option<&'a Citation> {
    let (text, marker) = split_index_marker(quote);
    best_scoring_citation(&text, citations, thresholds)
        .or_else(|| marker.and_then(|n| citation_with_index(citations, &n)))
}

fn best_scoring_citation<'a>(
    quote: &str,
    citations: &'a [Citation],
    thresholds: &MatchThresholds,
) -> Option<&'a Citation> {
    let query = normalize_text(quote, NormalizeMode::Citation);
    let mut best: Option<(&Citation, f64)> = None;

    for citation in citations {
        let candidate = normalize_text(&citation.quote, NormalizeMode::Citation);
        let score = score_normalized(&candidate, &query);
        if score > thresholds.citation_score && best.map_or(true, |(_, s)| score > s) {
            best = Some((citation, score));
        }
    }

    best.map(|(c, _)| c)
}

fn citation_with_index<'a>(citations: &'a [Citation], index: &str) -> Option<&'a Citation> {
    citations.iter().find(|c| c.index.trim() == index.trim())
}

/// Like [`find_best_citation_with`], falling back to the citation whose
/// `index` equals `marker` when no quote clears the threshold.
pub fn find_citation_for_marker<'a>(
    quote: &str,
    marker: &str,
    citations: &'a [Citation],
    thresholds: &MatchThresholds,
) -> Option<&'a Citation> {
    find_best_citation_with(quote, citations, thresholds)
        .or_else(|| citation_with_index(citations, marker))
}

/// Scan every block and return the one most similar to `quote`.
///
/// A perfect `1.0` short-circuits the scan; otherwise the best block at or
/// above `threshold` wins (earliest on ties).
pub fn find_best_matching_node<'a>(
    nodes: &'a [BlockNode],
    quote: &str,
    threshold: f64,
) -> Option<&'a BlockNode> {
    find_best_matching_node_with(nodes, quote, threshold, &MatchThresholds::default())
        .map(|(node, _)| node)
}

fn find_best_matching_node_with<'a>(
    nodes: &'a [BlockNode],
    quote: &str,
    threshold: f64,
    thresholds: &MatchThresholds,
) -> Option<(&'a BlockNode, f64)> {
    let mut best: Option<(&BlockNode, f64)> = None;

    for node in nodes {
        let text = node.text();
        if text.is_empty() {
            continue;
        }
        let similarity = text_similarity_with(quote, &text, thresholds);
        if similarity >= 1.0 {
            return Some((node, similarity));
        }
        if similarity >= threshold && best.map_or(true, |(_, s)| similarity > s) {
            best = Some((node, similarity));
        }
    }

    best
}

/// Where a citation was found in the chapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMatch<'a> {
    pub node: &'a BlockNode,
    /// Position of `node` in the chapter.
    pub position: usize,
    pub similarity: f64,
    /// True when the citation's own index pointed at the node.
    pub positional: bool,
}

/// Find the block a citation points at: positional lookup first, full scan
/// when the indexed block does not contain the quote.
pub fn locate_citation_node<'a>(
    nodes: &'a [BlockNode],
    citation: &Citation,
    thresholds: &MatchThresholds,
) -> Option<NodeMatch<'a>> {
    if let Some(position) = citation.index_number() {
        if let Some(node) = nodes.get(position) {
            let similarity = text_similarity_with(&citation.quote, &node.text(), thresholds);
            if similarity >= thresholds.node_similarity {
                return Some(NodeMatch {
                    node,
                    position,
                    similarity,
                    positional: true,
                });
            }
            tracing::debug!(
                index = position,
                similarity,
                "indexed block does not match citation, scanning chapter"
            );
        }
    }

    let (node, similarity) =
        find_best_matching_node_with(nodes, &citation.quote, thresholds.node_similarity, thresholds)?;
    let position = nodes.iter().position(|n| std::ptr::eq(n, node))?;
    Some(NodeMatch {
        node,
        position,
        similarity,
        positional: false,
    })
}

/// Stable id → citation for one chat session.
///
/// Ids are the 8-char [`generate_text_hash`] of the quote. When two
/// different quotes collide on that hash, the later one is keyed
/// `"{hash}-{index}"` (and `"{hash}-{index}-{chapter}"` if that is taken
/// too) so neither link silently points at the wrong passage.
#[derive(Debug, Clone, Default)]
pub struct CitationMap {
    entries: HashMap<String, Citation>,
}

impl CitationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the citations of every message.
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let mut map = Self::new();
        for message in messages {
            if let Some(citations) = &message.citations {
                map.extend(citations);
            }
        }
        map
    }

    pub fn extend<'a>(&mut self, citations: impl IntoIterator<Item = &'a Citation>) {
        for citation in citations {
            self.insert(citation.clone());
        }
    }

    /// Insert a citation and return the id it is reachable under.
    pub fn insert(&mut self, mut citation: Citation) -> String {
        let id = self.id_for(&citation).unwrap_or_else(|| self.free_key(&citation));
        citation.id = Some(id.clone());
        self.entries.insert(id.clone(), citation);
        id
    }

    /// The id an equal-quote citation is already stored under, if any.
    pub fn id_for(&self, citation: &Citation) -> Option<String> {
        let hash = generate_text_hash(&citation.quote);
        let candidates = [
            hash.clone(),
            format!("{}-{}", hash, citation.index),
            format!("{}-{}-{}", hash, citation.index, citation.chapter),
        ];
        candidates.into_iter().find(|key| {
            self.entries
                .get(key)
                .is_some_and(|c| c.quote == citation.quote)
        })
    }

    fn free_key(&self, citation: &Citation) -> String {
        let hash = generate_text_hash(&citation.quote);
        let candidates = [
            hash.clone(),
            format!("{}-{}", hash, citation.index),
            format!("{}-{}-{}", hash, citation.index, citation.chapter),
        ];
        for key in candidates {
            if !self.entries.contains_key(&key) {
                return key;
            }
        }
        tracing::warn!(hash = %hash, "citation id collision could not be disambiguated");
        format!("{}-{}-{}", hash, citation.index, citation.chapter)
    }

    pub fn get(&self, id: &str) -> Option<&Citation> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrite an answer's `"quote" [n]` spans into citation links.
///
/// Each matched span becomes `"quote"[k-<id>]()`, where `k` numbers distinct
/// cited passages in order of first use and `<id>` is the citation's id in
/// `map` (its text hash if it is not in the map). Unmatched spans keep the
/// quote only. All remaining bare `[n]` markers are dropped.
pub fn process_citations_for_display(
    content: &str,
    citations: &[Citation],
    map: &CitationMap,
    thresholds: &MatchThresholds,
) -> String {
    let mut used: Vec<String> = Vec::new();

    let linked = QUOTED_MARKER.replace_all(content, |caps: &Captures| {
        let quote = &caps[1];
        let marker = &caps[2];
        let same_index: Vec<Citation> = citations
            .iter()
            .filter(|c| c.index.trim() == marker)
            .cloned()
            .collect();

        match find_citation_for_marker(quote, marker, &same_index, thresholds) {
            Some(citation) => {
                let id = map
                    .id_for(citation)
                    .unwrap_or_else(|| generate_text_hash(&citation.quote));
                let key = format!("{}-{}", citation.index, id);
                let display = match used.iter().position(|k| *k == key) {
                    Some(pos) => pos + 1,
                    None => {
                        used.push(key);
                        used.len()
                    }
                };
                format!("\"{}\"[{}-{}]()", quote, display, id)
            }
            None => format!("\"{}\"", quote),
        }
    });

    BARE_MARKER.replace_all(&linked, "").into_owned()
}

/// Apply [`process_citations_for_display`] to every assistant message that
/// carries citations, leaving the rest untouched.
pub fn process_messages_with_citations(
    messages: &[ChatMessage],
    map: &CitationMap,
    thresholds: &MatchThresholds,
) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| match (&message.role, &message.citations) {
            (Role::Assistant, Some(citations)) => ChatMessage {
                content: process_citations_for_display(
                    &message.content,
                    citations,
                    map,
                    thresholds,
                ),
                ..message.clone()
            },
            _ => message.clone(),
        })
        .collect()
}
