//! Similarity scoring between a quote and candidate text.
//!
//! Two scorers with different shapes:
//!
//! - [`score_citation`]: bounded `[0, 100]` tiered score used to pick one
//!   citation among a few short candidates. Callers accept a match only
//!   above [`MatchThresholds::citation_score`].
//! - [`text_similarity`]: `[0, 1]` confidence used to rank whole document
//!   blocks, tolerant of paraphrase and partial overlap.
//!
//! # Tiers of `score_citation`
//!
//! | Condition (after citation normalization) | Score |
//! |------------------------------------------|-------|
//! | identical | 100 |
//! | one contains the other | 80 |
//! | otherwise | `shared words / max(word counts) × 60` |

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_text, words, NormalizeMode};

/// Score given to an exact normalized match.
pub const EXACT_SCORE: f64 = 100.0;
/// Score given when one normalized string contains the other.
pub const CONTAINMENT_SCORE: f64 = 80.0;
/// Upper bound of the word-overlap tier.
pub const WORD_OVERLAP_WEIGHT: f64 = 60.0;

/// Empirically tuned acceptance thresholds, overridable from config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Minimum (exclusive) [`score_citation`] for a citation to be selected.
    pub citation_score: f64,
    /// Minimum (inclusive) [`text_similarity`] for a block to match a quote.
    pub node_similarity: f64,
    /// Word-overlap ratio above which overlap is weighted 0.8 instead of 0.4.
    pub word_overlap_cutoff: f64,
    /// Minimum [`text_similarity`] before searching inside a single text run.
    pub single_run_similarity: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            citation_score: 40.0,
            node_similarity: 0.4,
            word_overlap_cutoff: 0.3,
            single_run_similarity: 0.5,
        }
    }
}

/// Tiered `[0, 100]` score of `candidate` against `query`.
///
/// Returns `0.0` when either side normalizes to nothing.
pub fn score_citation(candidate: &str, query: &str) -> f64 {
    let candidate = normalize_text(candidate, NormalizeMode::Citation);
    let query = normalize_text(query, NormalizeMode::Citation);
    score_normalized(&candidate, &query)
}

pub(crate) fn score_normalized(candidate: &str, query: &str) -> f64 {
    if candidate.is_empty() || query.is_empty() {
        return 0.0;
    }
    if candidate == query {
        return EXACT_SCORE;
    }
    if candidate.contains(query) || query.contains(candidate) {
        return CONTAINMENT_SCORE;
    }

    let query_words = words(query);
    let candidate_words = words(candidate);
    let shared = query_words
        .iter()
        .filter(|w| candidate_words.contains(w))
        .count();
    let denom = query_words.len().max(candidate_words.len());
    shared as f64 / denom as f64 * WORD_OVERLAP_WEIGHT
}

/// `[0, 1]` similarity of `snippet` to `text`, with default thresholds.
pub fn text_similarity(snippet: &str, text: &str) -> f64 {
    text_similarity_with(snippet, text, &MatchThresholds::default())
}

/// `[0, 1]` similarity of `snippet` to `text`.
///
/// - `1.0` when equal or `text` contains `snippet`
/// - `len(text) / len(snippet)` when `snippet` contains `text`
/// - otherwise overlap of words longer than two chars, scaled by 0.8 above
///   the cutoff and by 0.4 below it
pub fn text_similarity_with(snippet: &str, text: &str, thresholds: &MatchThresholds) -> f64 {
    let snippet = normalize_text(snippet, NormalizeMode::Comparison);
    let text = normalize_text(text, NormalizeMode::Comparison);

    if snippet.is_empty() || text.is_empty() {
        return 0.0;
    }
    if snippet == text || text.contains(&snippet) {
        return 1.0;
    }
    if snippet.contains(&text) {
        return text.chars().count() as f64 / snippet.chars().count() as f64;
    }

    let significant = |s: &str| -> Vec<String> {
        words(s)
            .into_iter()
            .filter(|w| w.chars().count() > 2)
            .map(str::to_string)
            .collect()
    };
    let snippet_words = significant(&snippet);
    let text_words = significant(&text);
    if snippet_words.is_empty() || text_words.is_empty() {
        return 0.0;
    }

    let matching = snippet_words
        .iter()
        .filter(|w| text_words.contains(w))
        .count();
    let ratio = matching as f64 / snippet_words.len().max(text_words.len()) as f64;

    if ratio > thresholds.word_overlap_cutoff {
        ratio * 0.8
    } else {
        ratio * 0.4
    }
}
