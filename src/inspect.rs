//! Offline inspection commands behind the `anchor` CLI.
//!
//! Each `run_*` function reads JSON inputs from disk, calls into the core
//! crate and prints the result to stdout. The non-printing halves are public
//! so the same logic can be tested without a process.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use quote_anchor_core::citation::{
    find_best_citation_with, locate_citation_node, process_messages_with_citations, split_index_marker,
    CitationMap,
};
use quote_anchor_core::hash::{create_highlight_hash, generate_text_hash};
use quote_anchor_core::models::{ChatMessage, Citation, Document, Range};
use quote_anchor_core::normalize::{normalize_text, NormalizeMode};
use quote_anchor_core::render::render_document;
use quote_anchor_core::score::score_citation;
use quote_anchor_core::selection::adjust_selection_for_mark;
use serde::Serialize;

use crate::applicator::{lock_dom, shared_dom, HighlightApplicator, NoopViewport};
use crate::config::Config;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", what, path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {} JSON", what))
}

pub fn load_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document file: {}", path.display()))?;
    Document::from_json(&content)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run_normalize(text: &str, citation: bool) {
    println!("{}", normalize_text(text, NormalizeMode::for_citation(citation)));
}

pub fn run_text_hash(text: &str) {
    println!("{}", generate_text_hash(text));
}

/// Hash a highlight. `adjust` applies the mark-split shift first, as a
/// create would.
pub async fn highlight_hash(
    book: &str,
    chapter: &str,
    selection: &str,
    text: &str,
    adjust: bool,
) -> Result<String> {
    let selection: Range =
        serde_json::from_str(selection).context("Failed to parse selection JSON")?;
    let selection = if adjust {
        adjust_selection_for_mark(&selection)
    } else {
        selection
    };
    create_highlight_hash(book, chapter, &selection, text).await
}

pub async fn run_highlight_hash(
    book: &str,
    chapter: &str,
    selection: &str,
    text: &str,
    adjust: bool,
) -> Result<()> {
    println!("{}", highlight_hash(book, chapter, selection, text, adjust).await?);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CiteResult {
    pub citation: Citation,
    pub score: f64,
}

pub fn cite(cfg: &Config, quote: &str, citations: &[Citation]) -> Option<CiteResult> {
    let best = find_best_citation_with(quote, citations, &cfg.matching)?;
    let (text, _) = split_index_marker(quote);
    Some(CiteResult {
        score: score_citation(&best.quote, &text),
        citation: best.clone(),
    })
}

pub fn run_cite(cfg: &Config, quote: &str, citations_path: &Path) -> Result<()> {
    let citations: Vec<Citation> = read_json(citations_path, "citations")?;
    match cite(cfg, quote, &citations) {
        Some(result) => print_json(&result),
        None => {
            println!("No citation matched.");
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocateResult {
    pub block_id: String,
    pub position: usize,
    pub similarity: f64,
    pub positional: bool,
}

pub fn locate(cfg: &Config, document: &Document, citation: &Citation) -> Option<LocateResult> {
    let found = locate_citation_node(&document.blocks, citation, &cfg.matching)?;
    Some(LocateResult {
        block_id: found.node.id.clone(),
        position: found.position,
        similarity: found.similarity,
        positional: found.positional,
    })
}

pub fn run_locate(cfg: &Config, document_path: &Path, quote: &str, index: &str) -> Result<()> {
    let document = load_document(document_path)?;
    let citation = Citation::new(quote, index, "");
    match locate(cfg, &document, &citation) {
        Some(result) => print_json(&result),
        None => {
            println!("No block matched.");
            Ok(())
        }
    }
}

/// Render `block_id`, highlight `snippet` in it, and return the block's
/// HTML with the marker in place.
pub fn show(cfg: &Config, document: &Document, block_id: &str, snippet: &str) -> Result<String> {
    let dom = shared_dom(render_document(document));
    let applicator = HighlightApplicator::new(dom.clone(), Arc::new(NoopViewport), cfg.matching);
    let duration = Duration::from_millis(cfg.highlight.flash_cleanup_ms);

    let Some(handle) = applicator.highlight_block(block_id, snippet, duration, None) else {
        bail!("snippet not found in block '{}'", block_id);
    };
    handle.cancel();

    let tree = lock_dom(&dom);
    let block = tree
        .find_block(block_id)
        .with_context(|| format!("block '{}' not rendered", block_id))?;
    Ok(tree.to_html(block))
}

pub fn run_show(cfg: &Config, document_path: &Path, block_id: &str, snippet: &str) -> Result<()> {
    let document = load_document(document_path)?;
    if document.block(block_id).is_none() {
        bail!("document has no block '{}'", block_id);
    }
    println!("{}", show(cfg, &document, block_id, snippet)?);
    Ok(())
}

pub fn run_messages(cfg: &Config, messages_path: &Path) -> Result<()> {
    let messages: Vec<ChatMessage> = read_json(messages_path, "messages")?;
    let map = CitationMap::from_messages(&messages);
    let processed = process_messages_with_citations(&messages, &map, &cfg.matching);
    print_json(&processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_anchor_core::models::BlockNode;

    fn fox() -> Document {
        Document::new(vec![
            BlockNode::paragraph("b0", "apples and oranges"),
            BlockNode::paragraph("b1", "The quick brown fox jumps"),
        ])
        .unwrap()
    }

    #[test]
    fn test_cite_reports_score() {
        let citations = vec![
            Citation::new("the sky is blue", "1", "c1"),
            Citation::new("grass is green", "2", "c1"),
        ];
        let result = cite(&Config::minimal(), "The sky is blue", &citations).unwrap();
        assert_eq!(result.citation.index, "1");
        assert_eq!(result.score, 100.0);
        assert!(cite(&Config::minimal(), "nothing alike", &citations).is_none());

        let fallback = cite(&Config::minimal(), "nothing alike [2]", &citations).unwrap();
        assert_eq!(fallback.citation.index, "2");
        assert!(fallback.score <= Config::minimal().matching.citation_score);
    }

    #[test]
    fn test_locate_falls_back_to_scan() {
        let found = locate(&Config::minimal(), &fox(), &Citation::new("brown fox", "7", "c1")).unwrap();
        assert_eq!(found.block_id, "b1");
        assert_eq!(found.position, 1);
        assert!(!found.positional);
    }

    #[tokio::test]
    async fn test_show_wraps_snippet() {
        let html = show(&Config::minimal(), &fox(), "b1", "fox").unwrap();
        assert!(html.contains(r#"<span class="highlighted-text bg-yellow-200 text-yellow-900">fox</span>"#));
        assert!(show(&Config::minimal(), &fox(), "b1", "zebra").is_err());
    }

    #[tokio::test]
    async fn test_highlight_hash_adjusts() {
        let sel = r#"{"anchor":{"path":[0,0],"offset":4},"focus":{"path":[0,0],"offset":9}}"#;
        let plain = highlight_hash("b", "c", sel, "t", false).await.unwrap();
        let adjusted = highlight_hash("b", "c", sel, "t", true).await.unwrap();
        assert_ne!(plain, adjusted);
        assert!(highlight_hash("b", "c", "not json", "t", false).await.is_err());
    }
}
