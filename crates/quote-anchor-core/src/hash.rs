//! Content-derived identifiers.
//!
//! - [`generate_text_hash`]: short, fast, non-cryptographic key for citation
//!   links. Collisions are possible; [`crate::citation::CitationMap`]
//!   disambiguates them.
//! - [`create_highlight_hash`]: SHA-256 identity of a highlight, the
//!   primary create/delete key. Two computations over the same
//!   `(book, chapter, selection, text)` always agree.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::models::Range;

/// 32-bit rolling hash (`h = h * 31 + unit`) over the UTF-16 code units of
/// the raw text, absolute-valued, base-36, truncated to 8 chars.
///
/// ```rust
/// use quote_anchor_core::hash::generate_text_hash;
///
/// assert_eq!(generate_text_hash(""), "");
/// assert_eq!(generate_text_hash("a"), "2p");
/// assert_eq!(generate_text_hash("abc"), generate_text_hash("abc"));
/// ```
pub fn generate_text_hash(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    let mut encoded = to_base36(i64::from(hash).unsigned_abs());
    encoded.truncate(8);
    encoded
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn join_path(path: &[usize]) -> String {
    path.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// The exact string fed to SHA-256 for a highlight.
pub fn highlight_hash_input(book_id: &str, chapter_id: &str, selection: &Range, text: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        book_id,
        chapter_id,
        join_path(&selection.anchor.path),
        join_path(&selection.focus.path),
        text
    )
}

/// SHA-256 hex digest identifying a highlight.
///
/// Only the selection paths feed the digest, so the same span hashes
/// identically no matter where inside a run the selection ended.
pub async fn create_highlight_hash(
    book_id: &str,
    chapter_id: &str,
    selection: &Range,
    text: &str,
) -> Result<String> {
    let input = highlight_hash_input(book_id, chapter_id, selection, text);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
