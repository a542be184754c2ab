//! Text canonicalization for comparing quotes against rendered text.
//!
//! Two modes share one pipeline:
//!
//! 1. Lowercase.
//! 2. Strip quotation glyphs (`"`, `'`, `“`, `”`, `‘`, `’`).
//! 3. [`NormalizeMode::Citation`]: drop everything that is not an ASCII word
//!    character or whitespace. [`NormalizeMode::Comparison`]: turn `;` and
//!    `,` into `.` so sentence boundaries still count when scoring.
//! 4. Collapse whitespace runs to a single space and trim.
//!
//! Collapsing runs last, so normalizing an already normalized string is a
//! no-op.
//!
//! [`normalize_with_offsets`] additionally records where every normalized
//! char came from, which lets the highlight applicator map a match found in
//! normalized space back onto the exact raw text.

/// Which normalization rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Keeps punctuation (with `;`/`,` folded to `.`).
    #[default]
    Comparison,
    /// Coarse: punctuation removed entirely.
    Citation,
}

impl NormalizeMode {
    pub fn for_citation(for_citation: bool) -> Self {
        if for_citation {
            Self::Citation
        } else {
            Self::Comparison
        }
    }
}

/// Normalized text plus a source map into the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// For each char of `text`, the byte range of the raw char it came from.
    origins: Vec<(usize, usize)>,
}

impl NormalizedText {
    /// Map a byte range of the normalized text back to a byte range of the
    /// raw text. Returns `None` for empty or out-of-bounds ranges.
    pub fn raw_range(&self, start: usize, end: usize) -> Option<std::ops::Range<usize>> {
        if start >= end || end > self.text.len() {
            return None;
        }
        let first = self.text[..start].chars().count();
        let last = first + self.text[start..end].chars().count() - 1;
        let (raw_start, _) = *self.origins.get(first)?;
        let (_, raw_end) = *self.origins.get(last)?;
        Some(raw_start..raw_end)
    }

    /// Find `needle` (already normalized) and return the raw byte range it
    /// covers.
    pub fn find_raw(&self, needle: &str) -> Option<std::ops::Range<usize>> {
        if needle.is_empty() {
            return None;
        }
        let start = self.text.find(needle)?;
        self.raw_range(start, start + needle.len())
    }
}

fn is_quote_glyph(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}')
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Canonicalize `text` for comparison. Total: never panics, empty in → empty out.
///
/// ```rust
/// use quote_anchor_core::normalize::{normalize_text, NormalizeMode};
///
/// assert_eq!(
///     normalize_text("  The Quick, Brown FOX!  ", NormalizeMode::Comparison),
///     "the quick. brown fox!"
/// );
/// assert_eq!(normalize_text("“Don't” stop!", NormalizeMode::Citation), "dont stop");
/// ```
pub fn normalize_text(text: &str, mode: NormalizeMode) -> String {
    normalize_with_offsets(text, mode).text
}

/// Same as [`normalize_text`] but keeps a per-char source map.
pub fn normalize_with_offsets(text: &str, mode: NormalizeMode) -> NormalizedText {
    let mut out = String::with_capacity(text.len());
    let mut origins = Vec::with_capacity(text.len());
    let mut pending_space: Option<(usize, usize)> = None;

    for (pos, raw) in text.char_indices() {
        let raw_span = (pos, pos + raw.len_utf8());
        for ch in raw.to_lowercase() {
            if is_quote_glyph(ch) {
                continue;
            }
            if ch.is_whitespace() {
                if pending_space.is_none() {
                    pending_space = Some(raw_span);
                }
                continue;
            }
            let ch = match mode {
                NormalizeMode::Citation if !is_word_char(ch) => continue,
                NormalizeMode::Comparison if ch == ';' || ch == ',' => '.',
                _ => ch,
            };
            if let Some(space) = pending_space.take() {
                if !out.is_empty() {
                    out.push(' ');
                    origins.push(space);
                }
            }
            out.push(ch);
            origins.push(raw_span);
        }
    }

    NormalizedText { text: out, origins }
}

/// Split normalized text into words the way the scorers expect.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|w| !w.is_empty()).collect()
}
