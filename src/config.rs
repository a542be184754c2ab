//! TOML configuration.
//!
//! Every table is optional; a missing file is only an error for callers that
//! ask for [`load_config`] directly. The CLI goes through
//! [`load_config_or_default`].
//!
//! ```toml
//! [matching]
//! citation_score = 40.0
//! node_similarity = 0.4
//! word_overlap_cutoff = 0.3
//! single_run_similarity = 0.5
//!
//! [highlight]
//! citation_delay_ms = 100
//! citation_cleanup_ms = 10000
//! flash_cleanup_ms = 5000
//! smooth_scroll = true
//!
//! [reader]
//! user = "local"
//! ```

use anyhow::{Context, Result};
use quote_anchor_core::score::MatchThresholds;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchThresholds,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Timing and presentation of transient highlights.
#[derive(Debug, Deserialize, Clone)]
pub struct HighlightConfig {
    /// Wait for the editor to settle before locating a citation.
    #[serde(default = "default_citation_delay_ms")]
    pub citation_delay_ms: u64,
    #[serde(default = "default_citation_cleanup_ms")]
    pub citation_cleanup_ms: u64,
    #[serde(default = "default_flash_cleanup_ms")]
    pub flash_cleanup_ms: u64,
    #[serde(default = "default_smooth_scroll")]
    pub smooth_scroll: bool,
}

fn default_citation_delay_ms() -> u64 {
    100
}
fn default_citation_cleanup_ms() -> u64 {
    10_000
}
fn default_flash_cleanup_ms() -> u64 {
    5_000
}
fn default_smooth_scroll() -> bool {
    true
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            citation_delay_ms: default_citation_delay_ms(),
            citation_cleanup_ms: default_citation_cleanup_ms(),
            flash_cleanup_ms: default_flash_cleanup_ms(),
            smooth_scroll: default_smooth_scroll(),
        }
    }
}

impl HighlightConfig {
    pub fn citation_delay(&self) -> Duration {
        Duration::from_millis(self.citation_delay_ms)
    }

    pub fn citation_cleanup(&self) -> Duration {
        Duration::from_millis(self.citation_cleanup_ms)
    }

    pub fn flash_cleanup(&self) -> Duration {
        Duration::from_millis(self.flash_cleanup_ms)
    }
}

/// Identity attached to highlights created in this session.
#[derive(Debug, Deserialize, Clone)]
pub struct ReaderConfig {
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_user() -> String {
    "local".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
        }
    }
}

impl Config {
    /// Defaults for every table, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate matching
    let m = &config.matching;
    if !(0.0..=100.0).contains(&m.citation_score) {
        anyhow::bail!("matching.citation_score must be in [0.0, 100.0]");
    }
    for (name, value) in [
        ("node_similarity", m.node_similarity),
        ("word_overlap_cutoff", m.word_overlap_cutoff),
        ("single_run_similarity", m.single_run_similarity),
    ] {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("matching.{} must be in [0.0, 1.0]", name);
        }
    }

    // Validate highlight
    if config.highlight.citation_cleanup_ms == 0 {
        anyhow::bail!("highlight.citation_cleanup_ms must be > 0");
    }
    if config.highlight.flash_cleanup_ms == 0 {
        anyhow::bail!("highlight.flash_cleanup_ms must be > 0");
    }

    if config.reader.user.trim().is_empty() {
        anyhow::bail!("reader.user must not be empty");
    }

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
