//! # Quote Anchor CLI (`anchor`)
//!
//! Inspect how citations and highlights anchor to a chapter without running
//! the reader: normalize text, compute identifiers, pick the citation for a
//! quote, locate the block a citation points at, and render the transient
//! highlight.
//!
//! ## Usage
//!
//! ```bash
//! anchor --config ./config/anchor.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `anchor normalize "<text>"` | Print the comparison (or `--citation`) normalization |
//! | `anchor text-hash "<text>"` | Print the short citation id |
//! | `anchor highlight-hash ...` | Print the SHA-256 highlight hash |
//! | `anchor cite "<quote>" --citations c.json` | Best citation for a quote |
//! | `anchor locate --document d.json --quote "<q>"` | Block a citation points at |
//! | `anchor show --document d.json --block b1 --snippet "<s>"` | Block HTML with the highlight marker |
//! | `anchor messages m.json` | Rewrite assistant answers with citation links |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use quote_anchor::{config, inspect};

/// Quote Anchor CLI: anchor AI citations and reader highlights to chapter
/// text.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "anchor",
    about = "Quote Anchor: citation matching and highlight anchoring for e-book chapters",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/anchor.toml`. Matching thresholds and highlight
    /// timings are read from this file.
    #[arg(long, global = true, default_value = "./config/anchor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Normalize text the way the matcher does before comparing.
    Normalize {
        text: String,

        /// Use citation mode (word characters and spaces only).
        #[arg(long)]
        citation: bool,
    },

    /// Print the short, non-cryptographic hash used as a citation id.
    TextHash { text: String },

    /// Print the SHA-256 hash identifying a highlight.
    HighlightHash {
        #[arg(long)]
        book: String,

        #[arg(long)]
        chapter: String,

        /// Selection as JSON: `{"anchor":{"path":[0,1],"offset":3},"focus":{...}}`.
        #[arg(long)]
        selection: String,

        /// The highlighted text.
        #[arg(long)]
        text: String,

        /// Shift the selection as applying the mark would (what a create hashes).
        #[arg(long)]
        adjust: bool,
    },

    /// Pick the citation a quoted span refers to.
    Cite {
        /// The quoted span from the answer.
        quote: String,

        /// JSON array of citations.
        #[arg(long)]
        citations: PathBuf,
    },

    /// Find the block of a chapter a citation points at.
    Locate {
        /// JSON array of block nodes.
        #[arg(long)]
        document: PathBuf,

        #[arg(long)]
        quote: String,

        /// The citation's index, tried as a block position first.
        #[arg(long, default_value = "")]
        index: String,
    },

    /// Render a block with a transient highlight around a snippet.
    Show {
        /// JSON array of block nodes.
        #[arg(long)]
        document: PathBuf,

        /// Block id.
        #[arg(long)]
        block: String,

        #[arg(long)]
        snippet: String,
    },

    /// Rewrite assistant messages so quoted spans link to their citations.
    Messages {
        /// JSON array of chat messages.
        messages: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't need config
    match &cli.command {
        Commands::Normalize { text, citation } => {
            inspect::run_normalize(text, *citation);
            return Ok(());
        }
        Commands::TextHash { text } => {
            inspect::run_text_hash(text);
            return Ok(());
        }
        Commands::HighlightHash {
            book,
            chapter,
            selection,
            text,
            adjust,
        } => {
            inspect::run_highlight_hash(book, chapter, selection, text, *adjust).await?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Cite { quote, citations } => {
            inspect::run_cite(&cfg, &quote, &citations)?;
        }
        Commands::Locate {
            document,
            quote,
            index,
        } => {
            inspect::run_locate(&cfg, &document, &quote, &index)?;
        }
        Commands::Show {
            document,
            block,
            snippet,
        } => {
            inspect::run_show(&cfg, &document, &block, &snippet)?;
        }
        Commands::Messages { messages } => {
            inspect::run_messages(&cfg, &messages)?;
        }
        Commands::Normalize { .. } | Commands::TextHash { .. } | Commands::HighlightHash { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
