//! Commands from reader chrome (toolbar, chat panel) to the editor host.
//!
//! The toolbar and chat panel hold a [`CommandSender`]; the session owning
//! the chapter drains the [`CommandReceiver`] in
//! [`ReaderSession::run`](crate::reader::ReaderSession::run).

use anyhow::{Context, Result};
use quote_anchor_core::models::{Citation, HighlightRecord};
use tokio::sync::mpsc;

/// Capacity of the command queue; senders wait when it is full.
pub const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    /// Highlight or un-highlight the current selection.
    ToggleHighlight,
    /// Scroll to and flash the passage a citation points at.
    GoToCitation(Citation),
    /// Scroll to and flash a saved highlight.
    RevealHighlight(HighlightRecord),
    /// Drop any transient highlight now.
    ClearHighlights,
}

#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<ReaderCommand>,
}

impl CommandSender {
    pub async fn send(&self, command: ReaderCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .context("reader session has shut down")
    }

    pub async fn toggle_highlight(&self) -> Result<()> {
        self.send(ReaderCommand::ToggleHighlight).await
    }

    pub async fn go_to_citation(&self, citation: Citation) -> Result<()> {
        self.send(ReaderCommand::GoToCitation(citation)).await
    }
}

#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<ReaderCommand>,
}

impl CommandReceiver {
    /// Next command, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<ReaderCommand> {
        self.rx.recv().await
    }
}

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    (CommandSender { tx }, CommandReceiver { rx })
}
