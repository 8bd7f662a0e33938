//! Channel between tokio tasks and the UI thread
//!
//! Listing fetches run on the runtime; their results come back as
//! [`AsyncMessage`]s that the explorer drains once per frame, so every tree
//! mutation happens on the UI thread.

use crate::view::file_tree::{LoadOutcome, TreeDataItem};
use std::sync::mpsc;

#[derive(Debug)]
pub enum AsyncMessage {
    /// A directory listing (or the top-level listing) finished
    ListingLoaded(LoadOutcome),
    /// The tree reported a selection change
    SelectionChanged(Option<TreeDataItem>),
}

#[derive(Debug)]
pub struct AsyncBridge {
    sender: mpsc::Sender<AsyncMessage>,
    receiver: mpsc::Receiver<AsyncMessage>,
}

impl AsyncBridge {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Sender handle for a task or callback
    pub fn sender(&self) -> mpsc::Sender<AsyncMessage> {
        self.sender.clone()
    }

    /// Drain every message that has arrived so far without blocking
    pub fn try_recv_all(&self) -> Vec<AsyncMessage> {
        self.receiver.try_iter().collect()
    }
}

impl Default for AsyncBridge {
    fn default() -> Self {
        Self::new()
    }
}
