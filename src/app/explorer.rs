//! Interactive explorer: wires the tree to the listing manager and the keyboard
//!
//! Fetches run on the tokio runtime and report back through the
//! [`AsyncBridge`]; every tree mutation happens on the UI thread inside
//! [`Explorer::process_async_messages`] or [`Explorer::handle_key`].

use crate::services::async_bridge::{AsyncBridge, AsyncMessage};
use crate::services::listing::ListingManager;
use crate::view::file_tree::{
    ApplyResult, FileTree, FileTreeView, LoadRequest, RootState, TreeDataItem,
};
use crate::view::ui::{FileTreeRenderer, StatusBarRenderer, TreePalette};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

pub struct Explorer {
    view: FileTreeView,
    manager: Arc<ListingManager>,
    runtime: Handle,
    bridge: AsyncBridge,
    palette: TreePalette,
    /// Transient footer message (errors, reloads); cleared by the next key
    status_message: Option<String>,
    /// Latest item reported through the selection callback
    last_selection: Option<TreeDataItem>,
    should_quit: bool,
}

impl Explorer {
    pub fn new(mut tree: FileTree, manager: Arc<ListingManager>, runtime: Handle) -> Self {
        let bridge = AsyncBridge::new();
        let sender = bridge.sender();
        tree.set_on_select_change(Box::new(move |item| {
            // The receiver lives as long as the explorer
            let _ = sender.send(AsyncMessage::SelectionChanged(item.cloned()));
        }));

        Self {
            view: FileTreeView::new(tree),
            manager,
            runtime,
            bridge,
            palette: TreePalette::default(),
            status_message: None,
            last_selection: None,
            should_quit: false,
        }
    }

    pub fn view(&self) -> &FileTreeView {
        &self.view
    }

    pub fn tree(&self) -> &FileTree {
        self.view.tree()
    }

    pub fn last_selection(&self) -> Option<&TreeDataItem> {
        self.last_selection.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Request the top-level listing
    pub fn mount(&mut self) {
        let request = self.view.tree_mut().mount();
        self.spawn_load(request);
    }

    /// Drop cached listings and rebuild the tree from the top-level listing
    pub fn remount(&mut self) {
        let request = self.view.tree_mut().mount();
        self.view.set_cursor(None);
        self.status_message = Some("Reloading…".to_string());

        let manager = self.manager.clone();
        let sender = self.bridge.sender();
        self.runtime.spawn(async move {
            manager.clear_cache().await;
            let outcome = request.run(&*manager).await;
            if sender.send(AsyncMessage::ListingLoaded(outcome)).is_err() {
                tracing::debug!("explorer closed before the top-level listing arrived");
            }
        });
    }

    fn spawn_load(&self, request: LoadRequest) {
        let manager = self.manager.clone();
        let sender = self.bridge.sender();
        self.runtime.spawn(async move {
            let path = request.id.clone();
            let outcome = request.run(&*manager).await;
            if sender.send(AsyncMessage::ListingLoaded(outcome)).is_err() {
                tracing::debug!("explorer closed before listing of {} arrived", path);
            }
        });
    }

    /// Apply everything the runtime has sent since the last call
    ///
    /// Returns true if anything changed and the screen should be redrawn.
    pub fn process_async_messages(&mut self) -> bool {
        let messages = self.bridge.try_recv_all();
        if messages.is_empty() {
            return false;
        }

        for message in messages {
            match message {
                AsyncMessage::ListingLoaded(outcome) => {
                    let id = outcome.request.id.clone();
                    match self.view.tree_mut().apply(outcome) {
                        ApplyResult::Applied if id.is_root() => {
                            self.status_message = None;
                            self.view.repair_cursor();
                        }
                        ApplyResult::Applied => {}
                        ApplyResult::Failed if id.is_root() => {
                            self.status_message = None;
                        }
                        ApplyResult::Failed => {
                            self.status_message = Some(format!("Could not list {}", id));
                            self.view.repair_cursor();
                        }
                        ApplyResult::Stale => {}
                    }
                }
                AsyncMessage::SelectionChanged(item) => {
                    match &item {
                        Some(item) => tracing::info!("selected {}", item.id),
                        None => tracing::info!("selection cleared"),
                    }
                    self.last_selection = item;
                }
            }
        }
        true
    }

    /// Process messages until `done` holds or `timeout` elapses
    ///
    /// Returns whether `done` was reached.
    pub fn wait_until(&mut self, timeout: Duration, mut done: impl FnMut(&Explorer) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_async_messages();
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Handle a key press; returns false for keys the explorer ignores
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                self.should_quit = true;
                return true;
            }
            return false;
        }

        let root_ready = *self.view.tree().root_state() == RootState::Ready;
        self.status_message = None;

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.remount(),
            KeyCode::Esc => self.view.tree_mut().clear_selection(),
            _ if !root_ready => return false,
            KeyCode::Up | KeyCode::Char('k') => self.view.cursor_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.view.cursor_next(),
            KeyCode::PageUp => self.view.cursor_page_up(),
            KeyCode::PageDown => self.view.cursor_page_down(),
            KeyCode::Home => self.view.cursor_first(),
            KeyCode::End => self.view.cursor_last(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(request) = self.view.click_cursor() {
                    self.spawn_load(request);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if let Some(request) = self.view.expand_cursor() {
                    self.spawn_load(request);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.view.collapse_cursor(),
            _ => return false,
        }
        true
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(frame.area());

        FileTreeRenderer::render(&mut self.view, frame, chunks[0], &self.palette);
        StatusBarRenderer::render(
            frame,
            chunks[1],
            self.view.tree(),
            self.status_message.as_deref(),
            &self.palette,
        );
    }
}
