use super::category::{sort_listing, sort_top_level, space_display_name};
use super::node::{LoadState, NodeId, TreeDataItem, TreeNode};
use crate::services::listing::{DirectoryLister, FileEntry, ListingScope};
use std::collections::HashMap;
use std::fmt;
use std::io;

/// Most stub rows shown under one directory; keeps row indices after the run
/// representable
pub const MAX_STUB_ROWS: usize = usize::MAX / 2;

/// Callback invoked whenever the selection changes
pub type SelectCallback = Box<dyn FnMut(Option<&TreeDataItem>) + Send>;

/// A listing fetch the tree wants issued
///
/// The tree never performs I/O itself: operations that need a listing return
/// a request, and the caller feeds the result back through [`FileTree::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Directory to list (the root for the top-level listing)
    pub id: NodeId,
    /// Token the result must still match when it comes back
    pub generation: u64,
}

impl LoadRequest {
    /// Path passed to the lister
    pub fn path(&self) -> &str {
        self.id.as_str()
    }

    /// Fetch the listing and pair it with this request
    pub async fn run(self, lister: &dyn DirectoryLister) -> LoadOutcome {
        let result = lister.list_directory(self.path()).await;
        LoadOutcome {
            request: self,
            result,
        }
    }
}

/// Result of a [`LoadRequest`]
#[derive(Debug)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: io::Result<Vec<FileEntry>>,
}

/// What [`FileTree::apply`] did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// Listing installed
    Applied,
    /// Fetch failed; the node (or the root) now carries the error
    Failed,
    /// Target was discarded, re-created or already settled; nothing changed
    Stale,
}

/// State of the top-level listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootState {
    Unmounted,
    Loading,
    Ready,
    Failed(String),
}

/// One row of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    pub kind: RowKind,
    /// Indentation level (top-level rows are 0)
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Node(NodeId),
    /// Stub row reserved under a node whose listing is in flight
    Placeholder { parent: NodeId, index: usize },
}

impl VisibleRow {
    pub fn node_id(&self) -> Option<&NodeId> {
        match &self.kind {
            RowKind::Node(id) => Some(id),
            RowKind::Placeholder { .. } => None,
        }
    }
}

/// A run of consecutive display rows
///
/// Stub rows under a loading directory are kept as one run, since the server
/// may report far more children than can ever be on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSpan {
    Node { id: NodeId, depth: usize },
    Placeholders { parent: NodeId, depth: usize, count: usize },
}

impl RowSpan {
    /// Number of rows the run covers
    pub fn len(&self) -> usize {
        match self {
            RowSpan::Node { .. } => 1,
            RowSpan::Placeholders { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily loaded tree over a remote storage listing
///
/// Only the top-level listing is fetched on mount. A directory's listing is
/// fetched the first time it is expanded; until it arrives the directory shows
/// one stub child per entry it reported.
pub struct FileTree {
    scope: ListingScope,
    nodes: HashMap<NodeId, TreeNode>,
    /// Top-level node ids in display order
    top_level: Vec<NodeId>,
    root_state: RootState,
    root_generation: u64,
    next_generation: u64,
    selected_item_id: Option<NodeId>,
    initial_selected_item_id: Option<NodeId>,
    on_select_change: Option<SelectCallback>,
}

impl fmt::Debug for FileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTree")
            .field("scope", &self.scope)
            .field("nodes", &self.nodes.len())
            .field("root_state", &self.root_state)
            .field("selected_item_id", &self.selected_item_id)
            .field("on_select_change", &self.on_select_change.is_some())
            .finish()
    }
}

impl FileTree {
    pub fn new(scope: ListingScope) -> Self {
        Self {
            scope,
            nodes: HashMap::new(),
            top_level: Vec::new(),
            root_state: RootState::Unmounted,
            root_generation: 0,
            next_generation: 1,
            selected_item_id: None,
            initial_selected_item_id: None,
            on_select_change: None,
        }
    }

    /// Start with `id` selected; restored on every remount
    pub fn with_initial_selection(mut self, id: Option<NodeId>) -> Self {
        self.selected_item_id = id.clone();
        self.initial_selected_item_id = id;
        self
    }

    pub fn set_on_select_change(&mut self, callback: SelectCallback) {
        self.on_select_change = Some(callback);
    }

    pub fn scope(&self) -> ListingScope {
        self.scope
    }

    pub fn root_state(&self) -> &RootState {
        &self.root_state
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Drop every node and request the top-level listing
    ///
    /// Results of fetches issued before the mount are discarded when they
    /// arrive, since their nodes no longer exist.
    pub fn mount(&mut self) -> LoadRequest {
        self.nodes.clear();
        self.top_level.clear();
        self.selected_item_id = self.initial_selected_item_id.clone();
        self.root_state = RootState::Loading;
        self.root_generation = self.bump_generation();

        tracing::info!(scope = %self.scope, "mounting file tree");
        LoadRequest {
            id: NodeId::root(),
            generation: self.root_generation,
        }
    }

    /// Install the result of a fetch
    pub fn apply(&mut self, outcome: LoadOutcome) -> ApplyResult {
        if outcome.request.id.is_root() {
            self.apply_root(outcome)
        } else {
            self.apply_node(outcome)
        }
    }

    fn apply_root(&mut self, outcome: LoadOutcome) -> ApplyResult {
        let LoadOutcome { request, result } = outcome;
        if self.root_state != RootState::Loading || request.generation != self.root_generation {
            tracing::debug!(generation = request.generation, "discarding stale root listing");
            return ApplyResult::Stale;
        }

        match result {
            Ok(mut entries) => {
                sort_top_level(&mut entries);
                for entry in entries {
                    if entry.is_unnamed() {
                        tracing::warn!("skipping unnamed entry in top-level listing");
                        continue;
                    }
                    let id = NodeId::root().child(&entry.name);
                    if self.nodes.contains_key(&id) {
                        tracing::warn!("duplicate top-level entry {:?}", entry.name);
                        continue;
                    }
                    let display_name = space_display_name(&entry.name, self.scope);
                    let generation = self.bump_generation();
                    self.nodes.insert(
                        id.clone(),
                        TreeNode::new(id.clone(), entry, display_name, generation),
                    );
                    self.top_level.push(id);
                }
                tracing::debug!("top-level listing has {} spaces", self.top_level.len());
                self.root_state = RootState::Ready;
                ApplyResult::Applied
            }
            Err(e) => {
                tracing::warn!("top-level listing failed: {}", e);
                self.root_state = RootState::Failed(e.to_string());
                ApplyResult::Failed
            }
        }
    }

    fn apply_node(&mut self, outcome: LoadOutcome) -> ApplyResult {
        let LoadOutcome { request, result } = outcome;
        let Some(node) = self.nodes.get_mut(&request.id) else {
            tracing::debug!("discarding listing for discarded node {}", request.id);
            return ApplyResult::Stale;
        };
        if node.generation != request.generation || node.load_state != LoadState::Placeholder {
            tracing::debug!(
                generation = request.generation,
                current = node.generation,
                "discarding stale listing for {}",
                request.id
            );
            return ApplyResult::Stale;
        }

        match result {
            Ok(mut entries) => {
                sort_listing(&mut entries);
                node.children = entries;
                node.stub_count = 0;
                node.load_state = LoadState::Loaded;
                node.last_error = None;
                let expanded = node.expanded;
                if expanded {
                    self.materialize_children(&request.id);
                }
                ApplyResult::Applied
            }
            Err(e) => {
                tracing::warn!("listing of {} failed: {}", request.id, e);
                node.children.clear();
                node.stub_count = 0;
                node.load_state = LoadState::NotLoaded;
                node.expanded = false;
                node.last_error = Some(e.to_string());
                ApplyResult::Failed
            }
        }
    }

    /// Build child nodes from a loaded listing
    fn materialize_children(&mut self, id: &NodeId) {
        let entries: Vec<FileEntry> = match self.nodes.get(id) {
            Some(node) if node.is_loaded() && node.child_ids.is_empty() => node
                .children
                .iter()
                .filter(|entry| !entry.is_unnamed())
                .cloned()
                .collect(),
            _ => return,
        };

        let mut child_ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let child_id = id.child(&entry.name);
            if self.nodes.contains_key(&child_id) {
                continue;
            }
            let display_name = entry.name.clone();
            let generation = self.bump_generation();
            self.nodes.insert(
                child_id.clone(),
                TreeNode::new(child_id.clone(), entry, display_name, generation),
            );
            child_ids.push(child_id);
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.child_ids = child_ids;
        }
    }

    /// Remove every descendant node of `id`
    fn discard_subtree(&mut self, id: &NodeId) {
        let child_ids = match self.nodes.get_mut(id) {
            Some(node) => std::mem::take(&mut node.child_ids),
            None => return,
        };
        for child_id in child_ids {
            self.discard_subtree(&child_id);
            self.nodes.remove(&child_id);
        }
    }

    /// Open a node's accordion
    ///
    /// Returns the fetch to issue when the node has never been loaded. Leaves
    /// and nodes already waiting for a listing are left untouched.
    pub fn expand(&mut self, id: &NodeId) -> Option<LoadRequest> {
        let generation = self.next_generation;
        let node = self.nodes.get_mut(id)?;
        if !node.has_children() {
            return None;
        }

        match node.load_state {
            LoadState::NotLoaded => {
                let stubs = node.entry.child_count();
                node.children.clear();
                node.stub_count = stubs;
                node.load_state = LoadState::Placeholder;
                node.expanded = true;
                node.last_error = None;
                node.generation = generation;
                self.next_generation += 1;

                tracing::debug!("expanding {} ({} entries)", id, stubs);
                Some(LoadRequest {
                    id: id.clone(),
                    generation,
                })
            }
            LoadState::Placeholder => {
                node.expanded = true;
                None
            }
            LoadState::Loaded => {
                node.expanded = true;
                self.materialize_children(id);
                None
            }
        }
    }

    /// Close a node's accordion and discard its subtree
    pub fn collapse(&mut self, id: &NodeId) {
        match self.nodes.get_mut(id) {
            Some(node) if node.expanded => node.expanded = false,
            _ => return,
        }
        self.discard_subtree(id);
    }

    pub fn toggle(&mut self, id: &NodeId) -> Option<LoadRequest> {
        if self.get_node(id)?.is_expanded() {
            self.collapse(id);
            None
        } else {
            self.expand(id)
        }
    }

    /// Row interaction: toggle expandable nodes, then select
    pub fn click(&mut self, id: &NodeId) -> Option<LoadRequest> {
        let has_children = self.get_node(id)?.has_children();
        let request = if has_children { self.toggle(id) } else { None };
        self.select(id);
        request
    }

    /// Select a node and notify the callback
    ///
    /// Returns false (and changes nothing) when the node does not exist.
    pub fn select(&mut self, id: &NodeId) -> bool {
        let Some(item) = self.nodes.get(id).map(TreeNode::item) else {
            return false;
        };
        self.selected_item_id = Some(id.clone());
        if let Some(callback) = self.on_select_change.as_mut() {
            callback(Some(&item));
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_item_id = None;
        if let Some(callback) = self.on_select_change.as_mut() {
            callback(None);
        }
    }

    pub fn selected_item_id(&self) -> Option<&NodeId> {
        self.selected_item_id.as_ref()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected_item_id.as_ref() == Some(id)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Parent node of `id`, if it is not a top-level node
    pub fn parent_of(&self, id: &NodeId) -> Option<&TreeNode> {
        let parent = id.parent()?;
        if parent.is_root() {
            return None;
        }
        self.nodes.get(&parent)
    }

    /// Display rows as runs, in pre-order
    pub fn row_spans(&self) -> Vec<RowSpan> {
        let mut spans = Vec::new();
        for id in &self.top_level {
            self.collect_spans(id, 0, &mut spans);
        }
        spans
    }

    fn collect_spans(&self, id: &NodeId, depth: usize, spans: &mut Vec<RowSpan>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        spans.push(RowSpan::Node {
            id: id.clone(),
            depth,
        });
        if !node.expanded {
            return;
        }

        match node.load_state {
            LoadState::Placeholder if node.stub_count > 0 => {
                spans.push(RowSpan::Placeholders {
                    parent: id.clone(),
                    depth: depth + 1,
                    count: usize::try_from(node.stub_count)
                        .unwrap_or(usize::MAX)
                        .min(MAX_STUB_ROWS),
                });
            }
            LoadState::Loaded => {
                for child_id in &node.child_ids {
                    self.collect_spans(child_id, depth + 1, spans);
                }
            }
            LoadState::Placeholder | LoadState::NotLoaded => {}
        }
    }

    /// Total number of display rows (saturating)
    pub fn visible_row_count(&self) -> usize {
        self.row_spans()
            .iter()
            .fold(0usize, |total, span| total.saturating_add(span.len()))
    }

    /// Row index of a node, counting stub rows before it
    pub fn row_index(&self, id: &NodeId) -> Option<usize> {
        let mut index = 0usize;
        for span in self.row_spans() {
            if let RowSpan::Node { id: row_id, .. } = &span {
                if row_id == id {
                    return Some(index);
                }
            }
            index = index.saturating_add(span.len());
        }
        None
    }

    /// Ids of the node rows in display order
    pub fn node_rows(&self) -> Vec<NodeId> {
        self.row_spans()
            .into_iter()
            .filter_map(|span| match span {
                RowSpan::Node { id, .. } => Some(id),
                RowSpan::Placeholders { .. } => None,
            })
            .collect()
    }

    /// Display rows `start..start + len`, expanding only the stub rows inside
    /// that window
    pub fn visible_rows_range(&self, start: usize, len: usize) -> Vec<VisibleRow> {
        let end = start.saturating_add(len);
        let mut rows = Vec::new();
        let mut offset = 0usize;
        for span in self.row_spans() {
            if offset >= end {
                break;
            }
            let span_end = offset.saturating_add(span.len());
            if span_end > start {
                match span {
                    RowSpan::Node { id, depth } => rows.push(VisibleRow {
                        kind: RowKind::Node(id),
                        depth,
                    }),
                    RowSpan::Placeholders { parent, depth, .. } => {
                        let first = start.saturating_sub(offset);
                        let last = end.min(span_end) - offset;
                        rows.extend((first..last).map(|index| VisibleRow {
                            kind: RowKind::Placeholder {
                                parent: parent.clone(),
                                index,
                            },
                            depth,
                        }));
                    }
                }
            }
            offset = span_end;
        }
        rows
    }

    /// Every display row, one per stub entry
    ///
    /// Grows with the reported child counts of loading directories; display
    /// code uses [`FileTree::visible_rows_range`] instead.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        self.visible_rows_range(0, usize::MAX)
    }

    /// Mount and expand every directory down to `max_depth` levels
    ///
    /// Fetches run one after another; used for non-interactive output.
    pub async fn load_to_depth(&mut self, lister: &dyn DirectoryLister, max_depth: usize) {
        let request = self.mount();
        let outcome = request.run(lister).await;
        if self.apply(outcome) != ApplyResult::Applied {
            return;
        }

        let mut frontier = self.top_level.clone();
        for _ in 0..max_depth {
            let mut next = Vec::new();
            for id in &frontier {
                if let Some(request) = self.expand(id) {
                    let outcome = request.run(lister).await;
                    self.apply(outcome);
                }
                if let Some(node) = self.nodes.get(id) {
                    next.extend(node.child_ids.iter().cloned());
                }
            }
            frontier = next;
        }
    }
}
