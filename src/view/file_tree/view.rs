use super::node::NodeId;
use super::tree::{FileTree, LoadRequest, VisibleRow};

/// Cursor and scrolling state over a [`FileTree`]
///
/// The cursor is the keyboard focus and is distinct from the tree's selection:
/// moving it does not notify anyone, clicking the row under it does.
#[derive(Debug)]
pub struct FileTreeView {
    /// The underlying tree model
    tree: FileTree,
    /// Node under the cursor
    cursor: Option<NodeId>,
    /// Scroll offset (index into visible rows)
    scroll_offset: usize,
    /// Last known viewport height (for scrolling calculations)
    pub(crate) viewport_height: usize,
}

impl FileTreeView {
    pub fn new(tree: FileTree) -> Self {
        Self {
            tree,
            cursor: None,
            scroll_offset: 0,
            viewport_height: 10, // Default, will be updated during rendering
        }
    }

    /// Set the viewport height (should be called during rendering)
    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut FileTree {
        &mut self.tree
    }

    /// Rows inside the viewport, starting at the scroll offset
    pub fn viewport_rows(&self) -> Vec<VisibleRow> {
        self.tree
            .visible_rows_range(self.scroll_offset, self.viewport_height)
    }

    pub fn cursor(&self) -> Option<&NodeId> {
        self.cursor.as_ref()
    }

    pub fn set_cursor(&mut self, id: Option<NodeId>) {
        self.cursor = id;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Ids of node rows in display order (placeholders are not focusable)
    fn node_rows(&self) -> Vec<NodeId> {
        self.tree.node_rows()
    }

    fn move_cursor(&mut self, step: impl FnOnce(usize, usize) -> usize) {
        let nodes = self.node_rows();
        if nodes.is_empty() {
            self.cursor = None;
            return;
        }

        let current = self
            .cursor
            .as_ref()
            .and_then(|cursor| nodes.iter().position(|id| id == cursor));
        let new_pos = match current {
            Some(pos) => step(pos, nodes.len()).min(nodes.len() - 1),
            None => 0,
        };
        self.cursor = Some(nodes[new_pos].clone());
        self.update_scroll_for_cursor();
    }

    pub fn cursor_next(&mut self) {
        self.move_cursor(|pos, _| pos + 1);
    }

    pub fn cursor_prev(&mut self) {
        self.move_cursor(|pos, _| pos.saturating_sub(1));
    }

    pub fn cursor_page_down(&mut self) {
        let page = self.viewport_height.max(1);
        self.move_cursor(|pos, _| pos + page);
    }

    pub fn cursor_page_up(&mut self) {
        let page = self.viewport_height.max(1);
        self.move_cursor(|pos, _| pos.saturating_sub(page));
    }

    pub fn cursor_first(&mut self) {
        self.move_cursor(|_, _| 0);
    }

    pub fn cursor_last(&mut self) {
        self.move_cursor(|_, len| len - 1);
    }

    /// Move the cursor to the parent of the node under it
    pub fn cursor_parent(&mut self) {
        let parent = self
            .cursor
            .as_ref()
            .and_then(|cursor| self.tree.parent_of(cursor))
            .map(|node| node.id.clone());
        if parent.is_some() {
            self.cursor = parent;
            self.update_scroll_for_cursor();
        }
    }

    /// Put the cursor back on a visible node after the tree changed
    ///
    /// A cursor inside a discarded subtree moves to its closest remaining
    /// ancestor; with nothing left it falls back to the selection, then to
    /// the first row.
    pub fn repair_cursor(&mut self) {
        let nodes = self.node_rows();
        let mut candidate = self.cursor.clone();
        while let Some(id) = candidate {
            if nodes.contains(&id) {
                self.cursor = Some(id);
                self.update_scroll_for_cursor();
                return;
            }
            candidate = id.parent().filter(|parent| !parent.is_root());
        }

        self.cursor = self
            .tree
            .selected_item_id()
            .filter(|selected| nodes.contains(selected))
            .cloned()
            .or_else(|| nodes.first().cloned());
        self.update_scroll_for_cursor();
    }

    /// Click the row under the cursor
    pub fn click_cursor(&mut self) -> Option<LoadRequest> {
        let cursor = self.cursor.clone()?;
        let request = self.tree.click(&cursor);
        self.repair_cursor();
        request
    }

    pub fn expand_cursor(&mut self) -> Option<LoadRequest> {
        let cursor = self.cursor.clone()?;
        self.tree.expand(&cursor)
    }

    /// Collapse the node under the cursor, or move to its parent
    pub fn collapse_cursor(&mut self) {
        let Some(cursor) = self.cursor.clone() else {
            return;
        };
        let expanded = self
            .tree
            .get_node(&cursor)
            .is_some_and(|node| node.is_expanded());
        if expanded {
            self.tree.collapse(&cursor);
            self.repair_cursor();
        } else {
            self.cursor_parent();
        }
    }

    /// Update scroll offset so the cursor row stays inside the viewport
    ///
    /// Scrolls only when the cursor goes past the viewport edges, so moving
    /// down walks the cursor to the bottom before scrolling and moving up
    /// walks it to the top.
    pub fn update_scroll_for_cursor(&mut self) {
        if self.viewport_height == 0 {
            return;
        }

        let total = self.tree.visible_row_count();
        let max_offset = total.saturating_sub(self.viewport_height);
        if self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }

        if let Some(pos) = self.cursor_index() {
            if pos < self.scroll_offset {
                self.scroll_offset = pos;
            } else if pos >= self.scroll_offset.saturating_add(self.viewport_height) {
                self.scroll_offset = pos - self.viewport_height + 1;
            }
        }
    }

    /// Index of the cursor within the visible rows
    pub fn cursor_index(&self) -> Option<usize> {
        let cursor = self.cursor.as_ref()?;
        self.tree.row_index(cursor)
    }
}
