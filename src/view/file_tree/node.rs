use crate::services::listing::FileEntry;
use std::fmt;

/// Identifier of a tree node: its full path from the storage root
///
/// The root is the empty path; every other id is the parent id joined with the
/// entry name by `/` (top-level ids are just the name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// The storage root (lists the top-level spaces)
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Build an id from a path, ignoring leading and trailing slashes
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().trim_matches('/').to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the entry `name` inside this directory
    pub fn child(&self, name: &str) -> NodeId {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// Parent id (`None` for the root; top-level nodes return the root)
    pub fn parent(&self) -> Option<NodeId> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(pos) => Self(self.0[..pos].to_string()),
            None => Self::root(),
        })
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Nesting depth; top-level nodes are at depth 0
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Whether a node's children listing has been fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never expanded (or the last fetch failed)
    NotLoaded,
    /// Expanded, stub children reserve rows until the listing arrives
    Placeholder,
    /// Real listing received; never refetched for this node
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIcon {
    Folder,
    File,
}

/// What the embedding page sees when the selection changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDataItem {
    pub id: NodeId,
    /// Label shown in the tree (category label for top-level spaces)
    pub name: String,
    pub icon: NodeIcon,
    pub is_dir: bool,
    pub has_children: bool,
}

/// Represents one file or directory in the tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    /// Entry as reported by the parent listing
    pub entry: FileEntry,
    pub display_name: String,
    /// Computed once from the parent listing, never from `children`
    has_children: bool,
    pub(super) children: Vec<FileEntry>,
    /// Rows reserved while the listing is in flight
    pub(super) stub_count: u64,
    pub(super) child_ids: Vec<NodeId>,
    pub(super) load_state: LoadState,
    pub(super) expanded: bool,
    pub(super) generation: u64,
    pub(super) last_error: Option<String>,
}

impl TreeNode {
    /// Create a node for `entry`; `generation` identifies this incarnation
    pub fn new(id: NodeId, entry: FileEntry, display_name: String, generation: u64) -> Self {
        let has_children = entry.is_dir && entry.child_count() > 0;

        Self {
            id,
            entry,
            display_name,
            has_children,
            children: Vec::new(),
            stub_count: 0,
            child_ids: Vec::new(),
            load_state: LoadState::NotLoaded,
            expanded: false,
            generation,
            last_error: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir
    }

    /// Whether the node renders as an expandable accordion
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Expanded and still waiting for its listing
    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Placeholder
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    /// Error of the last failed expansion, cleared by the next attempt
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sorted children listing (empty until loaded)
    pub fn children(&self) -> &[FileEntry] {
        &self.children
    }

    /// Number of stub entries shown while the listing is in flight
    ///
    /// Equals the child count the parent listing reported, and drops to 0
    /// once the listing arrives or fails.
    pub fn placeholder_count(&self) -> u64 {
        self.stub_count
    }

    /// Ids of the materialized child nodes (empty unless expanded and loaded)
    pub fn child_ids(&self) -> &[NodeId] {
        &self.child_ids
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn depth(&self) -> usize {
        self.id.depth()
    }

    pub fn icon(&self) -> NodeIcon {
        if self.is_dir() {
            NodeIcon::Folder
        } else {
            NodeIcon::File
        }
    }

    pub fn item(&self) -> TreeDataItem {
        TreeDataItem {
            id: self.id.clone(),
            name: self.display_name.clone(),
            icon: self.icon(),
            is_dir: self.is_dir(),
            has_children: self.has_children,
        }
    }
}
