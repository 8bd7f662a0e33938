// Lazily loaded tree over a remote storage listing
//
// Only the top-level spaces are listed on mount; a directory is listed the
// first time it is expanded and never again until the tree is remounted.

pub mod category;
pub mod node;
pub mod tree;
pub mod view;

pub use category::{space_display_name, SpaceCategory};
pub use node::{LoadState, NodeIcon, NodeId, TreeDataItem, TreeNode};
pub use tree::{
    ApplyResult, FileTree, LoadOutcome, LoadRequest, RootState, RowKind, RowSpan, SelectCallback,
    VisibleRow, MAX_STUB_ROWS,
};
pub use view::FileTreeView;
