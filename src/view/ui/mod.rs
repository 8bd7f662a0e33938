//! UI rendering modules
//!
//! - `file_tree` - Lazy file tree rendering
//! - `status_bar` - Selection and key hint footer

pub mod file_tree;
pub mod status_bar;

pub use file_tree::{FileTreeRenderer, TreePalette};
pub use status_bar::StatusBarRenderer;
