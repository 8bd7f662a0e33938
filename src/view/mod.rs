//! View and UI layer
//!
//! `file_tree` holds the tree model and cursor state; `ui` draws them.

pub mod file_tree;
pub mod ui;
