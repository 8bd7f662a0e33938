//! Plain-text rendering of the tree for `--print`

use crate::view::file_tree::{FileTree, RootState, RowSpan};
use std::io::{self, Write};

/// Write the visible rows of `tree` as an indented outline
///
/// Directories end with `/`; top-level spaces show their label followed by
/// the raw name; failed directories carry their error. A directory still
/// loading gets one line with its reported entry count.
pub fn write_tree<W: Write>(tree: &FileTree, out: &mut W) -> io::Result<()> {
    if let RootState::Failed(error) = tree.root_state() {
        return Err(io::Error::other(format!("top-level listing failed: {error}")));
    }

    for span in tree.row_spans() {
        let (id, depth) = match span {
            RowSpan::Node { id, depth } => (id, depth),
            RowSpan::Placeholders { parent, depth, .. } => {
                let count = tree
                    .get_node(&parent)
                    .map_or(0, |node| node.placeholder_count());
                writeln!(out, "{}… ({count} entries loading)", "  ".repeat(depth))?;
                continue;
            }
        };
        let indent = "  ".repeat(depth);
        let Some(node) = tree.get_node(&id) else {
            continue;
        };

        let marker = if tree.is_selected(&id) { "* " } else { "" };
        let suffix = if node.is_dir() { "/" } else { "" };
        if node.display_name == node.entry.name {
            write!(out, "{indent}{marker}{}{suffix}", node.display_name)?;
        } else {
            write!(
                out,
                "{indent}{marker}{} ({}{suffix})",
                node.display_name, node.entry.name
            )?;
        }
        if let Some(error) = node.last_error() {
            write!(out, "  [error: {error}]")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
