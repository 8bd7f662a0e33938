use super::file_tree::{truncate_to_width, TreePalette};
use crate::view::file_tree::FileTree;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

const KEY_HINTS: &str = "↑↓ move  ⏎ open  ← → fold  r reload  esc clear  q quit";

/// Single-line footer: current selection or a transient message, plus key hints
pub struct StatusBarRenderer;

impl StatusBarRenderer {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        tree: &FileTree,
        message: Option<&str>,
        palette: &TreePalette,
    ) {
        let width = area.width as usize;
        let left = match (message, tree.selected_item_id()) {
            (Some(message), _) => message.to_string(),
            (None, Some(id)) => match tree.get_node(id) {
                Some(node) if node.display_name != node.entry.name => {
                    format!("Selected: {} ({})", id, node.display_name)
                }
                _ => format!("Selected: {}", id),
            },
            (None, None) => "Nothing selected".to_string(),
        };

        // Hints only when they fit next to the status text
        let hints_width = KEY_HINTS.width();
        let show_hints = left.width() + 2 + hints_width <= width;
        let left_width = if show_hints {
            width - hints_width - 2
        } else {
            width
        };
        let left = truncate_to_width(&left, left_width);

        let mut spans = vec![Span::styled(
            left.clone(),
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
        )];
        if show_hints {
            let padding = width.saturating_sub(left.width() + hints_width);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::styled(KEY_HINTS, Style::default().fg(palette.dim_fg)));
        }

        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.cursor_bg)),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::{FileEntry, ListingScope};
    use crate::view::file_tree::{LoadOutcome, NodeId};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(tree: &FileTree, message: Option<&str>, width: u16) -> String {
        let backend = TestBackend::new(width, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                let area = Rect::new(0, 0, width, 1);
                StatusBarRenderer::render(frame, area, tree, message, &TreePalette::default());
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..width).map(|x| buffer[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn test_shows_selection_with_label() {
        let mut tree = FileTree::new(ListingScope::Files);
        let request = tree.mount();
        tree.apply(LoadOutcome {
            request,
            result: Ok(vec![FileEntry::dir("q-lab1", 0)]),
        });

        assert!(draw(&tree, None, 100).contains("Nothing selected"));

        tree.select(&NodeId::new("q-lab1"));
        let line = draw(&tree, None, 100);
        assert!(line.contains("Selected: q-lab1 (account space)"));
        assert!(line.contains("q quit"));
    }

    #[test]
    fn test_message_takes_precedence_and_hints_drop_when_narrow() {
        let tree = FileTree::new(ListingScope::Files);
        let line = draw(&tree, Some("Reloading…"), 20);
        assert!(line.starts_with("Reloading"));
        assert!(!line.contains("quit"));
    }
}
