use crate::view::file_tree::{
    FileTreeView, LoadState, NodeIcon, NodeId, RootState, RowKind, TreeNode, VisibleRow,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const FOLDER_ICON: &str = "📁 ";
const FILE_ICON: &str = "📄 ";
const SKELETON: &str = "░░░░░░░░░░";

/// Colors used by the tree and status line
#[derive(Debug, Clone)]
pub struct TreePalette {
    pub bg: Color,
    pub fg: Color,
    pub dim_fg: Color,
    pub folder_fg: Color,
    pub indicator_fg: Color,
    pub error_fg: Color,
    pub cursor: Color,
    pub cursor_bg: Color,
    pub selected_bg: Color,
    pub border_fg: Color,
}

impl Default for TreePalette {
    fn default() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim_fg: Color::DarkGray,
            folder_fg: Color::LightBlue,
            indicator_fg: Color::Yellow,
            error_fg: Color::LightRed,
            cursor: Color::LightCyan,
            cursor_bg: Color::Rgb(50, 54, 62),
            selected_bg: Color::Rgb(38, 79, 120),
            border_fg: Color::Gray,
        }
    }
}

pub struct FileTreeRenderer;

impl FileTreeRenderer {
    /// Render the tree (or the root loading/error state) into `area`
    pub fn render(view: &mut FileTreeView, frame: &mut Frame, area: Rect, palette: &TreePalette) {
        // Account for borders (top + bottom = 2)
        let viewport_height = area.height.saturating_sub(2) as usize;
        view.set_viewport_height(viewport_height);

        let title = format!(" Crater files ({}) ", view.tree().scope());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(
                Style::default()
                    .fg(palette.fg)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(palette.border_fg))
            .style(Style::default().bg(palette.bg));

        let message = match view.tree().root_state() {
            RootState::Unmounted | RootState::Loading => Some(vec![Line::from(Span::styled(
                "Loading spaces…",
                Style::default().fg(palette.dim_fg),
            ))]),
            RootState::Failed(error) => Some(vec![
                Line::from(Span::styled(
                    format!("Failed to load spaces: {}", error),
                    Style::default().fg(palette.error_fg),
                )),
                Line::from(Span::styled(
                    "Press r to retry",
                    Style::default().fg(palette.dim_fg),
                )),
            ]),
            RootState::Ready if view.tree().top_level().is_empty() => Some(vec![Line::from(
                Span::styled("No spaces available", Style::default().fg(palette.dim_fg)),
            )]),
            RootState::Ready => None,
        };
        if let Some(lines) = message {
            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
            return;
        }

        view.update_scroll_for_cursor();
        let scroll_offset = view.scroll_offset();
        let rows = view.viewport_rows();
        let cursor_index = view.cursor_index();

        // Available width for content (subtract borders and cursor indicator)
        let content_width = area.width.saturating_sub(3) as usize;

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| Self::render_row(view, row, palette, content_width))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(palette.cursor_bg));

        // Only visible rows are passed, so the cursor is relative to the viewport
        let mut list_state = ListState::default();
        let cursor_row = cursor_index
            .filter(|&idx| idx >= scroll_offset && idx - scroll_offset < rows.len())
            .map(|idx| idx - scroll_offset);
        list_state.select(cursor_row);

        frame.render_stateful_widget(list, area, &mut list_state);

        if let (Some(row), true) = (cursor_row, area.width > 2) {
            let cursor_x = area.x + 1;
            let cursor_y = area.y + 1 + row as u16;
            let indicator = Paragraph::new("▌").style(Style::default().fg(palette.cursor));
            frame.render_widget(indicator, Rect::new(cursor_x, cursor_y, 1, 1));
        }
    }

    fn render_row(
        view: &FileTreeView,
        row: &VisibleRow,
        palette: &TreePalette,
        content_width: usize,
    ) -> ListItem<'static> {
        let indent = "  ".repeat(row.depth);
        match &row.kind {
            RowKind::Placeholder { .. } => ListItem::new(Line::from(vec![
                Span::raw(indent),
                Span::raw("  "),
                Span::styled(SKELETON, Style::default().fg(palette.dim_fg)),
            ])),
            RowKind::Node(id) => match view.tree().get_node(id) {
                Some(node) => {
                    let selected = view.tree().is_selected(id);
                    Self::render_node(node, indent, selected, palette, content_width)
                }
                None => ListItem::new(Line::from(Span::raw(indent))),
            },
        }
    }

    fn render_node(
        node: &TreeNode,
        indent: String,
        selected: bool,
        palette: &TreePalette,
        content_width: usize,
    ) -> ListItem<'static> {
        let mut spans = Vec::new();
        let mut used = indent.width();
        spans.push(Span::raw(indent));

        // Only accordions carry an expansion indicator
        let (indicator, indicator_style) = if node.last_error().is_some() {
            ("! ", Style::default().fg(palette.error_fg))
        } else if !node.has_children() {
            ("  ", Style::default())
        } else if node.load_state() == LoadState::Placeholder {
            ("⟳ ", Style::default().fg(palette.indicator_fg))
        } else if node.is_expanded() {
            ("▼ ", Style::default().fg(palette.indicator_fg))
        } else {
            ("> ", Style::default().fg(palette.indicator_fg))
        };
        used += indicator.width();
        spans.push(Span::styled(indicator, indicator_style));

        let icon = match node.icon() {
            NodeIcon::Folder => FOLDER_ICON,
            NodeIcon::File => FILE_ICON,
        };
        used += icon.width();
        spans.push(Span::raw(icon));

        let name_style = if node.is_dir() {
            Style::default().fg(palette.folder_fg)
        } else {
            Style::default().fg(palette.fg)
        };
        let name_style = if selected {
            name_style.bg(palette.selected_bg).add_modifier(Modifier::BOLD)
        } else {
            name_style
        };

        let available = content_width.saturating_sub(used);
        let label = truncate_to_width(&node.display_name, available);
        let mut remaining = available.saturating_sub(label.width());
        spans.push(Span::styled(label, name_style));

        // Top-level spaces show their category label; the raw name follows
        if is_top_level(&node.id) && node.display_name != node.entry.name && remaining > 3 {
            let raw = truncate_to_width(&format!(" ({})", node.entry.name), remaining);
            remaining = remaining.saturating_sub(raw.width());
            spans.push(Span::styled(raw, Style::default().fg(palette.dim_fg)));
        }

        if let Some(error) = node.last_error() {
            let text = truncate_to_width(&format!("  {}", error), remaining);
            spans.push(Span::styled(
                text,
                Style::default()
                    .fg(palette.error_fg)
                    .add_modifier(Modifier::ITALIC),
            ));
        }

        ListItem::new(Line::from(spans))
    }
}

fn is_top_level(id: &NodeId) -> bool {
    id.parent().is_some_and(|parent| parent.is_root())
}

/// Cut `text` to at most `max_width` terminal columns, marking the cut with `…`
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}
