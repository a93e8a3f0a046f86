use nemo_core::{FileInfo, ListModel, VisibleRow, format_count, format_size};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use super::theme::Theme;

/// Indentation per tree level
const INDENT: &str = "   ";

/// Width of the size column
const SIZE_WIDTH: usize = 11;

/// Text of the size column: bytes for files, entry count for directories
pub fn size_label(file: &FileInfo) -> String {
    if file.is_directory() {
        match file.item_count {
            Some(1) => "1 item".to_string(),
            Some(n) => format!("{} items", format_count(n)),
            None => "--".to_string(),
        }
    } else {
        format_size(file.size)
    }
}

/// File list backed by the list model's visible rows
pub struct ListView<'a> {
    model: &'a ListModel,
    rows: &'a [VisibleRow],
    selected_index: usize,
    scroll_offset: usize,
    theme: &'a Theme,
}

impl<'a> ListView<'a> {
    pub fn new(
        model: &'a ListModel,
        rows: &'a [VisibleRow],
        selected_index: usize,
        scroll_offset: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            model,
            rows,
            selected_index,
            scroll_offset,
            theme,
        }
    }
}

impl Widget for ListView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 || area.width < 30 {
            return;
        }

        if self.rows.is_empty() {
            buf.set_string(
                area.x + 2,
                area.y,
                "(Empty)",
                Style::default()
                    .fg(self.theme.fg_muted)
                    .add_modifier(Modifier::ITALIC),
            );
            return;
        }

        let name_width = area.width as usize - SIZE_WIDTH - 2;

        for (i, row) in self
            .rows
            .iter()
            .skip(self.scroll_offset)
            .take(area.height as usize)
            .enumerate()
        {
            let y = area.y + i as u16;
            let Some(entry) = self.model.get(row.id) else {
                continue;
            };

            let is_cursor = i + self.scroll_offset == self.selected_index;
            let highlighted = entry
                .file()
                .is_some_and(|f| self.model.is_highlighted(&f.path));
            let base = if is_cursor {
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg)
            } else if highlighted {
                Style::default().bg(self.theme.bg_highlight).fg(self.theme.fg)
            } else {
                Style::default().bg(self.theme.bg).fg(self.theme.fg)
            };

            // Clear the row
            for x in 0..area.width {
                buf.set_string(area.x + x, y, " ", base);
            }

            let indent = INDENT.repeat(row.depth);
            let mut x = area.x + 1 + indent.len() as u16;

            let Some(file) = entry.file() else {
                // Placeholder row
                let label = self
                    .model
                    .placeholder_kind(row.id)
                    .map(|p| p.label())
                    .unwrap_or_default();
                let style = if is_cursor {
                    base.add_modifier(Modifier::ITALIC)
                } else {
                    base.fg(self.theme.fg_muted).add_modifier(Modifier::ITALIC)
                };
                buf.set_string(x + 2, y, label, style);
                continue;
            };

            // Expander
            if file.is_directory() {
                let expander = if entry.is_expanded() { "▼" } else { "▶" };
                let style = if is_cursor {
                    base
                } else {
                    base.fg(self.theme.fg_muted)
                };
                buf.set_string(x, y, expander, style);
            }
            x += 2;

            // Icon
            let icon_style = if is_cursor {
                base
            } else {
                base.fg(self.theme.icon_color(file.kind))
            };
            buf.set_string(x, y, file.kind.icon(), icon_style);
            x += 3;

            // Name
            let used = (x - area.x) as usize;
            let max_name_len = name_width.saturating_sub(used);
            let display_name = if file.name.chars().count() > max_name_len {
                let kept: String = file.name.chars().take(max_name_len.saturating_sub(1)).collect();
                format!("{}…", kept)
            } else {
                file.name.clone()
            };
            let mut name_style = if file.is_hidden() && !is_cursor {
                base.fg(self.theme.fg_dim)
            } else {
                base
            };
            if file.is_directory() || is_cursor {
                name_style = name_style.add_modifier(Modifier::BOLD);
            }
            if highlighted && !is_cursor {
                name_style = name_style.fg(self.theme.purple);
            }
            buf.set_string(x, y, &display_name, name_style);

            // Size (right-aligned)
            let size = format!("{:>width$}", size_label(file), width = SIZE_WIDTH);
            let size_x = area.x + area.width - SIZE_WIDTH as u16 - 1;
            let size_style = if is_cursor {
                base
            } else {
                base.fg(self.theme.fg_muted)
            };
            buf.set_string(size_x, y, &size, size_style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemo_core::SortCriteria;
    use std::path::Path;

    #[test]
    fn test_size_labels() {
        assert_eq!(size_label(&FileInfo::file("/a", 2048)), "2.0 KB");
        assert_eq!(size_label(&FileInfo::directory("/d")), "--");
        assert_eq!(
            size_label(&FileInfo::directory("/d").with_item_count(1)),
            "1 item"
        );
        assert_eq!(
            size_label(&FileInfo::directory("/d").with_item_count(1200)),
            "1,200 items"
        );
    }

    #[test]
    fn test_renders_rows_and_placeholder() {
        let root = Path::new("/data");
        let mut model = ListModel::new(SortCriteria::default());
        model.add_file(FileInfo::directory("/data/music"), root);
        model.add_file(FileInfo::file("/data/todo.txt", 12), root);
        model.load_subdirectory(&[0]);
        let rows = model.visible_rows();
        assert_eq!(rows.len(), 3);

        let theme = Theme::default();
        let area = Rect::new(0, 0, 60, 5);
        let mut buf = Buffer::empty(area);
        ListView::new(&model, &rows, 2, 0, &theme).render(area, &mut buf);

        let line = |y: u16| -> String {
            (0..area.width)
                .map(|x| buf[(x, y)].symbol().to_string())
                .collect::<String>()
        };
        assert!(line(0).contains("music"));
        assert!(line(0).contains("▼"));
        assert!(line(1).contains("Loading…"));
        assert!(line(2).contains("todo.txt"));
        assert!(line(2).trim_end().ends_with("12 B"));
        assert_eq!(buf[(0, 2)].bg, theme.selection_bg);
    }
}
