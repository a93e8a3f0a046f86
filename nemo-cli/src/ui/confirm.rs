use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::PendingOperation;

use super::header::truncate_start;
use super::layout::centered_rect;
use super::theme::Theme;

/// Confirmation dialog for a pending delete or copy
pub struct ConfirmView<'a> {
    pending: &'a PendingOperation,
    theme: &'a Theme,
}

impl<'a> ConfirmView<'a> {
    pub fn new(pending: &'a PendingOperation, theme: &'a Theme) -> Self {
        Self { pending, theme }
    }
}

impl Widget for ConfirmView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = centered_rect(60, 10, area);

        // Clear the area
        Clear.render(dialog_area, buf);

        let (accent, yes) = match self.pending {
            PendingOperation::Delete(_) => (self.theme.red, "Yes, delete"),
            PendingOperation::Copy { .. } => (self.theme.green, "Yes, copy"),
        };

        // Draw border
        let block = Block::default()
            .title(self.pending.title())
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(self.theme.bg_surface))
            .padding(Padding::uniform(1));

        let inner = block.inner(dialog_area);
        block.render(dialog_area, buf);
        if inner.height < 2 {
            return;
        }

        let text_style = Style::default().fg(self.theme.fg);
        let path_style = Style::default()
            .fg(self.theme.yellow)
            .add_modifier(Modifier::BOLD);
        let key_style = Style::default()
            .fg(self.theme.green)
            .add_modifier(Modifier::BOLD);
        let max_path_len = (inner.width as usize).saturating_sub(2);

        let lines: Vec<(&str, String)> = match self.pending {
            PendingOperation::Delete(path) => vec![(
                "Delete permanently:",
                truncate_start(&path.to_string_lossy(), max_path_len),
            )],
            PendingOperation::Copy {
                source,
                destination,
            } => vec![
                ("Copy:", truncate_start(&source.to_string_lossy(), max_path_len)),
                ("Into:", truncate_start(&destination.to_string_lossy(), max_path_len)),
            ],
        };

        let mut y = inner.y;
        for (label, path) in lines {
            if y + 1 >= inner.y + inner.height {
                break;
            }
            buf.set_string(inner.x, y, label, text_style);
            buf.set_string(inner.x, y + 1, &path, path_style);
            y += 2;
        }

        // Action hints
        let hints_y = inner.y + inner.height.saturating_sub(1);
        let no_x = inner.x + 5 + yes.len() as u16 + 2;
        buf.set_string(inner.x, hints_y, "[y]", key_style);
        buf.set_string(inner.x + 4, hints_y, yes, text_style);
        buf.set_string(no_x, hints_y, "[n]", key_style);
        buf.set_string(no_x + 4, hints_y, "Cancel", text_style);
    }
}
