use nemo_core::{SortOrder, format_count};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::app::AppState;

use super::theme::Theme;

/// Header widget showing title, path, and view settings
pub struct Header<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

/// Keep the end of `text` so it fits in `max` characters
pub fn truncate_start(text: &str, max: usize) -> String {
    let len = text.chars().count();
    if len <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = text.chars().skip(len - keep).collect();
    format!("...{}", tail)
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 10 || area.height < 1 {
            return;
        }

        // Title
        let title_style = Style::default()
            .fg(self.theme.blue)
            .add_modifier(Modifier::BOLD);
        buf.set_string(area.x + 1, area.y, "NEMO", title_style);

        // Separator
        buf.set_string(area.x + 6, area.y, "─", Style::default().fg(self.theme.border));

        // View settings (right-aligned)
        let criteria = self.state.model.sort_criteria();
        let arrow = match criteria.order {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        };
        let hidden = if self.state.config.show_hidden {
            " · hidden shown"
        } else {
            ""
        };
        let status = format!(
            "{} items · by {} {}{}",
            format_count(self.state.model.len() as u64),
            criteria.attribute,
            arrow,
            hidden
        );
        let status_width = status.chars().count() as u16;

        // Path
        let max_path_len = area.width.saturating_sub(status_width + 11) as usize;
        let path = self.state.root_path.to_string_lossy();
        buf.set_string(
            area.x + 8,
            area.y,
            truncate_start(&path, max_path_len),
            Style::default().fg(self.theme.fg),
        );

        if area.width > status_width + 2 {
            let status_x = area.x + area.width - status_width - 1;
            buf.set_string(status_x, area.y, &status, Style::default().fg(self.theme.fg_dim));
        }
    }
}
