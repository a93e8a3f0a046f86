use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::app::{AppMode, StatusMessage};

use super::theme::Theme;

/// Footer widget showing keyboard hints and the last status message
pub struct Footer<'a> {
    mode: AppMode,
    message: Option<&'a StatusMessage>,
    theme: &'a Theme,
}

impl<'a> Footer<'a> {
    pub fn new(mode: AppMode, message: Option<&'a StatusMessage>, theme: &'a Theme) -> Self {
        Self {
            mode,
            message,
            theme,
        }
    }
}

fn hints(mode: AppMode) -> &'static [(&'static str, &'static str)] {
    match mode {
        AppMode::Browsing => &[
            ("↑↓", "Navigate"),
            ("←→", "Collapse/Expand"),
            ("d", "Delete"),
            ("y/p", "Copy"),
            ("D", "Duplicate"),
            ("s", "Sort"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        AppMode::Help => &[("Esc", "Close help"), ("q", "Close")],
        AppMode::Confirm => &[("y", "Yes"), ("n", "Cancel")],
    }
}

impl Widget for Footer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 1 {
            return;
        }

        let hints = hints(self.mode);
        let key_style = Style::default()
            .fg(self.theme.fg)
            .add_modifier(Modifier::BOLD);
        let desc_style = Style::default().fg(self.theme.fg_dim);
        let sep_style = Style::default().fg(self.theme.border);

        let mut x = area.x + 1;
        for (i, (key, desc)) in hints.iter().enumerate() {
            // Key
            buf.set_string(x, area.y, *key, key_style);
            x += key.chars().count() as u16 + 1;

            // Description
            buf.set_string(x, area.y, *desc, desc_style);
            x += desc.len() as u16;

            // Separator
            if i < hints.len() - 1 {
                buf.set_string(x, area.y, "  │  ", sep_style);
                x += 5;
            }

            if x >= area.x + area.width - 5 {
                break;
            }
        }

        // Last message on the right, if it fits
        if let Some(message) = self.message {
            let color = if message.is_error {
                self.theme.red
            } else {
                self.theme.green
            };
            let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            let width = message.text.chars().count() as u16;
            if area.x + area.width > x + width + 3 {
                let message_x = area.x + area.width - width - 1;
                buf.set_string(message_x, area.y, &message.text, style);
            }
        }
    }
}
