use nemo_core::{Progress, ProgressInfo, format_duration};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Padding, Widget},
};

use super::bar_chart::{render_bar, render_pulse};
use super::header::truncate_start;
use super::layout::OPERATION_HEIGHT;
use super::theme::Theme;

/// Braille spinner characters
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Live status of every running file operation, newest first
pub struct OperationsView<'a> {
    infos: &'a [ProgressInfo],
    spinner_frame: usize,
    theme: &'a Theme,
}

impl<'a> OperationsView<'a> {
    pub fn new(infos: &'a [ProgressInfo], spinner_frame: usize, theme: &'a Theme) -> Self {
        Self {
            infos,
            spinner_frame,
            theme,
        }
    }
}

/// Trailing label of the bar line
fn bar_label(info: &ProgressInfo) -> String {
    if info.is_cancelled() {
        return "cancelling".to_string();
    }
    if info.is_paused() {
        return "paused".to_string();
    }
    match info.progress() {
        Progress::Indeterminate => String::new(),
        Progress::Fraction(f) => match info.estimated_remaining() {
            Some(left) => format!("{:>3.0}% · {} left", f * 100.0, format_duration(left)),
            None => format!("{:>3.0}%", f * 100.0),
        },
    }
}

impl Widget for OperationsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.infos.is_empty() || area.height < 3 {
            return;
        }

        let block = Block::default()
            .title(" Operations ")
            .borders(Borders::TOP)
            .border_style(Style::default().fg(self.theme.border))
            .padding(Padding::horizontal(1));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 20 {
            return;
        }

        let status_style = Style::default()
            .fg(self.theme.fg)
            .add_modifier(Modifier::BOLD);
        let details_style = Style::default().fg(self.theme.fg_dim);
        let label_style = Style::default().fg(self.theme.fg_muted);
        let spinner_style = Style::default().fg(self.theme.blue);

        for (i, info) in self.infos.iter().enumerate() {
            let y = inner.y + i as u16 * OPERATION_HEIGHT;
            if y + 2 >= inner.y + inner.height {
                break;
            }
            let width = inner.width as usize;

            // Status line with spinner
            let spinner = if info.is_paused() {
                '‖'
            } else {
                SPINNER[self.spinner_frame % SPINNER.len()]
            };
            buf.set_string(inner.x, y, spinner.to_string(), spinner_style);
            buf.set_string(
                inner.x + 2,
                y,
                truncate_start(&info.status(), width.saturating_sub(2)),
                status_style,
            );

            // Bar line
            let label = bar_label(info);
            let bar_width = width.saturating_sub(label.chars().count() + 1);
            let (bar, color) = match info.progress() {
                Progress::Indeterminate => (
                    render_pulse(self.spinner_frame, bar_width),
                    self.theme.blue,
                ),
                Progress::Fraction(f) => (render_bar(f, bar_width), self.theme.progress_color(f)),
            };
            let bar_color = if info.is_paused() {
                self.theme.fg_muted
            } else {
                color
            };
            buf.set_string(
                inner.x,
                y + 1,
                &bar,
                Style::default().fg(bar_color).bg(self.theme.bg_surface),
            );
            buf.set_string(inner.x + bar_width as u16 + 1, y + 1, &label, label_style);

            // Details line
            buf.set_string(
                inner.x,
                y + 2,
                truncate_start(&info.details(), width),
                details_style,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemo_core::EventLoop;

    #[test]
    fn test_bar_label() {
        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        assert_eq!(bar_label(&info), "  0%");
        info.pulse_progress();
        assert_eq!(bar_label(&info), "");

        info.set_progress(1.0, 4.0);
        assert_eq!(bar_label(&info), " 25%");

        info.pause();
        assert_eq!(bar_label(&info), "paused");
        info.cancel();
        assert_eq!(bar_label(&info), "cancelling");
    }

    #[test]
    fn test_renders_status_and_details() {
        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        info.set_status("Deleting files");
        info.set_details("3 files left to delete");
        info.set_progress(1.0, 2.0);

        let theme = Theme::default();
        let area = Rect::new(0, 0, 50, 5);
        let mut buf = Buffer::empty(area);
        let infos = [info];
        OperationsView::new(&infos, 0, &theme).render(area, &mut buf);

        let line = |y: u16| -> String {
            (0..area.width)
                .map(|x| buf[(x, y)].symbol().to_string())
                .collect::<String>()
        };
        assert!(line(0).contains("Operations"));
        assert!(line(1).contains("Deleting files"));
        assert!(line(2).contains(" 50%"));
        assert!(line(3).contains("3 files left to delete"));
    }
}
