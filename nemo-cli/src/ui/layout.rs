use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Rows each operation takes in the operations panel
pub const OPERATION_HEIGHT: u16 = 3;

/// Main application layout
pub struct AppLayout {
    pub header: Rect,
    pub list: Rect,
    pub operations: Rect,
    pub footer: Rect,
}

impl AppLayout {
    /// `operations` is the number of records to make room for
    pub fn new(area: Rect, operations: usize) -> Self {
        // Borders plus a block per operation, never more than half the screen
        let panel = if operations == 0 {
            0
        } else {
            (operations as u16 * OPERATION_HEIGHT + 2).min(area.height / 2)
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),     // Header
                Constraint::Min(3),        // File list
                Constraint::Length(panel), // Operations
                Constraint::Length(1),     // Footer
            ])
            .split(area);

        Self {
            header: chunks[0],
            list: chunks[1],
            operations: chunks[2],
            footer: chunks[3],
        }
    }
}

/// Centered rectangle of at most `width` x `height` for dialogs
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
