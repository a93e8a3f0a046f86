mod bar_chart;
mod confirm;
mod footer;
mod header;
mod help;
mod layout;
mod list_view;
mod operations_view;
mod theme;

pub use confirm::ConfirmView;
pub use footer::Footer;
pub use header::Header;
pub use help::HelpView;
pub use layout::AppLayout;
pub use list_view::ListView;
pub use operations_view::OperationsView;
pub use theme::Theme;
