mod action;
mod operations;
mod state;

pub use action::Action;
pub use state::{AppMode, AppState, PendingOperation, StatusMessage};
