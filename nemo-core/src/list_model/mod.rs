//! Sorted tree projection of directory contents for a list/tree view.

mod entry;
mod model;
mod sort;

pub use entry::{EntryId, FileEntry};
pub use model::{ListModel, ModelEvent, Placeholder, TreePath, VisibleRow};
pub use sort::{SortAttribute, SortCriteria, SortOrder};
