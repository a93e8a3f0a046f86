use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::file::FileInfo;

/// File attribute a directory level is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortAttribute {
    #[default]
    Name,
    Size,
    Type,
    Modified,
}

impl SortAttribute {
    pub const ALL: [SortAttribute; 4] = [
        SortAttribute::Name,
        SortAttribute::Size,
        SortAttribute::Type,
        SortAttribute::Modified,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortAttribute::Name => "name",
            SortAttribute::Size => "size",
            SortAttribute::Type => "type",
            SortAttribute::Modified => "modified",
        }
    }

    /// Next attribute in display order, wrapping around
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|a| *a == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortAttribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sort attribute: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// The model's comparator.
///
/// Placeholder rows come first. With `directories_first`, directories come
/// before everything else regardless of `order`. Ties on the attribute fall
/// back to the full path, so no two distinct files ever compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortCriteria {
    pub attribute: SortAttribute,
    pub order: SortOrder,
    pub directories_first: bool,
}

impl Default for SortCriteria {
    fn default() -> Self {
        Self {
            attribute: SortAttribute::Name,
            order: SortOrder::Ascending,
            directories_first: true,
        }
    }
}

impl SortCriteria {
    /// Compare two rows, `None` being the placeholder
    pub fn compare(&self, a: Option<&FileInfo>, b: Option<&FileInfo>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self.compare_files(a, b),
        }
    }

    pub fn compare_files(&self, a: &FileInfo, b: &FileInfo) -> Ordering {
        if self.directories_first {
            let ordering = b.is_directory().cmp(&a.is_directory());
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        let ordering = match self.attribute {
            SortAttribute::Name => compare_by_name(a, b),
            SortAttribute::Size => compare_by_size(a, b),
            SortAttribute::Type => compare_by_type(a, b),
            SortAttribute::Modified => a.modified.cmp(&b.modified),
        };

        self.order
            .apply(ordering.then_with(|| a.path.cmp(&b.path)))
    }
}

/// Names starting with '.' or '#' go after everything else
fn sorts_last(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('#')
}

fn compare_by_name(a: &FileInfo, b: &FileInfo) -> Ordering {
    sorts_last(&a.name)
        .cmp(&sorts_last(&b.name))
        .then_with(|| {
            alphanumeric_sort::compare_str(a.name.to_lowercase(), b.name.to_lowercase())
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Directories before files. Directories by item count, unknown counts
/// first; files by size.
fn compare_by_size(a: &FileInfo, b: &FileInfo) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| {
            if a.is_directory() {
                a.item_count.cmp(&b.item_count)
            } else {
                a.size.cmp(&b.size)
            }
        })
}

fn compare_by_type(a: &FileInfo, b: &FileInfo) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.extension().cmp(&b.extension()))
        .then_with(|| compare_by_name(a, b))
}
