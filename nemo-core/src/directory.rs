use std::path::Path;

use jwalk::WalkDir;
use tracing::debug;

use crate::error::{NemoError, Result};
use crate::file::FileInfo;

/// Directory listing configuration
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Include dot files and backup files
    pub show_hidden: bool,
    /// Report symlinks as what they point to
    pub follow_symlinks: bool,
    /// Count the entries of each subdirectory (used by size sorting)
    pub count_items: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            follow_symlinks: false,
            count_items: true,
        }
    }
}

/// List one level of `path`.
///
/// Entries that vanish or can't be stat'ed while listing are skipped.
pub fn read_directory(path: &Path, config: &DirectoryConfig) -> Result<Vec<FileInfo>> {
    let metadata = std::fs::metadata(path).map_err(|e| NemoError::at(path, e))?;
    if !metadata.is_dir() {
        return Err(NemoError::NotADirectory(path.to_path_buf()));
    }
    // Surface permission problems on the directory itself instead of an empty listing
    std::fs::read_dir(path).map_err(|e| NemoError::at(path, e))?;

    let walker = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .skip_hidden(false)
        .follow_links(config.follow_symlinks)
        .sort(false);

    let mut files = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let entry_path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %entry_path.display(), error = %e, "Skipping entry without metadata");
                continue;
            }
        };

        let mut file = FileInfo::from_metadata(entry_path, &metadata);
        if !config.show_hidden && file.is_hidden() {
            continue;
        }
        if config.count_items && file.is_directory() {
            file.item_count = count_items(&file.path);
        }
        files.push(file);
    }

    debug!(directory = %path.display(), entries = files.len(), "Directory read");
    Ok(files)
}

fn count_items(path: &Path) -> Option<u64> {
    std::fs::read_dir(path)
        .ok()
        .map(|entries| entries.count() as u64)
}
