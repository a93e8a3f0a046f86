use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{NemoError, Result};

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Directory,
    File,
    Symlink,
    Other,
}

impl FileKind {
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Directory => "📁",
            FileKind::File => "📄",
            FileKind::Symlink => "🔗",
            FileKind::Other => "•",
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileKind::Directory)
    }

    fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        }
    }
}

/// Snapshot of one file as the list model sees it.
///
/// The path is the identity key: two infos with the same path describe the
/// same file, possibly at different points in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub kind: FileKind,
    /// Apparent size in bytes (0 for directories)
    pub size: u64,
    /// Number of entries, for directories that were counted
    pub item_count: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self {
            path,
            name,
            kind,
            size: 0,
            item_count: None,
            modified: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>, size: u64) -> Self {
        Self::new(path, FileKind::File).with_size(size)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileKind::Directory)
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_item_count(mut self, count: u64) -> Self {
        self.item_count = Some(count);
        self
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Build from metadata obtained without following symlinks
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let kind = FileKind::from_file_type(metadata.file_type());
        let mut info = Self::new(path, kind);
        if !kind.is_directory() {
            info.size = metadata.len();
        }
        info.modified = metadata.modified().ok();
        info
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::symlink_metadata(path).map_err(|e| NemoError::at(path, e))?;
        Ok(Self::from_metadata(path, &metadata))
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Lowercased extension, if the name has one that isn't just a leading dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.') || self.name.ends_with('~')
    }

    /// Directory containing this file
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
