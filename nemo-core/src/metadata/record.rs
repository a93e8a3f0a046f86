use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::list_model::SortCriteria;

/// Current metadata format version - increment when the layout changes
pub const METADATA_VERSION: u32 = 1;

/// Magic bytes identifying a view metadata file
pub const METADATA_MAGIC: [u8; 4] = *b"NMVM";

/// View settings remembered for one directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryMetadata {
    /// Format version the record was written with
    pub version: u32,
    /// Directory these settings belong to
    pub directory: PathBuf,
    pub sort: SortCriteria,
    pub show_hidden: bool,
    /// When the settings were last changed
    pub updated: SystemTime,
}

impl DirectoryMetadata {
    pub fn new(directory: impl Into<PathBuf>, sort: SortCriteria, show_hidden: bool) -> Self {
        Self {
            version: METADATA_VERSION,
            directory: directory.into(),
            sort,
            show_hidden,
            updated: SystemTime::now(),
        }
    }

    pub fn is_for(&self, directory: &Path) -> bool {
        self.directory == directory
    }
}
