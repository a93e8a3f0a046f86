use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NemoError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Destination already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Cannot copy a folder into itself: {0}")]
    IntoItself(PathBuf),

    #[error("Error while accessing {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Operation was cancelled")]
    Cancelled,
}

impl NemoError {
    /// Attach a path to an I/O error, mapping the common kinds to dedicated variants
    pub fn at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => NemoError::PathNotFound(path),
            io::ErrorKind::PermissionDenied => NemoError::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => NemoError::AlreadyExists(path),
            _ => NemoError::File { path, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, NemoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_maps_error_kinds() {
        let err = NemoError::at("/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, NemoError::PathNotFound(p) if p == PathBuf::from("/x")));

        let err = NemoError::at("/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, NemoError::PermissionDenied(_)));

        let err = NemoError::at("/x", io::Error::other("boom"));
        assert!(matches!(err, NemoError::File { .. }));
    }
}
