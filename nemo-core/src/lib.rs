pub mod directory;
pub mod error;
pub mod event_loop;
pub mod file;
pub mod format;
pub mod list_model;
pub mod metadata;
pub mod operations;
pub mod progress;

pub use directory::{DirectoryConfig, read_directory};
pub use error::{NemoError, Result};
pub use event_loop::{EventLoop, LoopHandle, SourceId};
pub use file::{FileInfo, FileKind};
pub use format::{format_count, format_duration, format_size};
pub use list_model::{
    EntryId, FileEntry, ListModel, ModelEvent, Placeholder, SortAttribute, SortCriteria,
    SortOrder, TreePath, VisibleRow,
};
pub use metadata::{
    DirectoryMetadata, METADATA_MAGIC, METADATA_VERSION, load_metadata, metadata_path_for,
    save_metadata,
};
pub use operations::{FileOperation, OperationKind, OperationReport};
pub use progress::{
    CancellationToken, InfoId, ListenerId, Progress, ProgressEvent, ProgressInfo,
    ProgressInfoManager,
};
