//! File operations that report through a [`ProgressInfo`].
//!
//! Each run walks its sources first (pulsing "Preparing" progress), then
//! does the work with rate-limited status, details and progress updates.
//! Workers check for pause and cancellation between files and between
//! copy chunks. `finish()` is called exactly once, whatever the outcome.

mod copy;
mod delete;
mod scan;
mod transfer;

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use tracing::{info, warn};

use crate::error::{NemoError, Result};
use crate::progress::ProgressInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Delete,
    Copy,
    Duplicate,
}

impl OperationKind {
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Delete => "delete",
            OperationKind::Copy => "copy",
            OperationKind::Duplicate => "duplicate",
        }
    }
}

/// Outcome of a completed operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationReport {
    /// Files and directories processed
    pub files: u64,
    pub bytes: u64,
    /// Top-level paths created (copies and duplicates)
    pub created: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FileOperation {
    kind: OperationKind,
    sources: Vec<PathBuf>,
    destination: Option<PathBuf>,
}

impl FileOperation {
    pub fn delete(sources: Vec<PathBuf>) -> Self {
        Self {
            kind: OperationKind::Delete,
            sources,
            destination: None,
        }
    }

    /// Copy every source into the `destination` directory
    pub fn copy(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: OperationKind::Copy,
            sources,
            destination: Some(destination.into()),
        }
    }

    /// Copy every source next to itself under a "(copy)" name
    pub fn duplicate(sources: Vec<PathBuf>) -> Self {
        Self {
            kind: OperationKind::Duplicate,
            sources,
            destination: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Run on the calling thread
    pub fn run(&self, progress: &ProgressInfo) -> Result<OperationReport> {
        let _finish = FinishOnDrop(progress);
        progress.start();
        info!(
            operation = self.kind.verb(),
            sources = self.sources.len(),
            info = %progress.id(),
            "Operation started"
        );

        let result = match self.kind {
            OperationKind::Delete => delete::run(self, progress),
            OperationKind::Copy | OperationKind::Duplicate => copy::run(self, progress),
        };

        match &result {
            Ok(report) => info!(
                operation = self.kind.verb(),
                files = report.files,
                bytes = report.bytes,
                "Operation completed"
            ),
            Err(NemoError::Cancelled) => info!(operation = self.kind.verb(), "Operation cancelled"),
            Err(e) => warn!(operation = self.kind.verb(), error = %e, "Operation failed"),
        }
        result
    }

    /// Run on a new worker thread
    pub fn spawn(self, progress: ProgressInfo) -> JoinHandle<Result<OperationReport>> {
        std::thread::spawn(move || self.run(&progress))
    }
}

/// Finishes the record on every exit path, panics included
struct FinishOnDrop<'a>(&'a ProgressInfo);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Block while paused, then bail out if cancelled
fn checkpoint(progress: &ProgressInfo) -> Result<()> {
    progress.wait_while_paused();
    if progress.is_cancelled() {
        return Err(NemoError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use crate::progress::{Progress, ProgressEvent, ProgressInfoManager};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn flush(event_loop: &mut EventLoop) {
        while event_loop.pending() > 0 {
            event_loop.iterate(Duration::from_secs(2));
        }
    }

    fn record(info: &ProgressInfo) -> Arc<Mutex<Vec<ProgressEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        info.connect(move |_, event| sink.lock().unwrap().push(event));
        events
    }

    fn sample_tree(root: &Path) -> PathBuf {
        let tree = root.join("project");
        fs::create_dir_all(tree.join("src/nested")).unwrap();
        fs::write(tree.join("README"), "read me").unwrap();
        fs::write(tree.join("src/main.rs"), [1u8; 3000]).unwrap();
        fs::write(tree.join("src/nested/deep.txt"), [2u8; 200_000]).unwrap();
        tree
    }

    #[test]
    fn test_delete_removes_tree_and_finishes_once() {
        let dir = tempfile::tempdir().unwrap();
        let tree = sample_tree(dir.path());
        let loose = dir.path().join("loose.txt");
        fs::write(&loose, "x").unwrap();

        let mut event_loop = EventLoop::new();
        let manager = ProgressInfoManager::new(event_loop.handle());
        let info = manager.new_info();
        let events = record(&info);

        let report = FileOperation::delete(vec![tree.clone(), loose.clone()])
            .run(&info)
            .unwrap();

        assert!(!tree.exists());
        assert!(!loose.exists());
        // project, src, nested, README, main.rs, deep.txt, loose.txt
        assert_eq!(report.files, 7);
        assert_eq!(report.bytes, 7 + 3000 + 200_000 + 1);
        assert!(info.is_finished());
        assert_eq!(info.status(), "Deleting files");
        assert_eq!(info.details(), "0 files left to delete");
        assert_eq!(info.progress(), Progress::Fraction(1.0));

        flush(&mut event_loop);
        let events = events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == ProgressEvent::Started).count(), 1);
        assert_eq!(events.iter().filter(|e| **e == ProgressEvent::Finished).count(), 1);
        assert_eq!(events.last(), Some(&ProgressEvent::Finished));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_copy_tree_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tree = sample_tree(dir.path());
        let backup = dir.path().join("backup");
        fs::create_dir(&backup).unwrap();

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        let report = FileOperation::copy(vec![tree.clone()], &backup)
            .run(&info)
            .unwrap();

        let copied = backup.join("project");
        assert_eq!(report.created, vec![copied.clone()]);
        assert_eq!(report.files, 6);
        assert_eq!(report.bytes, 7 + 3000 + 200_000);
        assert_eq!(
            fs::read(copied.join("src/nested/deep.txt")).unwrap(),
            vec![2u8; 200_000]
        );
        assert_eq!(fs::read_to_string(copied.join("README")).unwrap(), "read me");
        assert!(tree.join("README").exists());

        assert_eq!(info.status(), "Copying file 6 of 6 to \"backup\"");
        assert_eq!(info.initial_details(), "Preparing to copy 6 files (198.2 KB)");
        assert_eq!(info.progress(), Progress::Fraction(1.0));
        assert!(info.is_finished());
    }

    #[test]
    fn test_copy_refuses_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "new").unwrap();
        let destination = dir.path().join("dest");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("a.txt"), "old").unwrap();

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        let result = FileOperation::copy(vec![file], &destination).run(&info);

        assert!(matches!(result, Err(NemoError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(destination.join("a.txt")).unwrap(), "old");
        assert!(info.is_finished());
    }

    #[test]
    fn test_copy_into_itself_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tree = sample_tree(dir.path());

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        let result = FileOperation::copy(vec![tree.clone()], tree.join("src")).run(&info);
        assert!(matches!(result, Err(NemoError::IntoItself(_))));
    }

    #[test]
    fn test_duplicate_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.jpg");
        fs::write(&file, [9u8; 10]).unwrap();
        let tree = sample_tree(dir.path());

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        let report = FileOperation::duplicate(vec![file.clone(), tree.clone()])
            .run(&info)
            .unwrap();

        assert_eq!(
            report.created,
            vec![
                dir.path().join("photo (copy).jpg"),
                dir.path().join("project (copy)"),
            ]
        );
        assert!(dir.path().join("project (copy)/src/main.rs").exists());
        assert_eq!(info.status(), "Duplicating file 7 of 7");

        // Second run picks the next free name
        let info = ProgressInfo::new(event_loop.handle());
        let report = FileOperation::duplicate(vec![file]).run(&info).unwrap();
        assert_eq!(report.created, vec![dir.path().join("photo (copy 2).jpg")]);
    }

    #[test]
    fn test_cancelled_operation_still_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let tree = sample_tree(dir.path());

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        info.cancel();

        let result = FileOperation::delete(vec![tree.clone()]).run(&info);
        assert!(matches!(result, Err(NemoError::Cancelled)));
        assert!(tree.join("src/main.rs").exists());
        assert!(info.is_finished());
    }

    #[test]
    fn test_spawned_operation_reports_on_loop_thread() {
        let dir = tempfile::tempdir().unwrap();
        let tree = sample_tree(dir.path());

        let mut event_loop = EventLoop::new();
        let manager = ProgressInfoManager::new(event_loop.handle());
        let info = manager.new_info();
        let threads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&threads);
        info.connect(move |_, _| sink.lock().unwrap().push(std::thread::current().id()));

        let handle = FileOperation::duplicate(vec![tree]).spawn(info.clone());
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.files, 6);

        flush(&mut event_loop);
        assert!(manager.is_empty());
        let threads = threads.lock().unwrap();
        assert!(!threads.is_empty());
        assert!(threads.iter().all(|t| *t == std::thread::current().id()));
    }

    #[test]
    fn test_paused_worker_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.bin");
        fs::write(&file, [0u8; 1024]).unwrap();

        let event_loop = EventLoop::new();
        let info = ProgressInfo::new(event_loop.handle());
        info.pause();

        let handle = FileOperation::duplicate(vec![file]).spawn(info.clone());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!info.is_finished());

        info.resume();
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.bytes, 1024);
        assert!(info.is_finished());
    }
}
