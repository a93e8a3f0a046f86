use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use tracing::debug;

use crate::error::{NemoError, Result};
use crate::progress::ProgressInfo;

use super::scan::{SourceInfo, scan_sources};
use super::transfer::{TransferInfo, report_copy_progress};
use super::{FileOperation, OperationKind, OperationReport, checkpoint};

const CHUNK_SIZE: usize = 64 * 1024;

/// State shared by every file of one copy or duplicate run
struct CopyJob<'a> {
    info: &'a ProgressInfo,
    kind: OperationKind,
    destination_name: String,
    source_info: SourceInfo,
    transfer: TransferInfo,
}

impl CopyJob<'_> {
    fn report(&mut self, force: bool) {
        report_copy_progress(
            self.info,
            self.kind,
            &self.destination_name,
            &self.source_info,
            &mut self.transfer,
            force,
        );
    }

    fn copy_source(&mut self, source: &Path, target: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(source).map_err(|e| NemoError::at(source, e))?;
        if !metadata.is_dir() {
            return self.copy_entry(source, target, &metadata);
        }

        // Pre-order: a directory is always created before anything inside it
        let walker = WalkDir::new(source)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true);

        for entry_result in walker {
            let entry = entry_result.map_err(|e| NemoError::Walk(e.to_string()))?;
            let path = entry.path();
            let relative = path.strip_prefix(source).unwrap_or(Path::new(""));
            let destination = target.join(relative);
            let metadata = entry.metadata().map_err(|e| NemoError::Walk(e.to_string()))?;
            self.copy_entry(&path, &destination, &metadata)?;
        }
        Ok(())
    }

    fn copy_entry(&mut self, source: &Path, target: &Path, metadata: &fs::Metadata) -> Result<()> {
        checkpoint(self.info)?;

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            fs::create_dir(target).map_err(|e| NemoError::at(target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(source, target)?;
        } else {
            self.copy_file(source, target)?;
        }

        self.transfer.num_files += 1;
        self.report(false);
        Ok(())
    }

    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<()> {
        let mut input = File::open(source).map_err(|e| NemoError::at(source, e))?;
        let mut output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .map_err(|e| NemoError::at(target, e))?;

        let result = self.copy_contents(&mut input, &mut output, source, target);
        drop(output);

        match result {
            Ok(()) => {
                if let Ok(metadata) = input.metadata()
                    && let Err(e) = fs::set_permissions(target, metadata.permissions())
                {
                    debug!(path = %target.display(), error = %e, "Permissions not copied");
                }
                Ok(())
            }
            Err(e) => {
                // Don't leave a truncated file behind
                let _ = fs::remove_file(target);
                Err(e)
            }
        }
    }

    fn copy_contents(
        &mut self,
        input: &mut File,
        output: &mut File,
        source: &Path,
        target: &Path,
    ) -> Result<()> {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            checkpoint(self.info)?;
            let read = input
                .read(&mut buffer)
                .map_err(|e| NemoError::at(source, e))?;
            if read == 0 {
                break;
            }
            output
                .write_all(&buffer[..read])
                .map_err(|e| NemoError::at(target, e))?;
            self.transfer.num_bytes += read as u64;
            self.report(false);
        }
        output.sync_all().map_err(|e| NemoError::at(target, e))
    }
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(source).map_err(|e| NemoError::at(source, e))?;
    std::os::unix::fs::symlink(link, target).map_err(|e| NemoError::at(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .map(|_| ())
        .map_err(|e| NemoError::at(target, e))
}

pub(super) fn run(operation: &FileOperation, info: &ProgressInfo) -> Result<OperationReport> {
    let kind = operation.kind();
    let targets = plan_targets(operation)?;
    let destination_name = operation
        .destination()
        .and_then(|d| d.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let source_info = scan_sources(operation.sources(), kind, info)?;
    let mut job = CopyJob {
        info,
        kind,
        destination_name,
        source_info,
        transfer: TransferInfo::default(),
    };
    job.report(true);

    let mut created = Vec::with_capacity(targets.len());
    for (source, target) in operation.sources().iter().zip(targets) {
        job.copy_source(source, &target)?;
        created.push(target);
    }
    job.report(true);

    Ok(OperationReport {
        files: job.transfer.num_files,
        bytes: job.transfer.num_bytes,
        created,
    })
}

/// Top-level target of every source, checked before any data moves
fn plan_targets(operation: &FileOperation) -> Result<Vec<PathBuf>> {
    // Only copies have a destination; duplicates land next to their source
    let destination = operation.destination();
    if let Some(destination) = destination {
        let metadata = fs::metadata(destination).map_err(|e| NemoError::at(destination, e))?;
        if !metadata.is_dir() {
            return Err(NemoError::NotADirectory(destination.to_path_buf()));
        }
    }

    let mut targets: Vec<PathBuf> = Vec::with_capacity(operation.sources().len());
    for source in operation.sources() {
        let target = match destination {
            Some(destination) => {
                if destination.starts_with(source) {
                    return Err(NemoError::IntoItself(source.clone()));
                }
                let name = source
                    .file_name()
                    .ok_or_else(|| NemoError::NotADirectory(source.clone()))?;
                destination.join(name)
            }
            None => duplicate_name(source, &targets),
        };

        if fs::symlink_metadata(&target).is_ok() || targets.contains(&target) {
            return Err(NemoError::AlreadyExists(target));
        }
        targets.push(target);
    }
    Ok(targets)
}

/// Split "name (copy 3)" into ("name", 3); "name (copy)" counts as 1
fn parse_copy_suffix(stem: &str) -> (&str, u32) {
    if let Some(base) = stem.strip_suffix(" (copy)") {
        return (base, 1);
    }
    if let Some(rest) = stem.strip_suffix(')')
        && let Some((base, number)) = rest.rsplit_once(" (copy ")
        && let Ok(n) = number.parse::<u32>()
    {
        return (base, n);
    }
    (stem, 0)
}

/// First free "name (copy).ext", "name (copy 2).ext", … next to `source`.
/// `taken` holds names already claimed by the same operation.
pub(super) fn duplicate_name(source: &Path, taken: &[PathBuf]) -> PathBuf {
    let parent = source.parent().unwrap_or(Path::new(""));
    let is_dir = fs::symlink_metadata(source).is_ok_and(|m| m.is_dir());

    let (stem, extension) = match (is_dir, source.file_stem(), source.extension()) {
        (false, Some(stem), Some(ext)) => (
            stem.to_string_lossy().to_string(),
            Some(ext.to_string_lossy().to_string()),
        ),
        _ => (
            source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            None,
        ),
    };
    let (base, existing) = parse_copy_suffix(&stem);

    let mut n = existing + 1;
    loop {
        let tag = if n == 1 {
            "(copy)".to_string()
        } else {
            format!("(copy {n})")
        };
        let name = match &extension {
            Some(ext) => format!("{base} {tag}.{ext}"),
            None => format!("{base} {tag}"),
        };
        let candidate = parent.join(name);
        if fs::symlink_metadata(&candidate).is_err() && !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
