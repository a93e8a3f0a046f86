use std::fs;
use std::path::Path;

use jwalk::WalkDir;

use crate::error::{NemoError, Result};
use crate::progress::ProgressInfo;

use super::scan::{SourceInfo, scan_sources};
use super::transfer::{TransferInfo, report_delete_progress};
use super::{FileOperation, OperationKind, OperationReport, checkpoint};

pub(super) fn run(operation: &FileOperation, info: &ProgressInfo) -> Result<OperationReport> {
    let source_info = scan_sources(operation.sources(), OperationKind::Delete, info)?;
    let mut transfer = TransferInfo::default();
    report_delete_progress(info, &source_info, &mut transfer, true);

    for source in operation.sources() {
        delete_source(source, info, &source_info, &mut transfer)?;
    }
    report_delete_progress(info, &source_info, &mut transfer, true);

    Ok(OperationReport {
        files: transfer.num_files,
        bytes: transfer.num_bytes,
        created: Vec::new(),
    })
}

fn delete_source(
    source: &Path,
    info: &ProgressInfo,
    source_info: &SourceInfo,
    transfer: &mut TransferInfo,
) -> Result<()> {
    let metadata = fs::symlink_metadata(source).map_err(|e| NemoError::at(source, e))?;
    if !metadata.is_dir() {
        checkpoint(info)?;
        fs::remove_file(source).map_err(|e| NemoError::at(source, e))?;
        transfer.num_files += 1;
        transfer.num_bytes += metadata.len();
        report_delete_progress(info, source_info, transfer, false);
        return Ok(());
    }

    // Pre-order walk, reversed: every child is removed before its parent
    let entries = WalkDir::new(source)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .into_iter()
        .map(|entry| entry.map_err(|e| NemoError::Walk(e.to_string())))
        .collect::<Result<Vec<_>>>()?;

    for entry in entries.into_iter().rev() {
        checkpoint(info)?;
        let path = entry.path();
        if entry.file_type().is_dir() {
            fs::remove_dir(&path).map_err(|e| NemoError::at(&path, e))?;
        } else {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path).map_err(|e| NemoError::at(&path, e))?;
            transfer.num_bytes += size;
        }
        transfer.num_files += 1;
        report_delete_progress(info, source_info, transfer, false);
    }
    Ok(())
}
