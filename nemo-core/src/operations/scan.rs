use std::path::PathBuf;

use jwalk::WalkDir;
use tracing::debug;

use crate::error::{NemoError, Result};
use crate::format::{format_size, plural};
use crate::progress::ProgressInfo;

use super::OperationKind;
use super::transfer::RateLimit;

/// Totals of the work an operation is about to do.
/// Directories count as files, like the entries a user sees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct SourceInfo {
    pub num_files: u64,
    pub num_bytes: u64,
}

impl SourceInfo {
    fn add(&mut self, metadata: &std::fs::Metadata) {
        self.num_files += 1;
        if !metadata.is_dir() {
            self.num_bytes += metadata.len();
        }
    }
}

/// Walk every source, counting files and bytes, with a pulsing "Preparing" report
pub(super) fn scan_sources(
    sources: &[PathBuf],
    kind: OperationKind,
    info: &ProgressInfo,
) -> Result<SourceInfo> {
    let mut source_info = SourceInfo::default();
    let mut limit = RateLimit::default();

    for source in sources {
        super::checkpoint(info)?;
        let metadata = std::fs::symlink_metadata(source).map_err(|e| NemoError::at(source, e))?;

        if !metadata.is_dir() {
            source_info.add(&metadata);
            report_count_progress(info, kind, &source_info, &mut limit);
            continue;
        }

        let walker = WalkDir::new(source)
            .skip_hidden(false)
            .follow_links(false)
            .sort(false);

        for entry_result in walker {
            super::checkpoint(info)?;
            let entry = entry_result.map_err(|e| NemoError::Walk(e.to_string()))?;
            match entry.metadata() {
                Ok(metadata) => source_info.add(&metadata),
                Err(e) => debug!(path = %entry.path().display(), error = %e, "Not counted"),
            }
            report_count_progress(info, kind, &source_info, &mut limit);
        }
    }

    let details = preparing_text(kind, &source_info);
    info.set_initial_details(details.clone());
    info.set_details(details);
    Ok(source_info)
}

fn report_count_progress(
    info: &ProgressInfo,
    kind: OperationKind,
    source_info: &SourceInfo,
    limit: &mut RateLimit,
) {
    if !limit.ready() {
        return;
    }
    info.set_details(preparing_text(kind, source_info));
    info.pulse_progress();
}

fn preparing_text(kind: OperationKind, source_info: &SourceInfo) -> String {
    format!(
        "Preparing to {} {} ({})",
        kind.verb(),
        plural(source_info.num_files, "file"),
        format_size(source_info.num_bytes)
    )
}
