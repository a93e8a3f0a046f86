use std::time::{Duration, Instant};

use crate::format::{format_duration, format_size, plural};
use crate::progress::ProgressInfo;

use super::OperationKind;
use super::scan::SourceInfo;

/// Minimum spacing between two progress reports from a worker
pub(super) const REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Below this, the observed rate is too noisy to extrapolate a remaining time
const RELIABLE_RATE_AFTER: Duration = Duration::from_secs(15);

#[derive(Debug, Default)]
pub(super) struct RateLimit {
    last: Option<Instant>,
}

impl RateLimit {
    /// True at most once per `REPORT_INTERVAL`
    pub(super) fn ready(&mut self) -> bool {
        let now = Instant::now();
        if self
            .last
            .is_some_and(|last| now.duration_since(last) < REPORT_INTERVAL)
        {
            return false;
        }
        self.last = Some(now);
        true
    }
}

/// Work done so far
#[derive(Debug, Default)]
pub(super) struct TransferInfo {
    pub num_files: u64,
    pub num_bytes: u64,
    limit: RateLimit,
}

impl TransferInfo {
    fn should_report(&mut self, force: bool) -> bool {
        let ready = self.limit.ready();
        force || ready
    }
}

pub(super) fn report_delete_progress(
    info: &ProgressInfo,
    source: &SourceInfo,
    transfer: &mut TransferInfo,
    force: bool,
) {
    if !transfer.should_report(force) {
        return;
    }

    let files_left = source.num_files.saturating_sub(transfer.num_files);
    let files_left_s = format!("{} left to delete", plural(files_left, "file"));
    info.set_status("Deleting files");

    let elapsed = info.elapsed();
    if elapsed < RELIABLE_RATE_AFTER || transfer.num_files == 0 {
        info.set_details(files_left_s);
    } else {
        let rate = transfer.num_files as f64 / elapsed.as_secs_f64();
        let remaining = Duration::from_secs_f64(files_left as f64 / rate);
        info.set_details(format!(
            "{} \u{2014} {} left",
            files_left_s,
            format_duration(remaining)
        ));
    }

    if source.num_files != 0 {
        info.set_progress(transfer.num_files as f64, source.num_files as f64);
    }
}

pub(super) fn report_copy_progress(
    info: &ProgressInfo,
    kind: OperationKind,
    destination: &str,
    source: &SourceInfo,
    transfer: &mut TransferInfo,
    force: bool,
) {
    if !transfer.should_report(force) {
        return;
    }

    let current = (transfer.num_files + 1).min(source.num_files.max(1));
    let total = source.num_files.max(1);
    let status = match kind {
        OperationKind::Duplicate => format!("Duplicating file {current} of {total}"),
        _ => format!("Copying file {current} of {total} to \"{destination}\""),
    };
    info.set_status(status);

    let total_size = source.num_bytes;
    let elapsed = info.elapsed();
    let rate = if elapsed.is_zero() {
        0.0
    } else {
        transfer.num_bytes as f64 / elapsed.as_secs_f64()
    };

    if elapsed < RELIABLE_RATE_AFTER || rate <= 0.0 {
        info.set_details(format!(
            "{} of {}",
            format_size(transfer.num_bytes),
            format_size(total_size)
        ));
    } else {
        let remaining =
            Duration::from_secs_f64(total_size.saturating_sub(transfer.num_bytes) as f64 / rate);
        info.set_details(format!(
            "{} of {} \u{2014} {} left ({}/sec)",
            format_size(transfer.num_bytes),
            format_size(total_size),
            format_duration(remaining),
            format_size(rate as u64)
        ));
    }

    info.set_progress(transfer.num_bytes as f64, total_size as f64);
}
