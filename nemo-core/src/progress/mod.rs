mod cancel;
mod info;
mod manager;

pub use cancel::CancellationToken;
pub use info::{InfoId, Progress, ProgressEvent, ProgressInfo, SIGNAL_DELAY};
pub use manager::ProgressInfoManager;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle returned by `connect` calls, used to disconnect a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callbacks never poison state for other threads
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
