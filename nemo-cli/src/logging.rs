use std::fs::{self, File};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directory holding the log file
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("nemo"))
        .unwrap_or_else(|| std::env::temp_dir().join("nemo"))
}

/// Send tracing output to a file so nothing is written to the terminal while
/// the UI owns it. Verbosity comes from `RUST_LOG` (default `info`).
///
/// The returned guard flushes the writer when dropped. `None` means the log
/// file could not be created and logging is off.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir();
    fs::create_dir_all(&dir).ok()?;
    let file = File::create(dir.join("nemo.log")).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter)
        .init();

    Some(guard)
}
