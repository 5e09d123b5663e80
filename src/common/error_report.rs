use crate::common::timestamp_utils;
use log::error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static ERROR_LOG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Writes a failure report, replacing any previous one.
pub fn write_error_log(path: &Path, context: &str, details: &str) {
    let report = format!(
        "[{}] {}\n\n{}\n",
        timestamp_utils::current_local_timestamp_str("%Y-%m-%d %H:%M:%S"),
        context,
        details
    );
    if let Err(e) = fs::write(path, report) {
        eprintln!("Failed to write error log '{}': {}", path.display(), e);
    }
}

/// Records where failures are reported and installs a panic hook that writes
/// the same file before the default hook runs.
pub fn install(path: PathBuf) {
    if let Ok(mut slot) = ERROR_LOG_PATH.lock() {
        *slot = Some(path);
    }
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(path) = current_path() {
            let backtrace = std::backtrace::Backtrace::force_capture();
            write_error_log(&path, "Unhandled panic", &format!("{}\n\nStack trace:\n{}", info, backtrace));
        }
        default_hook(info);
    }));
}

fn current_path() -> Option<PathBuf> {
    ERROR_LOG_PATH.lock().ok().and_then(|slot| slot.clone())
}

/// Top-level handling of a failed operation: log it with its full context
/// chain, write the error log, and tell the operator where to look.
pub fn report_failure(context: &str, err: &anyhow::Error) {
    error!("❌ {} failed: {:#}", context, err);
    match current_path() {
        Some(path) => {
            write_error_log(&path, &format!("{} failed", context), &format!("{:?}", err));
            eprintln!("An error occurred. Check {} for details.\n\n{:#}", path.display(), err);
        }
        None => eprintln!("An error occurred.\n\n{:#}", err),
    }
}
