use chrono::NaiveDate;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// `{folder}/payslip_YYYYMMDD.log`
pub fn log_file_path(folder: &Path, date: NaiveDate) -> PathBuf {
    folder.join(format!("payslip_{}.log", date.format("%Y%m%d")))
}

fn open_log_file(folder: &Path, date: NaiveDate) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(folder)?;
    let path = log_file_path(folder, date);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing: console output plus a daily log file in `log_folder`.
///
/// Falls back to console-only logging if the log file cannot be opened.
/// Returns the log file path when file logging is active.
pub fn init_tracing(log_folder: &Path) -> Option<PathBuf> {
    let today = chrono::Local::now().date_naive();
    let console = fmt::layer().compact();

    match open_log_file(log_folder, today) {
        Ok((path, file)) => {
            let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(env_filter())
                .with(console)
                .with(file_layer)
                .init();
            Some(path)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(console)
                .init();
            tracing::warn!(
                folder = %log_folder.display(),
                error = %e,
                "Could not open log file, logging to console only"
            );
            None
        }
    }
}
