//! Logging utilities
//!
//! This module initialises the `env_logger` backend for the `log` facade.

use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Initialise the logging system
///
/// # Parameters
///
/// * `level` - Default log level, overridden by `RUST_LOG`
/// * `log_file` - Optional file to append records to. Falls back to stderr
///   when the file cannot be opened.
pub fn init_logger(level: &str, log_file: Option<&Path>) {
    let env = Env::default().filter_or("RUST_LOG", level);
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_secs();

    let mut open_error = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => open_error = Some(e),
        }
    }

    // A second initialisation (tests, embedding) keeps the first logger.
    if builder.try_init().is_err() {
        return;
    }

    if let (Some(path), Some(e)) = (log_file, open_error) {
        log::warn!("Cannot open log file {}, logging to stderr: {}", path.display(), e);
    }
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
