//! Tracing subscriber setup
//!
//! Text or JSON output to stderr, or to a daily-rolling file through a
//! non-blocking writer.

use crate::config::{LogFormat, LoggingConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber described by `config`
///
/// Returns the writer guard when logging to a file; keep it alive for the
/// lifetime of the process so buffered records are flushed. Falls back to
/// stderr if the log directory cannot be created.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> crate::Result<Option<WorkerGuard>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_target = config.file.as_deref().and_then(|path| {
        let Some((directory, file_name)) = split_log_path(path) else {
            eprintln!("Warning: Log file path {} has no file name", path.display());
            eprintln!("Falling back to stderr logging");
            return None;
        };
        if let Err(e) = std::fs::create_dir_all(&directory) {
            eprintln!("Warning: Failed to create log directory: {e}");
            eprintln!("Falling back to stderr logging");
            return None;
        }
        Some((directory, file_name))
    });

    let installed = match (file_target, config.format) {
        (Some((directory, file_name)), format) => {
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let result = match format {
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter())
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .try_init(),
                LogFormat::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(writer)
                    .try_init(),
            };
            result.map(|()| Some(guard))
        }
        (None, LogFormat::Json) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .try_init()
            .map(|()| None),
        (None, LogFormat::Text) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map(|()| None),
    };

    installed.map_err(|e| crate::Error::Config(format!("Failed to initialize logging: {e}")))
}

/// Directory and file name of a log file; a bare file name lives in `.`
fn split_log_path(path: &Path) -> Option<(PathBuf, OsString)> {
    let file_name = path.file_name()?.to_os_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((directory, file_name))
}
