use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "logs/sortbox.log";
const DEFAULT_LEVEL: &str = "info";

/// Compact console output without timestamps; the file layer keeps both
/// timestamps and targets.
pub fn init_logger() -> impl Drop {
    let filter = env::var("SORTBOX_LOG")
        .or_else(|_| env::var("TRACING_LEVEL"))
        .unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file = env::var("SORTBOX_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (log_dir, file_name) = split_log_path(Path::new(&log_file));
    let dir_error = fs::create_dir_all(&log_dir).err();

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter_layer)
        .init();

    match dir_error {
        Some(err) => warn!("Cannot create log directory {}: {}", log_dir.display(), err),
        None => info!("Logging to {}", log_dir.join(&file_name).display()),
    }

    guard
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sortbox.log"));
    (dir, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_splits_into_dir_and_file() {
        assert_eq!(
            split_log_path(Path::new("logs/sortbox.log")),
            (PathBuf::from("logs"), PathBuf::from("sortbox.log"))
        );
        assert_eq!(
            split_log_path(Path::new("run.log")),
            (PathBuf::from("."), PathBuf::from("run.log"))
        );
    }
}
