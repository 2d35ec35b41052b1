use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::host;

pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: human-readable logs on stderr plus a
/// plain-text copy appended to `log_file`. Stdout is left to the protocol.
///
/// If the log file cannot be opened, logging continues on stderr only.
pub fn init(log_file: &Path, filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let existed = log_file.exists();
    let (file_layer, open_error) = match open_log_file(log_file) {
        Ok(file) => (
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    match open_error {
        Some(e) => warn!(
            path = %log_file.display(),
            error = %e,
            "could not open log file, logging to stderr only"
        ),
        None if !existed => info!(path = %log_file.display(), "log file created"),
        None => {}
    }
    Ok(())
}

pub fn log_startup() {
    let os = host::os_info();
    info!(
        os = %os.name,
        os_version = %os.version,
        version = env!("CARGO_PKG_VERSION"),
        "weather-mcp starting"
    );
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_with_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/nested/weather.log");

        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn log_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weather.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
