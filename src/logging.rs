//! Logging setup for the binary: console plus an optional daily file.
//!
//! The core crate logs through the `log` facade; the `tracing-log` bridge
//! installed by `init` forwards those records to the same subscriber.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "download.log.";

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    /// Daily files kept after pruning, today's included.
    pub keep: usize,
    pub to_file: bool,
    pub verbosity: u8,
    /// Console output goes to stderr, keeping stdout for the JSON report.
    pub console_to_stderr: bool,
}

impl LogSettings {
    fn default_level(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn console_writer(&self) -> BoxMakeWriter {
        if self.console_to_stderr {
            BoxMakeWriter::new(io::stderr)
        } else {
            BoxMakeWriter::new(io::stdout)
        }
    }
}

/// Path of today's log file under `dir`.
pub fn daily_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}{}", LOG_FILE_PREFIX, Local::now().format("%Y-%m-%d")))
}

/// Install the global subscriber. Returns the log file in use, if any.
pub fn init(settings: &LogSettings) -> io::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_level()));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(settings.console_writer());

    let (file_layer, log_path) = if settings.to_file {
        create_log_dir(&settings.dir)?;
        let path = daily_log_path(&settings.dir);
        let file = open_append(&path)?;
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    if settings.to_file {
        match prune_old_logs(&settings.dir, settings.keep) {
            Ok(removed) if !removed.is_empty() => {
                tracing::debug!("Pruned {} old log files", removed.len())
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not prune old log files: {}", e),
        }
    }

    Ok(log_path)
}

/// Delete the oldest daily log files so at most `keep` remain.
/// Returns the removed paths.
pub fn prune_old_logs(dir: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_FILE_PREFIX))
                    .unwrap_or(false)
        })
        .collect();

    // ISO dates sort chronologically; newest first
    logs.sort();
    logs.reverse();

    let mut removed = Vec::new();
    for path in logs.into_iter().skip(keep.max(1)) {
        fs::remove_file(&path)?;
        removed.push(path);
    }
    Ok(removed)
}

fn create_log_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
