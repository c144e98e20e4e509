use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::APP_NAME;

/// Environment variable holding the filter directives, e.g. `userdeck=debug`.
pub const LOG_ENV: &str = "USERDECK_LOG";

const LOG_FILE_NAME: &str = "userdeck.log";

/// Where log records go. The gallery owns the terminal, so it logs to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

pub fn log_file_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine cache directory")?;
    Ok(base.cache_dir().join(APP_NAME).join(LOG_FILE_NAME))
}

fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Install the global subscriber. Returns the log file path when logging to
/// a file.
pub fn init(target: LogTarget) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Stderr => {
            let fmt_layer = fmt::layer().with_writer(io::stderr).with_target(false);
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(env_filter(LevelFilter::WARN));
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to install log subscriber")?;
            Ok(None)
        }
        LogTarget::File => {
            let path = log_file_path()?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
            let file = File::options()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            let fmt_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_thread_names(true)
                .with_target(false);
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(env_filter(LevelFilter::INFO));
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to install log subscriber")?;
            Ok(Some(path))
        }
    }
}
