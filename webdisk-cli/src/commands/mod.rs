//! CLI command implementations

pub mod auth;
pub mod file;
pub mod logs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use webdisk_core::{EntryPoint, LogEvent, LoggingService, WebDiskContext};

/// Env var overriding the data directory
pub const DIR_ENV: &str = "WEBDISK_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `WEBDISK_DIR`, or `~/.webdisk`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".webdisk"))
}

/// Open the webdisk context for the data directory
pub fn get_context() -> Result<WebDiskContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    WebDiskContext::open(&data_dir).context("Failed to initialize webdisk context")
}
