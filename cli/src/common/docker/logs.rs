//! Saving container logs to disk.
//!
//! Each container's complete log is written to `<dir>/<name>_<timestamp>.log`, with
//! the timestamp in local time as `%Y-%m-%d_%H:%M:%S`. Log bytes are written as
//! received from the daemon.
//!
use crate::core::error::{DockerManagerError, Result};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// `chrono` format of the timestamp in log file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Path of the log file for `container` captured at `at`.
pub fn log_file_path(dir: &Path, container: &str, at: DateTime<Local>) -> PathBuf {
    let name = container.trim_start_matches('/');
    dir.join(format!("{}_{}.log", name, at.format(TIMESTAMP_FORMAT)))
}

/// Checks that logs can be saved into `dir`.
///
/// # Errors
///
/// * `DockerManagerError::FileSystem` - If `dir` does not exist or is not a directory.
pub fn ensure_log_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(anyhow!(DockerManagerError::FileSystem(format!(
            "Log directory '{}' does not exist or is not a directory",
            dir.display()
        ))))
    }
}

/// Writes `logs` for `container` into a new timestamped file in `dir`.
///
/// # Arguments
///
/// * `dir` - The target directory. It must already exist (see `ensure_log_dir`).
/// * `container` - The container name; a leading `/` is dropped.
/// * `logs` - The raw log bytes.
///
/// # Returns
///
/// * `Result<PathBuf>` - The path of the file written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_log(dir: &Path, container: &str, logs: &[u8]) -> Result<PathBuf> {
    let path = log_file_path(dir, container, Local::now());
    tokio::fs::write(&path, logs)
        .await
        .with_context(|| format!("Failed to write logs to '{}'", path.display()))?;
    info!("Saved logs of '{}' to {}", container, path.display());
    Ok(path)
}
