//! # docker-manager Docker Connection Helper
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Provides `connect_docker`, the single place a `bollard::Docker` client is created.
//! The returned handle is owned by whoever called it (normally a `DockerRuntime` inside
//! a `Session`) and is released when that owner goes out of scope, on success and
//! error paths alike. Nothing keeps a process-wide client around.
//!
//! ```rust
//! let runtime = DockerRuntime::new(connect_docker().await?);
//! ```
//!
use crate::core::error::{DockerManagerError, Result};
use anyhow::{anyhow, Context};
use bollard::Docker;
use tracing::instrument;

/// Establishes a connection to the local Docker daemon using default settings.
///
/// This honours `DOCKER_HOST` and otherwise uses the platform default socket
/// (`/var/run/docker.sock` on Unix, the named pipe on Windows).
///
/// # Errors
///
/// Returns an `Err` wrapping `DockerManagerError::DockerApi` if the client cannot be
/// created.
#[instrument]
pub async fn connect_docker() -> Result<Docker> {
    Docker::connect_with_local_defaults()
        .map_err(|e| anyhow!(DockerManagerError::DockerApi { source: e }))
        .context("Failed to connect to Docker daemon. Is it running and accessible?")
}
