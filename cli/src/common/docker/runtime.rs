//! # Container Runtime Interface
//!
//! File: cli/src/common/docker/runtime.rs
//!
//! The calls docker-manager makes against a container engine, as an object-safe async
//! trait. `DockerRuntime` (see `engine.rs`) talks to the Docker daemon through
//! `bollard`; tests substitute an in-memory implementation.
//!
use crate::common::options::RunOptions;
use crate::core::error::Result;
use async_trait::async_trait;
use bollard::models::{ContainerSummary, ImageInspect, ImageSummary};

/// The container engine operations docker-manager depends on.
///
/// Implementations map engine-specific failures onto `DockerManagerError` so callers
/// can react to "not found" and "conflict" cases without knowing the backend.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Every top-level image known to the engine.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::DockerApi` - If the engine cannot be queried.
    async fn list_images(&self) -> Result<Vec<ImageSummary>>;

    /// Pulls `reference` and returns the pulled image.
    ///
    /// # Arguments
    ///
    /// * `reference` - An image reference such as `ros`, `ros:humble` or
    ///                 `localhost:5000/app`. A missing tag means `latest`.
    ///
    /// # Returns
    ///
    /// * `Result<ImageInspect>` - The image as the engine stores it after the pull,
    ///   including every `repository:tag` string it is known by.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::ImageNotFound` - If no registry has the image.
    /// * `DockerManagerError::DockerOperation` - If the pull stream reports an error.
    /// * `DockerManagerError::DockerApi` - For other engine errors.
    async fn pull_image(&self, reference: &str) -> Result<ImageInspect>;

    /// Creates and starts a detached container.
    ///
    /// # Arguments
    ///
    /// * `name` - The container name.
    /// * `image` - The full image reference to start from.
    /// * `options` - The composed launch options.
    ///
    /// # Returns
    ///
    /// * `Result<String>` - The id of the started container.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::ImageNotFound` - If `image` is not available locally.
    /// * `DockerManagerError::DockerOperation` - If a container named `name` already
    ///   exists.
    /// * `DockerManagerError::DockerApi` - For other engine errors.
    async fn run_container(&self, name: &str, image: &str, options: &RunOptions)
        -> Result<String>;

    /// Running containers, or every container when `all` is set.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::DockerApi` - If the engine cannot be queried.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Stops a container, giving it `timeout_secs` before it is killed. Stopping an
    /// already stopped container succeeds.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::ContainerNotFound` - If no container is named `name`.
    /// * `DockerManagerError::DockerApi` - For other engine errors.
    async fn stop_container(&self, name: &str, timeout_secs: u32) -> Result<()>;

    /// Removes every stopped container, returning the removed ids.
    async fn prune_containers(&self) -> Result<Vec<String>>;

    /// The complete stdout/stderr log of a container.
    ///
    /// # Errors
    ///
    /// * `DockerManagerError::ContainerNotFound` - If no container is named `name`.
    /// * `DockerManagerError::DockerApi` - If the log stream fails.
    async fn container_logs(&self, name: &str) -> Result<Vec<u8>>;
}

/// Display name of a container: its first name without the leading `/`, or its id.
pub fn container_name(summary: &ContainerSummary) -> String {
    summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())
        .or_else(|| summary.id.clone())
        .unwrap_or_default()
}

/// Splits an image reference into the `fromImage`/`tag` pair of a pull request.
///
/// The tag defaults to `latest`. A colon that belongs to a registry port is not taken
/// for a tag separator; digest references keep their digest in the image part.
pub fn split_reference(reference: &str) -> (&str, &str) {
    if reference.contains('@') {
        return (reference, "");
    }
    let last_segment_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[last_segment_start..].rfind(':') {
        Some(i) => {
            let split = last_segment_start + i;
            (&reference[..split], &reference[split + 1..])
        }
        None => (reference, "latest"),
    }
}
