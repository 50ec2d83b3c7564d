//! # Docker Engine Runtime
//!
//! File: cli/src/common/docker/engine.rs
//!
//! ## Overview
//!
//! `DockerRuntime` implements `ContainerRuntime` against the Docker daemon through
//! `bollard`. It owns the client handed to it by `connect_docker`; dropping the runtime
//! releases the connection.
//!
//! Daemon responses with a well-known meaning are mapped onto specific errors:
//!
//! - `404` on pull, create or inspect: `ImageNotFound`
//! - `404` on stop or logs: `ContainerNotFound`
//! - `409` on create: `DockerOperation` (the name is already taken)
//! - `304` on stop: the container was already stopped, treated as success
//!
//! Everything else is wrapped in `DockerApi` with context naming the call.
//!
use super::convert::container_config;
use super::runtime::{split_reference, ContainerRuntime};
use crate::common::options::RunOptions;
use crate::core::error::{DockerManagerError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use bollard::{
    container::{
        CreateContainerOptions, ListContainersOptions, LogsOptions, PruneContainersOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as BollardError,
    image::{CreateImageOptions, ListImagesOptions},
    models::{ContainerSummary, ImageInspect, ImageSummary},
    Docker,
};
use futures_util::StreamExt;
use tracing::{debug, error, info, instrument, warn};

/// `ContainerRuntime` backed by a live Docker daemon.
///
/// Holds one `bollard::Docker` client for its whole lifetime; the client is cheap to
/// share between the session's worker tasks.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Wraps a connected client.
    ///
    /// # Arguments
    ///
    /// * `docker` - A client obtained from `connect_docker`.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Wraps a `bollard` error as `DockerManagerError::DockerApi`, with `what` as context.
fn api_error(e: BollardError, what: String) -> anyhow::Error {
    anyhow!(DockerManagerError::DockerApi { source: e }).context(what)
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    #[instrument(skip(self))]
    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(|e| api_error(e, "Failed to list Docker images".to_string()))?;
        debug!("Docker reported {} image(s)", images.len());
        Ok(images)
    }

    /// Pulls the image and inspects the result.
    ///
    /// Progress messages from the pull stream are logged at debug level. An error
    /// reported inside the stream (as opposed to an HTTP error) fails the pull.
    #[instrument(skip(self), fields(image = %reference))]
    async fn pull_image(&self, reference: &str) -> Result<ImageInspect> {
        let (from_image, tag) = split_reference(reference);
        info!("Pulling image '{}' (tag '{}')...", from_image, tag);

        let options = CreateImageOptions {
            from_image: from_image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(message) = info.error {
                        error!("Pull of '{}' reported an error: {}", reference, message);
                        return Err(anyhow!(DockerManagerError::DockerOperation(format!(
                            "Pulling '{}' failed: {}",
                            reference, message
                        ))));
                    }
                    if let Some(status) = info.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    warn!("Image '{}' was not found in any registry.", reference);
                    return Err(anyhow!(DockerManagerError::ImageNotFound {
                        name: reference.to_string()
                    }));
                }
                Err(e) => return Err(api_error(e, format!("Failed to pull image '{}'", reference))),
            }
        }

        let pulled = if tag.is_empty() {
            from_image.to_string()
        } else {
            format!("{}:{}", from_image, tag)
        };
        match self.docker.inspect_image(&pulled).await {
            Ok(image) => {
                info!("Pulled image '{}'.", pulled);
                Ok(image)
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(anyhow!(DockerManagerError::ImageNotFound { name: pulled })),
            Err(e) => Err(api_error(e, format!("Failed to inspect image '{}'", pulled))),
        }
    }

    /// Creates the container with `create_container`, then starts it.
    ///
    /// A 404 on create means the image is missing locally and a 409 means the name is
    /// taken. Creation warnings from the daemon are logged.
    #[instrument(skip(self, options), fields(container = %name, image = %image))]
    async fn run_container(&self, name: &str, image: &str, options: &RunOptions) -> Result<String> {
        let config = container_config(image, options);
        let create_options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        info!("Creating container '{}' from image '{}'", name, image);
        let created = match self.docker.create_container(Some(create_options), config).await {
            Ok(created) => created,
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                return Err(anyhow!(DockerManagerError::ImageNotFound {
                    name: image.to_string()
                }))
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 409,
                message,
            }) => {
                return Err(anyhow!(DockerManagerError::DockerOperation(format!(
                    "A container named '{}' already exists: {}",
                    name, message
                ))))
            }
            Err(e) => return Err(api_error(e, format!("Failed to create container '{}'", name))),
        };
        for warning in &created.warnings {
            warn!("Docker: {}", warning);
        }

        info!("Starting container '{}' (ID: {})", name, created.id);
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| api_error(e, format!("Failed to start container '{}'", name)))?;
        info!("Container '{}' started successfully.", name);
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        self.docker
            .list_containers(Some(options))
            .await
            .map_err(|e| api_error(e, "Failed to list containers".to_string()))
    }

    /// Stops the container. The daemon answers 304 for a container that is not
    /// running, which counts as success.
    #[instrument(skip(self), fields(container = %name))]
    async fn stop_container(&self, name: &str, timeout_secs: u32) -> Result<()> {
        info!("Stopping container '{}' (timeout {}s)...", name, timeout_secs);
        let options = StopContainerOptions {
            t: i64::from(timeout_secs),
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(_) => {
                info!("Container '{}' stopped.", name);
                Ok(())
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                info!("Container '{}' was already stopped.", name);
                Ok(())
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(anyhow!(DockerManagerError::ContainerNotFound {
                name: name.to_string()
            })),
            Err(e) => Err(api_error(e, format!("Failed to stop container '{}'", name))),
        }
    }

    #[instrument(skip(self))]
    async fn prune_containers(&self) -> Result<Vec<String>> {
        let response = self
            .docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await
            .map_err(|e| api_error(e, "Failed to prune stopped containers".to_string()))?;
        let removed = response.containers_deleted.unwrap_or_default();
        info!(
            "Pruned {} container(s), reclaimed {} bytes.",
            removed.len(),
            response.space_reclaimed.unwrap_or(0)
        );
        Ok(removed)
    }

    /// Collects the whole non-following log stream, stdout and stderr interleaved as
    /// the daemon sends them.
    #[instrument(skip(self), fields(container = %name))]
    async fn container_logs(&self, name: &str) -> Result<Vec<u8>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(name, Some(options));
        let mut buffer = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => buffer.extend_from_slice(&output.into_bytes()),
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    return Err(anyhow!(DockerManagerError::ContainerNotFound {
                        name: name.to_string()
                    }))
                }
                Err(e) => {
                    return Err(api_error(
                        e,
                        format!("Error reading logs for container '{}'", name),
                    ))
                }
            }
        }
        debug!("Read {} byte(s) of logs from '{}'", buffer.len(), name);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::connect::connect_docker;

    // The tests below need a reachable Docker daemon and network access.
    // Run with `cargo test -- --ignored`.

    #[tokio::test]
    #[ignore]
    async fn test_list_images_live() {
        let runtime = DockerRuntime::new(connect_docker().await.unwrap());
        assert!(runtime.list_images().await.is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn test_pull_defaults_to_latest() {
        let runtime = DockerRuntime::new(connect_docker().await.unwrap());
        let image = runtime.pull_image("hello-world").await.unwrap();
        let tags = image.repo_tags.unwrap_or_default();
        assert!(tags.contains(&"hello-world:latest".to_string()));
    }

    #[tokio::test]
    #[ignore]
    async fn test_pull_unknown_image_fails() {
        let runtime = DockerRuntime::new(connect_docker().await.unwrap());
        let result = runtime
            .pull_image("docker-manager-nonexistent-image-for-testing")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_stop_missing_container_is_not_found() {
        let runtime = DockerRuntime::new(connect_docker().await.unwrap());
        let err = runtime
            .stop_container("docker-manager-nonexistent-container", 1)
            .await
            .unwrap_err();
        assert!(crate::core::error::is_kind(&err, |k| matches!(
            k,
            DockerManagerError::ContainerNotFound { .. }
        )));
    }
}
