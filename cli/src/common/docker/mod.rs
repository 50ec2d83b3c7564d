//! # docker-manager Docker Module Interface
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything that talks to a container engine. Callers hold a `ContainerRuntime`
//! trait object; the production implementation is `DockerRuntime`, built on `bollard`.
//!
//! ## Architecture
//!
//! - **`connect`**: creates the `bollard::Docker` client.
//! - **`runtime`**: the `ContainerRuntime` trait and small helpers over its data.
//! - **`engine`**: `DockerRuntime`, the daemon-backed implementation.
//! - **`convert`**: `RunOptions` to create-container request.
//! - **`logs`**: writing container logs to timestamped files.
//!
//! ```rust
//! let runtime: Arc<dyn ContainerRuntime> =
//!     Arc::new(DockerRuntime::new(docker::connect_docker().await?));
//! let images = runtime.list_images().await?;
//! ```
//!

/// Creates the Docker client.
pub mod connect;
/// `RunOptions` to `bollard` request conversion.
pub mod convert;
/// The daemon-backed `ContainerRuntime`.
pub mod engine;
/// Writes container logs to files.
pub mod logs;
/// The `ContainerRuntime` trait.
pub mod runtime;

pub use connect::connect_docker;
pub use engine::DockerRuntime;
pub use runtime::{container_name, ContainerRuntime};
