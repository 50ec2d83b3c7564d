//! # docker-manager Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout docker-manager. Library-style
//! code (catalog, run options, runtime, session) raises a `DockerManagerError` variant
//! for every failure a caller may want to tell apart, and wraps it in `anyhow::Error`
//! so call sites can add context with `.context(..)`.
//!
//! ## Architecture
//!
//! - `DockerManagerError`: a `thiserror` enum naming each failure kind.
//! - `Result<T>`: an alias for `anyhow::Result<T>`.
//!
//! Callers that need to branch on a specific kind downcast:
//!
//! ```rust
//! match session_result {
//!     Err(e) if e.downcast_ref::<DockerManagerError>()
//!         .map_or(false, |de| matches!(de, DockerManagerError::RuntimeTimeout { .. })) => {
//!         eprintln!("Docker daemon is not answering.");
//!     }
//!     other => other?,
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for docker-manager.
#[derive(Error, Debug)]
pub enum DockerManagerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Docker API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("Docker operation failed: {0}")]
    DockerOperation(String),

    #[error("Container '{name}' not found.")]
    ContainerNotFound { name: String },

    #[error("Image '{name}' not found.")]
    ImageNotFound { name: String },

    /// Raised only by the strict catalog parse modes.
    #[error("Malformed image tag '{tag}': {reason}")]
    MalformedTag { tag: String, reason: String },

    /// The host has no POSIX user/group ids to hand to the container.
    #[error("The {fragment} run options are not supported on this platform.")]
    UnsupportedPlatform { fragment: String },

    #[error("Docker call '{operation}' timed out after {attempts} attempt(s) of {timeout_ms} ms each.")]
    RuntimeTimeout {
        operation: String,
        attempts: u32,
        timeout_ms: u64,
    },
}

/// Type alias for Result using anyhow::Error.
pub type Result<T> = anyhow::Result<T>;

/// Returns true when `err` wraps the given `DockerManagerError` kind.
pub fn is_kind(err: &anyhow::Error, pred: impl Fn(&DockerManagerError) -> bool) -> bool {
    err.downcast_ref::<DockerManagerError>().is_some_and(pred)
}
