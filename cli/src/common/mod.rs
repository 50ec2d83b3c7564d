//! # docker-manager Common Modules (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! The domain logic shared by the subcommands, kept apart from argument handling
//! (`commands::`) and infrastructure (`core::`).
//!
//! - **`catalog`**: repository to tag-set mapping built from image listings.
//! - **`options`**: typed container launch options, their merge, and launch profiles.
//! - **`docker`**: the `ContainerRuntime` trait and its `bollard`-backed implementation.
//! - **`session`**: runs runtime calls as background tasks with timeouts and retries.
//!
//! ```rust
//! use crate::common::{catalog, docker, options, session};
//! ```
//!

/// Image catalog built from `repository:tag` strings.
pub mod catalog;
/// Docker runtime access.
pub mod docker;
/// Container launch options and profiles.
pub mod options;
/// Background execution of runtime requests.
pub mod session;
