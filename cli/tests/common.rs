//! # docker-manager Integration Test Helpers
//!
//! File: cli/tests/common.rs
//!
//! Shared by every integration test crate in `cli/tests/`.
//!

// Each test crate uses a different subset of these helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;

/// `assert_cmd::Command` for the compiled `docker-manager` binary.
pub fn docker_manager_cmd() -> Command {
    Command::cargo_bin("docker-manager").expect("Failed to find docker-manager binary for testing")
}

/// Like `docker_manager_cmd`, but run from `dir` with user configuration looked up under
/// `dir` as well, so neither the developer's config nor the repository's is picked up.
pub fn isolated_cmd(dir: &Path) -> Command {
    let mut cmd = docker_manager_cmd();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Creates `dir/.git` so the project config search stops at `dir`.
pub fn mark_repo_root(dir: &Path) {
    std::fs::create_dir_all(dir.join(".git")).expect("Failed to create .git marker");
}
