//! # docker-manager stop
//!
//! File: cli/src/commands/stop.rs
//!
//! Stops every running container, optionally writes the logs of all containers to a
//! directory, then prunes stopped containers.
//!
//! `--save-logs` without a value uses `[logs] directory`, falling back to the system
//! temporary directory.
//!
use crate::{
    commands::open_session,
    common::session::{Outcome, Request},
    core::{config, error::Result},
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Stop all running containers and prune stopped ones")]
pub struct StopArgs {
    /// Save each container's logs before pruning.
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub save_logs: Option<Option<PathBuf>>,

    /// Seconds Docker waits before killing a container. Overrides
    /// `[runtime] stop_timeout_secs`.
    #[arg(long, short)]
    pub time: Option<u32>,
}

impl StopArgs {
    fn log_dir(&self, configured: Option<&str>) -> Option<PathBuf> {
        match &self.save_logs {
            None => None,
            Some(Some(dir)) => Some(dir.clone()),
            Some(None) => Some(configured.map_or_else(std::env::temp_dir, PathBuf::from)),
        }
    }
}

pub async fn handle_stop(args: StopArgs) -> Result<()> {
    let mut cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    if let Some(time) = args.time {
        cfg.runtime.stop_timeout_secs = time;
    }
    let save_logs = args.log_dir(cfg.logs.directory.as_deref());
    info!("Handling stop command (save logs: {:?})", save_logs);

    let mut session = open_session(&cfg, None).await?;
    let outcome = session
        .execute(Request::StopAll { save_logs })
        .await
        .context("Failed to stop containers")?;

    if let Outcome::Stopped {
        stopped,
        pruned,
        saved_logs,
    } = outcome
    {
        for name in &stopped {
            println!("Stopped {}", name);
        }
        for path in &saved_logs {
            println!("Saved logs to {}", path.display());
        }
        println!(
            "Stopped {} container(s), pruned {}.",
            stopped.len(),
            pruned.len()
        );
    }
    Ok(())
}
