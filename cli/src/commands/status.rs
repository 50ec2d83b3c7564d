//! # docker-manager status
//!
//! File: cli/src/commands/status.rs
//!
//! Lists running containers (or all of them with `--all`) as name, image, state and
//! status columns.
//!
use crate::{
    commands::open_session,
    common::session::{ContainerState, Outcome, Request},
    core::{config, error::Result},
};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Show container status")]
pub struct StatusArgs {
    /// Include stopped containers.
    #[arg(long, short)]
    pub all: bool,
}

pub async fn handle_status(args: StatusArgs) -> Result<()> {
    info!("Handling status command (all: {})", args.all);
    let cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    let mut session = open_session(&cfg, None).await?;

    if let Outcome::Status(states) = session.execute(Request::Status { all: args.all }).await? {
        if states.is_empty() {
            println!(
                "No containers found{}.",
                if args.all { "" } else { " (running)" }
            );
        } else {
            print_states(&states);
        }
    }
    Ok(())
}

/// Prints `states` as aligned columns under a header.
pub fn print_states(states: &[ContainerState]) {
    for line in format_states(states) {
        println!("{}", line);
    }
}

fn format_states(states: &[ContainerState]) -> Vec<String> {
    let width = |header: &str, field: fn(&ContainerState) -> &str| {
        states
            .iter()
            .map(|s| field(s).len())
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0)
    };
    let name_w = width("NAME", |s| s.name.as_str());
    let image_w = width("IMAGE", |s| s.image.as_str());
    let state_w = width("STATE", |s| s.state.as_str());

    let row = |name: &str, image: &str, state: &str, status: &str| {
        format!(
            "{:<name_w$}  {:<image_w$}  {:<state_w$}  {}",
            name, image, state, status
        )
        .trim_end()
        .to_string()
    };

    std::iter::once(row("NAME", "IMAGE", "STATE", "STATUS"))
        .chain(
            states
                .iter()
                .map(|s| row(&s.name, &s.image, &s.state, &s.status)),
        )
        .collect()
}
