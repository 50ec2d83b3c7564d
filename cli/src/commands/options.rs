//! # docker-manager options
//!
//! File: cli/src/commands/options.rs
//!
//! Prints the launch options `run` would use as an equivalent `docker run` command
//! line. Needs no Docker daemon.
//!
//! ```bash
//! docker-manager options -p sudo -p x11
//! # docker run --user 1000:1000 --group-add sudo --volume /etc/group:/etc/group:ro ...
//! docker-manager options -p ros2 --tree
//! ```
//!
use crate::{
    commands::LaunchArgs,
    common::options::RunOptions,
    core::{config, error::Result},
};
use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Print composed launch options as docker run flags")]
pub struct OptionsArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Image reference appended to the printed command.
    #[arg(long, short)]
    pub image: Option<String>,

    /// Print the merged option tree instead of a command line.
    #[arg(long)]
    pub tree: bool,
}

pub async fn handle_options(args: OptionsArgs) -> Result<()> {
    let cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    if args.tree {
        for line in args.launch.options_tree(&cfg)?.render() {
            println!("{}", line);
        }
        return Ok(());
    }
    let options = args.launch.run_options(&cfg)?;
    println!(
        "{}",
        docker_run_line(&options, &cfg.launch.container_name, args.image.as_deref())
    );
    Ok(())
}

fn docker_run_line(options: &RunOptions, name: &str, image: Option<&str>) -> String {
    let mut parts = vec![
        "docker".to_string(),
        "run".to_string(),
        "--detach".to_string(),
        "--name".to_string(),
        name.to_string(),
    ];
    parts.extend(options.docker_args());
    parts.extend(image.map(str::to_string));
    parts.join(" ")
}
