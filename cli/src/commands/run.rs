//! # docker-manager run
//!
//! File: cli/src/commands/run.rs
//!
//! ## Overview
//!
//! Starts a detached container from a catalog image with launch options composed from
//! profiles and configuration, then prints the status of every container.
//!
//! ## Tag selection
//!
//! 1. `--tag` if given.
//! 2. A tag already part of `--image` (`ros:humble`).
//! 3. Otherwise the catalog is consulted (pulling the image if needed) and `latest` is
//!    used when present, else the first tag in sorted order.
//!
//! ## Usage
//!
//! ```bash
//! docker-manager run --image ros --tag humble -p non-root-user -p ros2
//! docker-manager run --image osrf/ros:jazzy-desktop -p x11 -p usb --usb-privileged
//! docker-manager run --image ubuntu --clean-start
//! ```
//!
use crate::{
    commands::{open_session, status::print_states, LaunchArgs},
    common::session::{Outcome, Request, Session},
    core::{
        config,
        error::{DockerManagerError, Result},
    },
};
use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    about = "Start a container from a local or pulled image",
    long_about = "Creates and starts a detached container. Launch options come from the\n\
                  selected profiles with the configured environment and mounts on top."
)]
pub struct RunArgs {
    /// Image repository, optionally with a tag.
    #[arg(long, short)]
    pub image: String,

    /// Tag to run. Defaults to `latest`, or the first known tag.
    #[arg(long, short)]
    pub tag: Option<String>,

    /// Container name. Defaults to `[launch] container_name`.
    #[arg(long, short)]
    pub name: Option<String>,

    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Stop and prune all containers before starting.
    #[arg(long)]
    pub clean_start: bool,
}

pub async fn handle_run(args: RunArgs) -> Result<()> {
    let cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| cfg.launch.container_name.clone());
    let options = args.launch.run_options(&cfg)?;
    info!("Handling run command for image '{}' as '{}'", args.image, name);

    let mut session = open_session(&cfg, None).await?;
    if args.clean_start {
        info!("Clean start requested, stopping and pruning all containers");
        session.submit(Request::StopAll { save_logs: None });
    }
    session.submit(Request::RefreshCatalog);
    debug!("{} preparatory request(s) in flight", session.in_flight());
    session
        .drain()
        .await
        .context("Failed to prepare for container start")?;

    let image = resolve_image(&mut session, &args.image, args.tag.as_deref()).await?;
    debug!("Launch options: {:?}", options);

    let outcome = session
        .execute(Request::Run {
            name: name.clone(),
            image: image.clone(),
            options,
        })
        .await
        .with_context(|| format!("Failed to run '{}' as '{}'", image, name))?;
    if let Outcome::Started { id, .. } = outcome {
        println!(
            "Started container '{}' ({}) from '{}'.",
            name,
            &id[..id.len().min(12)],
            image
        );
    }

    if let Outcome::Status(states) = session.execute(Request::Status { all: true }).await? {
        print_states(&states);
    }
    Ok(())
}

/// The full `repository:tag` reference to run. Expects a refreshed catalog.
async fn resolve_image(session: &mut Session, image: &str, tag: Option<&str>) -> Result<String> {
    if let Some(tag) = tag {
        return Ok(format!("{}:{}", image, tag));
    }
    if image.contains('@') || has_explicit_tag(image) {
        return Ok(image.to_string());
    }

    let outcome = session
        .execute(Request::LookupTags {
            image: image.to_string(),
        })
        .await?;
    let tags = match outcome {
        Outcome::Tags { tags, .. } => tags,
        _ => Vec::new(),
    };
    let chosen = choose_tag(&tags).ok_or_else(|| {
        anyhow!(DockerManagerError::ImageNotFound {
            name: image.to_string()
        })
    })?;
    info!("No tag given for '{}', using '{}'", image, chosen);
    Ok(format!("{}:{}", image, chosen))
}

/// Whether the last path segment of `image` carries a `:tag`. A registry port earlier
/// in the path does not count.
fn has_explicit_tag(image: &str) -> bool {
    image
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment.contains(':'))
}

/// `latest` when known, else the first tag.
fn choose_tag(tags: &[String]) -> Option<&str> {
    tags.iter()
        .find(|t| *t == "latest")
        .or_else(|| tags.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::options::profiles::Profile;

    #[test]
    fn test_run_args_parsing() {
        let args = RunArgs::try_parse_from([
            "run",
            "--image",
            "ros",
            "-t",
            "humble",
            "-n",
            "robot",
            "-p",
            "ros2",
            "--clean-start",
        ])
        .unwrap();
        assert_eq!(args.image, "ros");
        assert_eq!(args.tag.as_deref(), Some("humble"));
        assert_eq!(args.name.as_deref(), Some("robot"));
        assert_eq!(args.launch.profiles, vec![Profile::Ros2]);
        assert!(args.clean_start);
        assert!(!args.launch.usb_privileged);
    }

    #[test]
    fn test_run_requires_image() {
        assert!(RunArgs::try_parse_from(["run"]).is_err());
    }

    #[test]
    fn test_choose_tag() {
        let tags = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(choose_tag(&tags(&["22.04", "latest"])), Some("latest"));
        assert_eq!(choose_tag(&tags(&["humble", "iron"])), Some("humble"));
        assert_eq!(choose_tag(&[]), None);
    }

    #[test]
    fn test_has_explicit_tag() {
        assert!(has_explicit_tag("ros:humble"));
        assert!(has_explicit_tag("ubuntu:latest"));
        assert!(!has_explicit_tag("ubuntu"));
        assert!(!has_explicit_tag("localhost:5000/app"));
        assert!(has_explicit_tag("localhost:5000/app:1.0"));
    }
}
