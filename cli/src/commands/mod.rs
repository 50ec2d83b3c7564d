//! # docker-manager Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! One module per subcommand, each defining a `clap` args struct and an async
//! `handle_*` function called from `main.rs`:
//!
//! - `images`: list the image catalog
//! - `tags`: tags known for one image, pulling it if needed
//! - `run`: start a container with composed launch options
//! - `stop`: stop everything, optionally saving logs, then prune
//! - `status`: list containers
//! - `options`: print the composed launch options as `docker run` flags
//!
//! Shared here: `LaunchArgs` (profile selection used by `run` and `options`) and
//! `open_session`, which connects to Docker and wraps the runtime in a `Session`.
//!
use crate::{
    common::{
        catalog::ParseMode,
        docker::{connect_docker, ContainerRuntime, DockerRuntime},
        options::{
            merge_fragments,
            profiles::{self, Profile},
            Fragment, RunOptions,
        },
        session::{RuntimePolicy, Session},
    },
    core::{config::Config, error::Result},
};
use clap::Args;
use std::sync::Arc;
use tracing::debug;

pub mod images;
pub mod options;
pub mod run;
pub mod status;
pub mod stop;
pub mod tags;

/// Launch profile selection.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
    /// Launch profile to apply; repeatable, applied in order. Defaults to the
    /// `[launch] profiles` configuration.
    #[arg(long = "profile", short = 'p', value_enum)]
    pub profiles: Vec<Profile>,

    /// Run the container privileged when the `usb` profile is applied.
    #[arg(long)]
    pub usb_privileged: bool,
}

impl LaunchArgs {
    /// Profiles to apply and whether `usb` runs privileged, falling back to `cfg`.
    fn selection<'a>(&'a self, cfg: &'a Config) -> (&'a [Profile], bool) {
        let selected: &[Profile] = if self.profiles.is_empty() {
            &cfg.launch.profiles
        } else {
            &self.profiles
        };
        (selected, self.usb_privileged || cfg.launch.usb_privileged)
    }

    /// Composes the selected profiles and layers the configured environment and mounts
    /// on top.
    pub fn run_options(&self, cfg: &Config) -> Result<RunOptions> {
        let (selected, usb_privileged) = self.selection(cfg);
        debug!(
            "Composing launch options from {:?} (usb privileged: {})",
            selected, usb_privileged
        );
        Ok(profiles::compose(selected, usb_privileged)?.merge(RunOptions::from(&cfg.launch)))
    }

    /// The same composition as `run_options`, performed on untyped fragments.
    pub fn options_tree(&self, cfg: &Config) -> Result<Fragment> {
        let (selected, usb_privileged) = self.selection(cfg);
        let mut tree = Fragment::map(Vec::<(String, Fragment)>::new());
        for profile in selected {
            tree = merge_fragments(tree, profile.options(usb_privileged)?.to_fragment());
        }
        Ok(merge_fragments(tree, RunOptions::from(&cfg.launch).to_fragment()))
    }
}

/// Connects to the Docker daemon and opens a session configured from `cfg`.
pub async fn open_session(cfg: &Config, parse_mode: Option<ParseMode>) -> Result<Session> {
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::new(connect_docker().await?));
    Ok(Session::new(
        runtime,
        RuntimePolicy::from(&cfg.runtime),
        parse_mode.unwrap_or(cfg.catalog.parse_mode),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MountConfig;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Wrapper {
        #[command(flatten)]
        launch: LaunchArgs,
    }

    #[test]
    fn test_launch_args_parsing() {
        let parsed =
            Wrapper::try_parse_from(["test", "-p", "sudo", "--profile", "usb", "--usb-privileged"])
                .unwrap();
        assert_eq!(parsed.launch.profiles, vec![Profile::Sudo, Profile::Usb]);
        assert!(parsed.launch.usb_privileged);

        assert!(Wrapper::try_parse_from(["test", "--profile", "wayland"]).is_err());
    }

    #[test]
    fn test_run_options_falls_back_to_config_profiles() {
        let mut cfg = Config::default();
        cfg.launch.profiles = vec![Profile::Usb];
        cfg.launch.usb_privileged = true;
        cfg.launch.mounts = vec![MountConfig {
            host: "/data".into(),
            container: "/data".into(),
            readonly: false,
        }];

        let options = LaunchArgs::default().run_options(&cfg).unwrap();
        assert_eq!(options.privileged, Some(true));
        assert!(options.volumes.contains_key("/dev"));
        assert!(options.volumes.contains_key("/data"));
    }

    #[test]
    fn test_options_tree_matches_typed_composition() {
        let mut cfg = Config::default();
        cfg.launch.environment.insert("RMW_IMPLEMENTATION".into(), "rmw_fastrtps_cpp".into());
        let args = LaunchArgs {
            profiles: vec![Profile::Sudo, Profile::Usb],
            usb_privileged: true,
        };

        let typed = args.run_options(&cfg).unwrap().to_fragment();
        assert_eq!(args.options_tree(&cfg).unwrap(), typed);
    }

    #[test]
    fn test_run_options_cli_profiles_override_config() {
        let mut cfg = Config::default();
        cfg.launch.profiles = vec![Profile::Usb];

        let args = LaunchArgs {
            profiles: vec![Profile::Sudo],
            usb_privileged: false,
        };
        let options = args.run_options(&cfg).unwrap();
        assert_eq!(options.group_add, Some(vec!["sudo".to_string()]));
        assert!(!options.volumes.contains_key("/dev"));
    }
}
