//! # Launch Profiles
//!
//! File: cli/src/common/options/profiles.rs
//!
//! ## Overview
//!
//! Producers of `RunOptions` for common launch scenarios. Each one is pure apart from
//! reading the host environment (and, for `non_root_user`, the process identity). The
//! `*_with` variants take the environment lookup as a closure so tests never touch the
//! real process environment.
//!
//! | Profile         | Produces |
//! |-----------------|----------|
//! | `non-root-user` | `user = "<uid>:<gid>"` of the invoking process |
//! | `sudo`          | `group_add = ["sudo"]` plus the host identity/time files bound in |
//! | `ros2`          | `ROS_LOG_DIR`, `ROS_LOCALHOST_ONLY`, `ROS_DOMAIN_ID` |
//! | `x11`           | `DISPLAY`, `XAUTHORITY`, `/tmp/.X11-unix`, merged with `non-root-user` |
//! | `usb`           | `tty`, `/dev` bound in, `privileged` only when asked for |
//!
//! Absent host variables are carried as `None`, never dropped and never an error.
//!
use super::{RunOptions, VolumeBind};
use crate::core::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Log directory handed to ROS 2 inside the container.
pub const ROS_LOG_DIR: &str = "tmp/.ros";
/// Host X11 socket directory.
pub const X11_SOCKET_DIR: &str = "/tmp/.X11-unix";

/// A named launch scenario.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    NonRootUser,
    Sudo,
    Ros2,
    X11,
    Usb,
}

impl Profile {
    /// Options for this profile, read from the host.
    pub fn options(self, usb_privileged: bool) -> Result<RunOptions> {
        match self {
            Profile::NonRootUser => non_root_user(),
            Profile::Sudo => Ok(sudo_group()),
            Profile::Ros2 => Ok(ros2_environment()),
            Profile::X11 => x11(),
            Profile::Usb => Ok(usb(usb_privileged)),
        }
    }
}

/// Folds the options of every profile, in order, into one `RunOptions`.
pub fn compose(profiles: &[Profile], usb_privileged: bool) -> Result<RunOptions> {
    profiles
        .iter()
        .try_fold(RunOptions::default(), |options, profile| {
            debug!("Applying launch profile {:?}", profile);
            Ok(options.merge(profile.options(usb_privileged)?))
        })
}

fn host_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(unix)]
fn host_identity() -> Result<(u32, u32)> {
    use nix::unistd::{getgid, getuid};
    Ok((u32::from(getuid()), u32::from(getgid())))
}

#[cfg(not(unix))]
fn host_identity() -> Result<(u32, u32)> {
    use crate::core::error::DockerManagerError;
    Err(anyhow::anyhow!(DockerManagerError::UnsupportedPlatform {
        fragment: "non-root-user".into(),
    }))
}

/// Runs the container as the invoking user.
///
/// # Errors
///
/// `DockerManagerError::UnsupportedPlatform` on hosts without POSIX user/group ids.
pub fn non_root_user() -> Result<RunOptions> {
    let (uid, gid) = host_identity()?;
    Ok(non_root_user_for(uid, gid))
}

pub fn non_root_user_for(uid: u32, gid: u32) -> RunOptions {
    RunOptions {
        user: Some(format!("{}:{}", uid, gid)),
        ..Default::default()
    }
}

/// Adds the container user to `sudo` and binds the host identity and time files.
///
/// `localtime`, `passwd` and `group` are read-only; `hosts` and `shadow` carry no mode
/// and are therefore writable.
pub fn sudo_group() -> RunOptions {
    let volumes = BTreeMap::from([
        ("/etc/localtime".to_string(), VolumeBind::read_only("/etc/localtime")),
        ("/etc/hosts".to_string(), VolumeBind::same_path("/etc/hosts")),
        ("/etc/passwd".to_string(), VolumeBind::read_only("/etc/passwd")),
        ("/etc/group".to_string(), VolumeBind::read_only("/etc/group")),
        ("/etc/shadow".to_string(), VolumeBind::same_path("/etc/shadow")),
    ]);
    RunOptions {
        group_add: Some(vec!["sudo".to_string()]),
        volumes,
        ..Default::default()
    }
}

pub fn ros2_environment() -> RunOptions {
    ros2_environment_with(host_env)
}

pub fn ros2_environment_with(lookup: impl Fn(&str) -> Option<String>) -> RunOptions {
    let environment = BTreeMap::from([
        ("ROS_LOG_DIR".to_string(), Some(ROS_LOG_DIR.to_string())),
        ("ROS_LOCALHOST_ONLY".to_string(), lookup("ROS_LOCALHOST_ONLY")),
        ("ROS_DOMAIN_ID".to_string(), lookup("ROS_DOMAIN_ID")),
    ]);
    RunOptions {
        environment,
        ..Default::default()
    }
}

/// Lets the container draw on the host X server, running as the invoking user.
pub fn x11() -> Result<RunOptions> {
    Ok(x11_with(host_env, non_root_user()?))
}

/// X11 options from `lookup`, merged with the given user options.
pub fn x11_with(lookup: impl Fn(&str) -> Option<String>, user: RunOptions) -> RunOptions {
    let display = RunOptions {
        environment: BTreeMap::from([
            ("DISPLAY".to_string(), lookup("DISPLAY")),
            ("XAUTHORITY".to_string(), lookup("XAUTHORITY")),
        ]),
        volumes: BTreeMap::from([(X11_SOCKET_DIR.to_string(), VolumeBind::same_path(X11_SOCKET_DIR))]),
        ..Default::default()
    };
    display.merge(user)
}

/// Exposes the host's `/dev` with a terminal attached.
///
/// `privileged` is only set when explicitly requested.
pub fn usb(privileged: bool) -> RunOptions {
    RunOptions {
        tty: Some(true),
        privileged: privileged.then_some(true),
        volumes: BTreeMap::from([("/dev".to_string(), VolumeBind::same_path("/dev"))]),
        ..Default::default()
    }
}
