//! # docker-manager Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Loads, merges and validates the TOML configuration. Configuration sources, in order
//! of precedence:
//! 1. Project-specific `.docker-manager.toml` in the current directory or an ancestor
//!    (the search stops at a directory containing `.git`)
//! 2. User-specific `config.toml` in the platform config directory
//!    (e.g. `~/.config/docker-manager/config.toml`)
//! 3. Default values defined in the code
//!
//! ## Example
//!
//! ```toml
//! [catalog]
//! parse_mode = "compat"     # or "reject" / "preserve"
//!
//! [runtime]
//! timeout_secs = 300
//! retries = 1
//! stop_timeout_secs = 10
//!
//! [launch]
//! container_name = "container"
//! profiles = ["x11", "ros2"]
//! usb_privileged = false
//!
//! [launch.environment]
//! RMW_IMPLEMENTATION = "rmw_cyclonedds_cpp"
//!
//! [[launch.mounts]]
//! host = "~/ws"
//! container = "/ws"
//!
//! [logs]
//! directory = "~/container-logs"
//! ```
//!
use crate::common::catalog::ParseMode;
use crate::common::options::profiles::Profile;
use crate::core::error::{DockerManagerError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

/// How image tag strings are parsed into the catalog.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default)]
    pub parse_mode: ParseMode,
}

/// Bounds on calls to the Docker daemon.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Upper bound for a single Docker call, pulls included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a call times out.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Grace period Docker gives a container before killing it on stop.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the container started by `docker-manager run`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    #[serde(default = "default_container_name")]
    pub container_name: String,
    /// Profiles applied when none are given on the command line.
    #[serde(default)]
    pub profiles: Vec<Profile>,
    /// Whether the `usb` profile also runs the container privileged.
    #[serde(default)]
    pub usb_privileged: bool,
    /// Extra environment variables, applied after the profiles.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Extra bind mounts, applied after the profiles.
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            container_name: default_container_name(),
            profiles: Vec::new(),
            usb_privileged: false,
            environment: HashMap::new(),
            mounts: Vec::new(),
        }
    }
}

/// Configuration for a single bind mount.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    /// Path on the host machine (can use ~). Will be expanded.
    pub host: String,
    /// Path inside the container.
    pub container: String,
    /// Mount as read-only (defaults to false).
    #[serde(default)]
    pub readonly: bool,
}

/// Where `stop --save-logs` writes when no directory is given.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    pub directory: Option<String>,
}

fn default_timeout_secs() -> u64 {
    300
}
fn default_retries() -> u32 {
    1
}
fn default_stop_timeout_secs() -> u32 {
    10
}
fn default_container_name() -> String {
    "container".to_string()
}

const PROJECT_CONFIG_FILENAME: &str = ".docker-manager.toml";

pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "DockerManager", "docker-manager") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file ({}) found.", PROJECT_CONFIG_FILENAME);
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();
    let mut merged = Config::default();

    merged.catalog.parse_mode = if project_cfg.catalog.parse_mode != defaults.catalog.parse_mode {
        project_cfg.catalog.parse_mode
    } else {
        user.catalog.parse_mode
    };
    merged.runtime.timeout_secs = if project_cfg.runtime.timeout_secs != default_timeout_secs() {
        project_cfg.runtime.timeout_secs
    } else {
        user.runtime.timeout_secs
    };
    merged.runtime.retries = if project_cfg.runtime.retries != default_retries() {
        project_cfg.runtime.retries
    } else {
        user.runtime.retries
    };
    merged.runtime.stop_timeout_secs =
        if project_cfg.runtime.stop_timeout_secs != default_stop_timeout_secs() {
            project_cfg.runtime.stop_timeout_secs
        } else {
            user.runtime.stop_timeout_secs
        };
    merged.launch.container_name = if project_cfg.launch.container_name != default_container_name()
    {
        project_cfg.launch.container_name
    } else {
        user.launch.container_name
    };
    merged.launch.profiles = if !project_cfg.launch.profiles.is_empty() {
        project_cfg.launch.profiles
    } else {
        user.launch.profiles
    };
    merged.launch.usb_privileged = project_cfg.launch.usb_privileged || user.launch.usb_privileged;
    merged.launch.environment = if !project_cfg.launch.environment.is_empty() {
        project_cfg.launch.environment
    } else {
        user.launch.environment
    };
    merged.launch.mounts = if !project_cfg.launch.mounts.is_empty() {
        project_cfg.launch.mounts
    } else {
        user.launch.mounts
    };
    merged.logs.directory = project_cfg.logs.directory.or(user.logs.directory);
    merged
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    debug!("Expanding paths in configuration...");
    if let Some(dir) = &mut config.logs.directory {
        *dir = shellexpand::tilde(dir.as_str()).into_owned();
        debug!("Expanded log directory: {}", dir);
    }
    for mount in &mut config.launch.mounts {
        mount.host = shellexpand::tilde(&mount.host).into_owned();
        debug!("Expanded mount host path: {}", mount.host);
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    info!("Validating final configuration...");
    if config.runtime.timeout_secs == 0 {
        return Err(anyhow!(DockerManagerError::Config(
            "runtime.timeout_secs must be greater than zero.".to_string()
        )));
    }
    if config.launch.container_name.trim().is_empty() {
        return Err(anyhow!(DockerManagerError::Config(
            "launch.container_name cannot be empty.".to_string()
        )));
    }
    if let Some(dir) = &config.logs.directory {
        let dir = PathBuf::from(dir);
        if !dir.exists() {
            warn!("Configured log directory '{}' does not exist.", dir.display());
        } else if !dir.is_dir() {
            return Err(anyhow!(DockerManagerError::Config(format!(
                "Configured log path '{}' exists but is not a directory.",
                dir.display()
            ))));
        }
    }
    for mount in &config.launch.mounts {
        if !Path::new(&mount.host).is_absolute() {
            return Err(anyhow!(DockerManagerError::Config(format!(
                "Mount host path '{}' must be absolute (container path: '{}').",
                mount.host, mount.container
            ))));
        }
        if !mount.container.starts_with('/') {
            return Err(anyhow!(DockerManagerError::Config(format!(
                "Mount container path '{}' must be absolute (host path: '{}').",
                mount.container, mount.host
            ))));
        }
    }
    info!("Configuration validation successful.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [catalog]
            parse_mode = "preserve"

            [runtime]
            timeout_secs = 30

            [launch]
            profiles = ["x11", "ros2"]

            [launch.environment]
            RMW_IMPLEMENTATION = "rmw_cyclonedds_cpp"

            [[launch.mounts]]
            host = "~/ws"
            container = "/ws"
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert_eq!(config.catalog.parse_mode, ParseMode::Preserve);
        assert_eq!(config.runtime.timeout_secs, 30);
        assert_eq!(config.runtime.retries, default_retries()); // Default
        assert_eq!(config.launch.container_name, "container"); // Default
        assert_eq!(config.launch.profiles, vec![Profile::X11, Profile::Ros2]);
        assert_eq!(
            config.launch.environment.get("RMW_IMPLEMENTATION").map(String::as_str),
            Some("rmw_cyclonedds_cpp")
        );
        assert_eq!(config.launch.mounts[0].host, "~/ws"); // Not yet expanded
        assert!(!config.launch.mounts[0].readonly);
        assert!(config.logs.directory.is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[launch]\nimage = \"ros\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = Config {
            logs: LogsConfig {
                directory: Some("~/logs".to_string()),
            },
            launch: LaunchConfig {
                mounts: vec![
                    MountConfig {
                        host: "~/ws".to_string(),
                        container: "/ws".to_string(),
                        readonly: false,
                    },
                    MountConfig {
                        host: "/absolute/path".to_string(),
                        container: "/abs".to_string(),
                        readonly: true,
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        };

        expand_config_paths(&mut config).unwrap();

        let home_dir = dirs::home_dir().unwrap();
        let expected_logs = home_dir.join("logs").to_string_lossy().into_owned();
        assert_eq!(config.logs.directory.as_deref(), Some(expected_logs.as_str()));
        assert_eq!(config.launch.mounts[0].host, home_dir.join("ws").to_string_lossy());
        assert_eq!(config.launch.mounts[1].host, "/absolute/path");
    }

    #[test]
    fn test_merge_prefers_project_values() {
        let user = Config {
            runtime: RuntimeConfig {
                timeout_secs: 60,
                ..Default::default()
            },
            launch: LaunchConfig {
                profiles: vec![Profile::Sudo],
                ..Default::default()
            },
            logs: LogsConfig {
                directory: Some("/var/log/containers".into()),
            },
            ..Default::default()
        };
        let project = Config {
            launch: LaunchConfig {
                container_name: "ros-dev".into(),
                profiles: vec![Profile::X11],
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = merge_configs(user, Some(project));
        assert_eq!(merged.runtime.timeout_secs, 60);
        assert_eq!(merged.launch.container_name, "ros-dev");
        assert_eq!(merged.launch.profiles, vec![Profile::X11]);
        assert_eq!(merged.logs.directory.as_deref(), Some("/var/log/containers"));
    }

    #[test]
    fn test_find_project_config_walks_up() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            find_project_config_path(&nested),
            Some(temp_dir.path().join(PROJECT_CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_find_project_config_stops_at_git() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();

        assert_eq!(find_project_config_path(&repo), None);
    }

    #[test]
    fn test_validate_config_valid() {
        let temp_dir = tempdir().unwrap();
        let config = Config {
            logs: LogsConfig {
                directory: Some(temp_dir.path().to_string_lossy().to_string()),
            },
            launch: LaunchConfig {
                mounts: vec![MountConfig {
                    host: "/host/path".into(),
                    container: "/container/path".into(),
                    readonly: false,
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_zero_timeout() {
        let config = Config {
            runtime: RuntimeConfig {
                timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("timeout_secs must be greater than zero"));
    }

    #[test]
    fn test_validate_config_relative_mount() {
        let config = Config {
            launch: LaunchConfig {
                mounts: vec![MountConfig {
                    host: "relative/path".into(),
                    container: "/code".into(),
                    readonly: false,
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config)
            .unwrap_err()
            .to_string()
            .contains("must be absolute"));
    }

    #[test]
    fn test_validate_config_log_path_is_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("not_a_dir");
        fs::write(&file_path, "").unwrap();

        let config = Config {
            logs: LogsConfig {
                directory: Some(file_path.to_string_lossy().to_string()),
            },
            ..Default::default()
        };
        assert!(validate_config(&config)
            .unwrap_err()
            .to_string()
            .contains("is not a directory"));
    }
}
