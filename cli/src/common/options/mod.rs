//! # docker-manager Run Options
//!
//! File: cli/src/common/options/mod.rs
//!
//! ## Overview
//!
//! `RunOptions` is the typed bundle of container launch settings handed to the
//! runtime's create/start call: user identity, supplementary groups, bind mounts,
//! environment variables and the `tty`/`privileged` flags. Options come from small
//! producers (see `profiles`) and from configuration, and are combined with
//! `RunOptions::merge`.
//!
//! ## Architecture
//!
//! - **`RunOptions`**: named optional fields. `None` (or an empty map) means "not set by
//!   this fragment", so merging it changes nothing.
//! - **`VolumeBind`** / **`BindMode`**: container path and optional access mode of a
//!   bind mount, keyed by host path.
//! - **`fragment`**: the untyped `Fragment` tree and `merge_fragments`.
//!   `RunOptions::to_fragment` maps typed options onto it; the typed merge gives the
//!   same result as the untyped one.
//! - **`profiles`**: producers for the common launch scenarios.
//!
//! ```rust
//! let options = profiles::compose(&[Profile::Sudo, Profile::X11], false)?
//!     .merge(RunOptions::from(&cfg.launch));
//! println!("docker run {}", options.docker_args().join(" "));
//! ```
//!
use crate::core::config::LaunchConfig;
use std::collections::BTreeMap;

pub mod fragment;
pub mod profiles;

pub use fragment::{merge_fragments, Fragment};

/// Access mode of a bind mount. An absent mode leaves Docker's default (read-write).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    ReadOnly,
    ReadWrite,
}

impl BindMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BindMode::ReadOnly => "ro",
            BindMode::ReadWrite => "rw",
        }
    }
}

/// Where a host path appears inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub bind: String,
    pub mode: Option<BindMode>,
}

impl VolumeBind {
    /// Binds at `path` with no explicit mode.
    pub fn same_path(path: &str) -> Self {
        Self {
            bind: path.to_string(),
            mode: None,
        }
    }

    pub fn read_only(path: &str) -> Self {
        Self {
            bind: path.to_string(),
            mode: Some(BindMode::ReadOnly),
        }
    }

    fn merge(self, update: VolumeBind) -> VolumeBind {
        VolumeBind {
            bind: update.bind,
            mode: update.mode.or(self.mode),
        }
    }

    /// `host:bind[:mode]`, the Docker `Binds` syntax.
    pub fn bind_spec(&self, host: &str) -> String {
        match self.mode {
            Some(mode) => format!("{}:{}:{}", host, self.bind, mode.as_str()),
            None => format!("{}:{}", host, self.bind),
        }
    }
}

/// Container launch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// `uid:gid` (or a user name) the container process runs as.
    pub user: Option<String>,
    /// Supplementary groups for the container user.
    pub group_add: Option<Vec<String>>,
    /// Host path to bind spec.
    pub volumes: BTreeMap<String, VolumeBind>,
    /// Variable name to value. `None` means the host had no value.
    pub environment: BTreeMap<String, Option<String>>,
    pub tty: Option<bool>,
    pub privileged: Option<bool>,
}

impl RunOptions {
    /// Combines two option sets, `update` winning on conflict.
    ///
    /// Volumes and environment merge key by key (a volume present on both sides keeps
    /// the base mode unless the update sets one). Scalar and list fields set in
    /// `update` replace the base value entirely.
    pub fn merge(mut self, update: RunOptions) -> RunOptions {
        if update.user.is_some() {
            self.user = update.user;
        }
        if update.group_add.is_some() {
            self.group_add = update.group_add;
        }
        if update.tty.is_some() {
            self.tty = update.tty;
        }
        if update.privileged.is_some() {
            self.privileged = update.privileged;
        }
        for (host, bind) in update.volumes {
            let bind = match self.volumes.remove(&host) {
                Some(existing) => existing.merge(bind),
                None => bind,
            };
            self.volumes.insert(host, bind);
        }
        self.environment.extend(update.environment);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == RunOptions::default()
    }

    /// The untyped fragment tree for these options.
    pub fn to_fragment(&self) -> Fragment {
        let mut entries = BTreeMap::new();
        if let Some(user) = &self.user {
            entries.insert("user".to_string(), Fragment::from(user.as_str()));
        }
        if let Some(groups) = &self.group_add {
            let groups = groups.iter().map(|g| Fragment::from(g.as_str())).collect();
            entries.insert("group_add".to_string(), Fragment::List(groups));
        }
        if !self.volumes.is_empty() {
            let volumes = self.volumes.iter().map(|(host, bind)| {
                let mut spec = vec![("bind", Fragment::from(bind.bind.as_str()))];
                if let Some(mode) = bind.mode {
                    spec.push(("mode", Fragment::from(mode.as_str())));
                }
                (host.clone(), Fragment::map(spec))
            });
            entries.insert("volumes".to_string(), Fragment::map(volumes));
        }
        if !self.environment.is_empty() {
            let environment = self
                .environment
                .iter()
                .map(|(name, value)| (name.clone(), Fragment::from(value.clone())));
            entries.insert("environment".to_string(), Fragment::map(environment));
        }
        if let Some(tty) = self.tty {
            entries.insert("tty".to_string(), Fragment::Bool(tty));
        }
        if let Some(privileged) = self.privileged {
            entries.insert("privileged".to_string(), Fragment::Bool(privileged));
        }
        Fragment::Map(entries)
    }

    /// Renders the options as `docker run` flags.
    pub fn docker_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(user) = &self.user {
            args.extend(["--user".to_string(), user.clone()]);
        }
        for group in self.group_add.iter().flatten() {
            args.extend(["--group-add".to_string(), group.clone()]);
        }
        for (host, bind) in &self.volumes {
            args.extend(["--volume".to_string(), bind.bind_spec(host)]);
        }
        for entry in self.env_list() {
            args.extend(["--env".to_string(), entry]);
        }
        if self.tty == Some(true) {
            args.push("--tty".to_string());
        }
        if self.privileged == Some(true) {
            args.push("--privileged".to_string());
        }
        args
    }

    /// Environment as Docker `KEY=VALUE` strings. A missing value becomes the bare
    /// `KEY`, which leaves the variable unset in the container.
    pub fn env_list(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{}={}", name, value),
                None => name.clone(),
            })
            .collect()
    }

    /// `host:bind[:mode]` strings for every volume.
    pub fn bind_list(&self) -> Vec<String> {
        self.volumes
            .iter()
            .map(|(host, bind)| bind.bind_spec(host))
            .collect()
    }
}

impl From<&LaunchConfig> for RunOptions {
    fn from(launch: &LaunchConfig) -> Self {
        let volumes = launch
            .mounts
            .iter()
            .map(|mount| {
                let bind = VolumeBind {
                    bind: mount.container.clone(),
                    mode: mount.readonly.then_some(BindMode::ReadOnly),
                };
                (mount.host.clone(), bind)
            })
            .collect();
        let environment = launch
            .environment
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect();
        RunOptions {
            volumes,
            environment,
            ..Default::default()
        }
    }
}
