//! Translation of `RunOptions` into the `bollard` create-container request.
//!
//! | `RunOptions`  | Request field             |
//! |---------------|---------------------------|
//! | `user`        | `Config.user`             |
//! | `group_add`   | `HostConfig.group_add`    |
//! | `volumes`     | `HostConfig.binds`        |
//! | `environment` | `Config.env`              |
//! | `tty`         | `Config.tty`              |
//! | `privileged`  | `HostConfig.privileged`   |
//!
use crate::common::options::RunOptions;
use bollard::container::Config;
use bollard::models::HostConfig;

/// Builds the create request for a detached container of `image`.
///
/// Stdin, stdout and stderr are never attached. Options left unset in `options` stay
/// unset in the request so the daemon applies its own defaults.
///
/// # Arguments
///
/// * `image` - The full image reference, e.g. `ros:humble`.
/// * `options` - The composed launch options.
///
/// # Returns
///
/// * `Config<String>` - The body for `Docker::create_container`.
pub fn container_config(image: &str, options: &RunOptions) -> Config<String> {
    let binds = options.bind_list();
    let env = options.env_list();

    let host_config = HostConfig {
        binds: (!binds.is_empty()).then_some(binds),
        group_add: options.group_add.clone(),
        privileged: options.privileged,
        ..Default::default()
    };

    Config {
        image: Some(image.to_string()),
        user: options.user.clone(),
        env: (!env.is_empty()).then_some(env),
        tty: options.tty,
        attach_stdin: Some(false),
        attach_stdout: Some(false),
        attach_stderr: Some(false),
        host_config: Some(host_config),
        ..Default::default()
    }
}
