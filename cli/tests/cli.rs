//! # docker-manager Command Integration Tests
//!
//! File: cli/tests/cli.rs
//!
//! `options` and configuration handling run without Docker. The tests at the bottom
//! talk to a real daemon and are `#[ignore]`d; run them with
//! `cargo test -- --ignored` on a machine with Docker available.
//!

mod common;
use common::*;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_options_sudo_profile() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());

    isolated_cmd(dir.path())
        .args(["options", "--profile", "sudo", "--image", "ros:humble"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("docker run --detach --name container")
                .and(predicate::str::contains("--group-add sudo"))
                .and(predicate::str::contains("--volume /etc/passwd:/etc/passwd:ro"))
                .and(predicate::str::contains("--volume /etc/shadow:/etc/shadow "))
                .and(predicate::str::ends_with("ros:humble\n")),
        );
}

#[test]
fn test_options_ros2_keeps_unset_variables() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());

    isolated_cmd(dir.path())
        .env_remove("ROS_DOMAIN_ID")
        .env("ROS_LOCALHOST_ONLY", "1")
        .args(["options", "-p", "ros2"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--env ROS_DOMAIN_ID")
                .and(predicate::str::contains("--env ROS_DOMAIN_ID=").not())
                .and(predicate::str::contains("--env ROS_LOCALHOST_ONLY=1"))
                .and(predicate::str::contains("--env ROS_LOG_DIR=tmp/.ros")),
        );
}

#[test]
fn test_options_tree_output() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());

    isolated_cmd(dir.path())
        .env_remove("ROS_DOMAIN_ID")
        .env_remove("ROS_LOCALHOST_ONLY")
        .args(["options", "-p", "ros2", "-p", "usb", "--tree"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("environment:\n")
                .and(predicate::str::contains("  ROS_DOMAIN_ID: ~\n"))
                .and(predicate::str::contains("  ROS_LOG_DIR: tmp/.ros\n"))
                .and(predicate::str::contains("tty: true\n"))
                .and(predicate::str::contains("privileged").not()),
        );
}

#[test]
fn test_options_usb_privileged_only_when_asked() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());

    isolated_cmd(dir.path())
        .args(["options", "-p", "usb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tty").and(predicate::str::contains("--privileged").not()));

    isolated_cmd(dir.path())
        .args(["options", "-p", "usb", "--usb-privileged"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--privileged"));
}

#[test]
fn test_options_reads_project_config() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    std::fs::write(
        dir.path().join(".docker-manager.toml"),
        r#"
[launch]
container_name = "robot"
profiles = ["usb"]

[launch.environment]
RMW_IMPLEMENTATION = "rmw_cyclonedds_cpp"

[[launch.mounts]]
host = "/opt/data"
container = "/data"
readonly = true
"#,
    )
    .unwrap();

    isolated_cmd(dir.path())
        .arg("options")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--name robot")
                .and(predicate::str::contains("--volume /dev:/dev"))
                .and(predicate::str::contains("--volume /opt/data:/data:ro"))
                .and(predicate::str::contains("--env RMW_IMPLEMENTATION=rmw_cyclonedds_cpp")),
        );
}

#[test]
fn test_invalid_project_config_fails() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    std::fs::write(
        dir.path().join(".docker-manager.toml"),
        "[runtime]\ntimeout_secs = 0\n",
    )
    .unwrap();

    isolated_cmd(dir.path())
        .arg("options")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    std::fs::write(
        dir.path().join(".docker-manager.toml"),
        "[launch]\nimage = \"ros\"\n",
    )
    .unwrap();

    isolated_cmd(dir.path()).arg("options").assert().failure();
}

#[test]
#[ignore]
fn test_images_against_daemon() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    isolated_cmd(dir.path()).arg("images").assert().success();
}

#[test]
#[ignore]
fn test_tags_pulls_missing_image() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    isolated_cmd(dir.path())
        .args(["tags", "hello-world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest"));
}

#[test]
#[ignore]
fn test_run_status_stop_cycle() {
    let dir = tempdir().unwrap();
    mark_repo_root(dir.path());
    let logs = dir.path().join("logs");
    std::fs::create_dir_all(&logs).unwrap();

    isolated_cmd(dir.path())
        .args(["run", "--image", "alpine", "--name", "docker-manager-it"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docker-manager-it"));

    isolated_cmd(dir.path())
        .args(["status", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docker-manager-it"));

    isolated_cmd(dir.path())
        .args(["stop", "--save-logs"])
        .arg(&logs)
        .assert()
        .success();
    assert!(std::fs::read_dir(&logs).unwrap().next().is_some());
}
