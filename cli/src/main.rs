//! # docker-manager Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `docker-manager` CLI. It:
//! - parses command-line arguments with Clap
//! - sets up `tracing` output according to `-v` (or `RUST_LOG`)
//! - dispatches to the handler of the chosen subcommand
//! - prints any error and exits with status 1
//!
//! ## Examples
//!
//! ```bash
//! # What images are there, and which tags does `ros` have?
//! docker-manager images
//! docker-manager tags ros
//!
//! # Start a ROS 2 container with GUI access, more logging
//! docker-manager -vv run --image ros --tag humble -p x11 -p ros2
//!
//! # Tear everything down, keeping the logs
//! docker-manager stop --save-logs ~/logs
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // One module per subcommand
mod common; // Catalog, launch options, Docker runtime, session
mod core; // Errors and configuration

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "docker-manager",
    about = "Browse local Docker images and launch containers with composed run options",
    long_about = "Lists local images by repository and tag, pulls missing ones on demand,\n\
                  and starts or stops containers with launch profiles for X11, ROS 2,\n\
                  USB devices and host user identity.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "i")]
    Images(commands::images::ImagesArgs),
    Tags(commands::tags::TagsArgs),
    Run(commands::run::RunArgs),
    Stop(commands::stop::StopArgs),
    #[command(alias = "ps")]
    Status(commands::status::StatusArgs),
    Options(commands::options::OptionsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Images(args) => commands::images::handle_images(args).await,
        Commands::Tags(args) => commands::tags::handle_tags(args).await,
        Commands::Run(args) => commands::run::handle_run(args).await,
        Commands::Stop(args) => commands::stop::handle_stop(args).await,
        Commands::Status(args) => commands::status::handle_status(args).await,
        Commands::Options(args) => commands::options::handle_options(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_count_is_global() {
        let cli = Cli::try_parse_from(["docker-manager", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::try_parse_from(["docker-manager", "ps", "--all"]).unwrap();
        assert!(matches!(cli.command, Commands::Status(ref a) if a.all));
        let cli = Cli::try_parse_from(["docker-manager", "i"]).unwrap();
        assert!(matches!(cli.command, Commands::Images(_)));
    }
}
