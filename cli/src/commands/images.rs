//! # docker-manager images
//!
//! File: cli/src/commands/images.rs
//!
//! Scans the daemon's images and prints the catalog, one repository per line with
//! its tags.
//!
//! ```bash
//! docker-manager images
//! docker-manager images --parse-mode preserve
//! ```
//!
use crate::{
    commands::open_session,
    common::{
        catalog::{Catalog, ParseMode},
        session::Request,
    },
    core::{config, error::Result},
};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "List local images grouped by repository")]
pub struct ImagesArgs {
    /// How `repository:tag` strings are split (overrides `[catalog] parse_mode`).
    #[arg(long, value_enum)]
    pub parse_mode: Option<ParseMode>,
}

pub async fn handle_images(args: ImagesArgs) -> Result<()> {
    info!("Handling images command");
    let cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    let mut session = open_session(&cfg, args.parse_mode).await?;

    session
        .execute(Request::RefreshCatalog)
        .await
        .context("Failed to build the image catalog")?;
    let catalog = session.catalog().snapshot().await;

    for line in catalog_lines(&catalog) {
        println!("{}", line);
    }
    Ok(())
}

/// `repository: tag, tag` lines in repository order. The empty repository is shown as
/// `<none>`.
fn catalog_lines(catalog: &Catalog) -> Vec<String> {
    if catalog.is_empty() {
        return vec!["No tagged images found.".to_string()];
    }
    catalog
        .repositories()
        .into_iter()
        .map(|repository| {
            let tags = catalog
                .tags(repository)
                .map(|tags| tags.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            let shown = if repository.is_empty() { "<none>" } else { repository };
            format!("{}: {}", shown, tags)
        })
        .collect()
}
