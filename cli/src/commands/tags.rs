//! # docker-manager tags
//!
//! File: cli/src/commands/tags.rs
//!
//! Prints every tag known for an image, one per line. An image the daemon does not
//! have locally is pulled (tag `latest` unless one is given) and added to the catalog
//! first.
//!
use crate::{
    commands::open_session,
    common::{
        catalog::ParseMode,
        session::{Outcome, Request},
    },
    core::{config, error::Result},
};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "List the tags of an image, pulling it if it is not present")]
pub struct TagsArgs {
    /// Repository name, optionally with a tag to pull (e.g. `ros` or `ros:jazzy`).
    pub image: String,

    #[arg(long, value_enum)]
    pub parse_mode: Option<ParseMode>,
}

pub async fn handle_tags(args: TagsArgs) -> Result<()> {
    info!("Handling tags command for '{}'", args.image);
    let cfg = config::load_config().context("Failed to load docker-manager configuration")?;
    let mut session = open_session(&cfg, args.parse_mode).await?;

    session.execute(Request::RefreshCatalog).await?;
    let outcome = session
        .execute(Request::LookupTags {
            image: args.image.clone(),
        })
        .await
        .with_context(|| format!("Failed to look up tags for '{}'", args.image))?;

    if let Outcome::Tags { tags, .. } = outcome {
        for tag in tags {
            println!("{}", tag);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_args_parsing() {
        let args = TagsArgs::try_parse_from(["tags", "ros:jazzy"]).unwrap();
        assert_eq!(args.image, "ros:jazzy");
        assert!(TagsArgs::try_parse_from(["tags"]).is_err());
    }
}
