//! # docker-manager Image Catalog
//!
//! File: cli/src/common/catalog.rs
//!
//! ## Overview
//!
//! Turns the Docker daemon's image listing into a queryable mapping from repository
//! name to the set of tags known for it. Every image carries zero or more
//! `repository:tag` strings; each one contributes a single tag to a single repository.
//!
//! ## Architecture
//!
//! - **`ImageRecord`**: anything that exposes `repo:tag` strings (bollard's
//!   `ImageSummary` from a listing, `ImageInspect` from a pull, or a plain `Vec<String>`).
//! - **`ParseMode`**: how a tag string is split into repository and tag.
//! - **`build_catalog_entry`**: the per-image catalog fragment.
//! - **`Catalog`**: the grow-only map. `merge` unions an entry into it.
//! - **`SharedCatalog`**: `Arc<RwLock<Catalog>>` so pull completions coming from the
//!   session worker merge safely.
//!
//! ## Splitting
//!
//! In `compat` mode the text after the last `:` is the tag and every preceding segment
//! is concatenated *without* its colons. A registry with a port (`host:5000/app:1`)
//! therefore ends up under the repository `host5000/app`. A string with no colon at all
//! lands under the empty repository `""` with the whole string as tag. Both quirks are
//! kept on purpose; `reject` and `preserve` are the strict alternatives.
//!
//! ```rust
//! let mut catalog = Catalog::new();
//! for image in runtime.list_images().await? {
//!     catalog.merge(build_catalog_entry(&image, ParseMode::Compat)?);
//! }
//! if let Some(tags) = catalog.tags("ros") {
//!     println!("{:?}", tags);
//! }
//! ```
//!
use crate::core::error::{DockerManagerError, Result};
use anyhow::anyhow;
use bollard::models::{ImageInspect, ImageSummary};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// A container image as reported by the runtime, reduced to its `repo:tag` strings.
pub trait ImageRecord {
    fn tag_strings(&self) -> &[String];
}

impl ImageRecord for ImageSummary {
    fn tag_strings(&self) -> &[String] {
        &self.repo_tags
    }
}

impl ImageRecord for ImageInspect {
    fn tag_strings(&self) -> &[String] {
        self.repo_tags.as_deref().unwrap_or(&[])
    }
}

impl ImageRecord for Vec<String> {
    fn tag_strings(&self) -> &[String] {
        self
    }
}

/// How a `repository:tag` string is split.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Colons before the final tag separator are dropped from the repository name.
    #[default]
    Compat,
    /// Tag strings without a separator, or with a colon in the repository part, are errors.
    Reject,
    /// Colons before the final tag separator are kept in the repository name.
    Preserve,
}

/// Splits one tag string into `(repository, tag)` according to `mode`.
pub fn split_tag(tag: &str, mode: ParseMode) -> Result<(String, String)> {
    let Some((repo, tag_name)) = tag.rsplit_once(':') else {
        if mode == ParseMode::Reject {
            return Err(anyhow!(DockerManagerError::MalformedTag {
                tag: tag.to_string(),
                reason: "no ':' tag separator".into(),
            }));
        }
        return Ok((String::new(), tag.to_string()));
    };

    let repository = match mode {
        ParseMode::Compat => repo.replace(':', ""),
        ParseMode::Preserve => repo.to_string(),
        ParseMode::Reject if repo.contains(':') => {
            return Err(anyhow!(DockerManagerError::MalformedTag {
                tag: tag.to_string(),
                reason: "repository name contains ':'".into(),
            }));
        }
        ParseMode::Reject => repo.to_string(),
    };
    Ok((repository, tag_name.to_string()))
}

/// The catalog key a user-typed repository name is filed under in `mode`.
///
/// `localhost:5000/app` is stored as `localhost5000/app` in `Compat` mode, so queries
/// go through the same flattening as `split_tag`.
pub fn repository_key(name: &str, mode: ParseMode) -> String {
    match mode {
        ParseMode::Compat => name.replace(':', ""),
        ParseMode::Preserve | ParseMode::Reject => name.to_string(),
    }
}

/// Mapping from repository name to the set of known tags.
///
/// A repository is present iff at least one tag for it has been observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: HashMap<String, BTreeSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog by scanning every image in `images`.
    pub fn from_images<'a, I, R>(images: I, mode: ParseMode) -> Result<Self>
    where
        I: IntoIterator<Item = &'a R>,
        R: ImageRecord + ?Sized + 'a,
    {
        let mut catalog = Self::new();
        for image in images {
            catalog.merge(build_catalog_entry(image, mode)?);
        }
        debug!("Catalog built with {} repositories.", catalog.len());
        Ok(catalog)
    }

    pub fn insert(&mut self, repository: impl Into<String>, tag: impl Into<String>) {
        self.entries
            .entry(repository.into())
            .or_default()
            .insert(tag.into());
    }

    /// Unions `entry` into this catalog. Existing tags are never removed.
    pub fn merge(&mut self, entry: Catalog) {
        for (repository, tags) in entry.entries {
            trace!("Merging {} tag(s) for '{}'", tags.len(), repository);
            self.entries.entry(repository).or_default().extend(tags);
        }
    }

    /// Consuming form of [`Catalog::merge`].
    pub fn merged(mut self, entry: Catalog) -> Self {
        self.merge(entry);
        self
    }

    pub fn tags(&self, repository: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(repository)
    }

    pub fn contains(&self, repository: &str) -> bool {
        self.entries.contains_key(repository)
    }

    /// Repository names, sorted.
    pub fn repositories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the catalog fragment contributed by a single image.
///
/// An image without tags contributes an empty catalog. Only the strict parse modes can
/// fail.
pub fn build_catalog_entry<R: ImageRecord + ?Sized>(image: &R, mode: ParseMode) -> Result<Catalog> {
    let mut entry = Catalog::new();
    for tag in image.tag_strings() {
        let (repository, tag_name) = split_tag(tag, mode)?;
        entry.insert(repository, tag_name);
    }
    Ok(entry)
}

/// A catalog shared between the session worker tasks.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Catalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalog)),
        }
    }

    pub async fn merge(&self, entry: Catalog) {
        self.inner.write().await.merge(entry);
    }

    pub async fn tags(&self, repository: &str) -> Option<BTreeSet<String>> {
        self.inner.read().await.tags(repository).cloned()
    }

    pub async fn snapshot(&self) -> Catalog {
        self.inner.read().await.clone()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::is_kind;

    #[test]
    fn test_repository_key_matches_split_tag() {
        let (compat, _) = split_tag("localhost:5000/app:1", ParseMode::Compat).unwrap();
        assert_eq!(repository_key("localhost:5000/app", ParseMode::Compat), compat);

        let (preserved, _) = split_tag("localhost:5000/app:1", ParseMode::Preserve).unwrap();
        assert_eq!(repository_key("localhost:5000/app", ParseMode::Preserve), preserved);
        assert_eq!(repository_key("ros", ParseMode::Reject), "ros");
    }

    fn image(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_entry_groups_tags_by_repository() {
        let catalog =
            build_catalog_entry(&image(&["a:1", "a:2", "b:3"]), ParseMode::Compat).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tags("a"), Some(&set(&["1", "2"])));
        assert_eq!(catalog.tags("b"), Some(&set(&["3"])));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = build_catalog_entry(&image(&["ros:humble"]), ParseMode::Compat).unwrap();
        let entry =
            build_catalog_entry(&image(&["ros:iron", "ubuntu:22.04"]), ParseMode::Compat).unwrap();

        let once = base.clone().merged(entry.clone());
        let twice = once.clone().merged(entry);
        assert_eq!(once, twice);
        assert_eq!(twice.tags("ros"), Some(&set(&["humble", "iron"])));
    }

    #[test]
    fn test_untagged_image_leaves_catalog_unchanged() {
        let mut catalog = build_catalog_entry(&image(&["a:1"]), ParseMode::Compat).unwrap();
        let before = catalog.clone();

        let entry = build_catalog_entry(&image(&[]), ParseMode::Compat).unwrap();
        assert!(entry.is_empty());
        catalog.merge(entry);
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_compat_mode_flattens_registry_port() {
        let (repo, tag) = split_tag("localhost:5000/app:1.2", ParseMode::Compat).unwrap();
        assert_eq!(repo, "localhost5000/app");
        assert_eq!(tag, "1.2");
    }

    #[test]
    fn test_compat_mode_without_separator() {
        let (repo, tag) = split_tag("scratch", ParseMode::Compat).unwrap();
        assert_eq!(repo, "");
        assert_eq!(tag, "scratch");
    }

    #[test]
    fn test_preserve_mode_keeps_colons() {
        let (repo, tag) = split_tag("localhost:5000/app:1.2", ParseMode::Preserve).unwrap();
        assert_eq!(repo, "localhost:5000/app");
        assert_eq!(tag, "1.2");
    }

    #[test]
    fn test_reject_mode_errors() {
        let err = split_tag("localhost:5000/app:1.2", ParseMode::Reject).unwrap_err();
        assert!(is_kind(&err, |e| matches!(
            e,
            DockerManagerError::MalformedTag { .. }
        )));
        assert!(split_tag("scratch", ParseMode::Reject).is_err());
        assert_eq!(
            split_tag("ros:humble", ParseMode::Reject).unwrap(),
            ("ros".to_string(), "humble".to_string())
        );
    }

    #[test]
    fn test_from_images_with_bollard_summaries() {
        let images = vec![
            ImageSummary {
                repo_tags: image(&["ros:humble", "ros:latest"]),
                ..Default::default()
            },
            ImageSummary::default(),
        ];
        let catalog = Catalog::from_images(&images, ParseMode::Compat).unwrap();
        assert_eq!(catalog.repositories(), vec!["ros"]);
        assert_eq!(catalog.tags("ros"), Some(&set(&["humble", "latest"])));
    }

    #[test]
    fn test_inspect_without_tags_is_empty() {
        let inspect = ImageInspect::default();
        assert!(inspect.tag_strings().is_empty());
    }

    #[tokio::test]
    async fn test_shared_catalog_concurrent_merges() {
        let shared = SharedCatalog::default();
        let mut handles = Vec::new();
        for i in 0..8 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let tag = format!("app:{}", i);
                let entry = build_catalog_entry(&vec![tag], ParseMode::Compat).unwrap();
                shared.merge(entry).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(shared.tags("app").await.map(|t| t.len()), Some(8));
    }
}
