//! # Generic Options Fragments
//!
//! File: cli/src/common/options/fragment.rs
//!
//! An untyped view of run options: a tree of maps, lists and scalars. `merge_fragments`
//! is the composition rule every typed merge in this crate follows:
//!
//! - a key present in both sides whose update value is a map is merged recursively;
//! - any other update value (scalar, list, null) replaces the base value wholesale.
//!   Lists are never concatenated.
//!
//! Both inputs are taken by value and the merged tree is returned; neither caller-held
//! value is mutated.
//!
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Null,
    Bool(bool),
    String(String),
    List(Vec<Fragment>),
    Map(BTreeMap<String, Fragment>),
}

impl Fragment {
    /// Builds a map fragment from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Fragment)>,
    {
        Fragment::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&Fragment> {
        match self {
            Fragment::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// YAML-style lines. Maps nest by two spaces; lists and scalars stay on one line;
    /// null is `~`.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(0, &mut lines);
        lines
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match self {
            Fragment::Map(entries) => {
                for (key, value) in entries {
                    if let Fragment::Map(_) = value {
                        lines.push(format!("{}{}:", indent, key));
                        value.render_into(depth + 1, lines);
                    } else {
                        lines.push(format!("{}{}: {}", indent, key, value.inline()));
                    }
                }
            }
            other => lines.push(format!("{}{}", indent, other.inline())),
        }
    }

    fn inline(&self) -> String {
        match self {
            Fragment::Null => "~".to_string(),
            Fragment::Bool(value) => value.to_string(),
            Fragment::String(value) => value.clone(),
            Fragment::List(items) => {
                let items: Vec<String> = items.iter().map(Fragment::inline).collect();
                format!("[{}]", items.join(", "))
            }
            Fragment::Map(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.inline()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

impl From<&str> for Fragment {
    fn from(value: &str) -> Self {
        Fragment::String(value.to_string())
    }
}

impl From<String> for Fragment {
    fn from(value: String) -> Self {
        Fragment::String(value)
    }
}

impl From<Option<String>> for Fragment {
    fn from(value: Option<String>) -> Self {
        value.map_or(Fragment::Null, Fragment::String)
    }
}

impl From<bool> for Fragment {
    fn from(value: bool) -> Self {
        Fragment::Bool(value)
    }
}

/// Recursively merges `update` into `base`, the update winning on conflicts.
pub fn merge_fragments(base: Fragment, update: Fragment) -> Fragment {
    match (base, update) {
        (Fragment::Map(mut merged), Fragment::Map(update)) => {
            for (key, value) in update {
                let value = match (merged.remove(&key), value) {
                    (Some(existing), value @ Fragment::Map(_)) => merge_fragments(existing, value),
                    (_, value) => value,
                };
                merged.insert(key, value);
            }
            Fragment::Map(merged)
        }
        (_, update) => update,
    }
}
