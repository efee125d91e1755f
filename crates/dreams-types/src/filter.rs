//! Prefix-based path filtering shared by manifest building, bundling, and
//! upgrade ignore rules.
//!
//! Paths are compared after normalization: `\` becomes `/`, leading `./` and
//! `/` are stripped, and trailing `/` is removed. A path matches an entry when
//! it equals the entry or lives below it (`entry/...`). There is no glob or
//! regex support.

use serde::{Deserialize, Serialize};

/// Normalize a relative path to forward slashes with no leading `./` or `/`
/// and no trailing `/`.
pub fn normalize_path(path: &str) -> String {
    let mut cleaned = path.replace('\\', "/");
    loop {
        if let Some(rest) = cleaned.strip_prefix("./") {
            cleaned = rest.to_string();
        } else if let Some(rest) = cleaned.strip_prefix('/') {
            cleaned = rest.to_string();
        } else {
            break;
        }
    }
    while cleaned.ends_with('/') {
        cleaned.pop();
    }
    if cleaned == "." {
        cleaned.clear();
    }
    cleaned
}

/// Returns `true` if `path` equals `prefix` or lies below it as a directory.
///
/// An empty prefix (after normalization) matches every path.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    let path = normalize_path(path);
    let prefix = normalize_path(prefix);
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(&prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Returns `true` if `path` is matched by any entry of `exclude`.
pub fn is_excluded<S: AsRef<str>>(path: &str, exclude: &[S]) -> bool {
    exclude.iter().any(|entry| has_prefix(path, entry.as_ref()))
}

/// An include/exclude pair describing which part of a tree is tracked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFilter {
    /// Roots to walk. Empty means the whole tree.
    pub include: Vec<String>,
    /// Prefixes to skip.
    pub exclude: Vec<String>,
}

impl PathFilter {
    /// Create a filter from include and exclude lists.
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// A filter that tracks the whole tree.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Add an exclusion prefix.
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.exclude.push(prefix.into());
        self
    }

    /// Returns `true` if the path is excluded by this filter.
    pub fn excludes(&self, path: &str) -> bool {
        is_excluded(path, &self.exclude)
    }

    /// The normalized include roots. An empty root stands for the whole tree.
    pub fn include_roots(&self) -> Vec<String> {
        if self.include.is_empty() {
            return vec![String::new()];
        }
        let mut roots: Vec<String> = self.include.iter().map(|i| normalize_path(i)).collect();
        roots.dedup();
        roots
    }
}
