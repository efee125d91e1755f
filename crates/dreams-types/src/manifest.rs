//! The content manifest: a snapshot of a tree as relative path → fingerprint.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::filter::normalize_path;
use crate::fingerprint::Fingerprint;

/// Relative path → content fingerprint mapping describing a tree.
///
/// Keys are normalized to forward slashes on insert. The map is ordered so
/// iteration and everything rendered from it are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentManifest {
    entries: BTreeMap<String, Fingerprint>,
}

impl ContentManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Track a file, replacing any previous fingerprint for the same path.
    pub fn insert(&mut self, path: &str, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(normalize_path(path), fingerprint)
    }

    /// Get the fingerprint of a path.
    pub fn get(&self, path: &str) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    /// Returns `true` if the path is tracked.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Stop tracking a path.
    pub fn remove(&mut self, path: &str) -> Option<Fingerprint> {
        self.entries.remove(path)
    }

    /// Iterate over tracked paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(path, fingerprint)` pairs in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Fingerprint> {
        self.entries.iter()
    }

    /// Drop every entry whose file no longer exists under `root`.
    ///
    /// Returns the number of dropped entries. This is how a cached manifest
    /// is brought back in line with the live tree before use.
    pub fn retain_existing(&mut self, root: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| root.join(path).is_file());
        before - self.entries.len()
    }
}

impl FromIterator<(String, Fingerprint)> for ContentManifest {
    fn from_iter<I: IntoIterator<Item = (String, Fingerprint)>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for (path, fp) in iter {
            manifest.insert(&path, fp);
        }
        manifest
    }
}

impl IntoIterator for ContentManifest {
    type Item = (String, Fingerprint);
    type IntoIter = btree_map::IntoIter<String, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ContentManifest {
    type Item = (&'a String, &'a Fingerprint);
    type IntoIter = btree_map::Iter<'a, String, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
