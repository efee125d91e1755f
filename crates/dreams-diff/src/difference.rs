//! Set-difference between two content manifests.

use std::collections::BTreeSet;

use dreams_types::{ChangeKind, ContentManifest};
use serde::Serialize;

use crate::patchnote::{format_patchnote, PatchnoteStyle};

/// Version label used when a release descriptor is unavailable.
pub const UNKNOWN_VERSION: &str = "?";

/// The difference between an old and a new manifest.
///
/// The three path sets are disjoint by construction. They are not exposed
/// mutably: the only edits allowed are removals ([`exclude`]) and moving a
/// path into `modified` ([`force_modified`]), both of which keep the sets
/// disjoint. Clone before editing to keep the original for auditing.
///
/// [`exclude`]: ContentDifference::exclude
/// [`force_modified`]: ContentDifference::force_modified
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentDifference {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    modified: BTreeSet<String>,
    old_version: String,
    new_version: String,
}

impl Default for ContentDifference {
    fn default() -> Self {
        Self {
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            modified: BTreeSet::new(),
            old_version: UNKNOWN_VERSION.to_string(),
            new_version: UNKNOWN_VERSION.to_string(),
        }
    }
}

/// Compute the difference between `old` and `new`.
///
/// A path only in `new` is added, only in `old` is removed, and in both with
/// unequal fingerprints is modified. Version labels start as
/// [`UNKNOWN_VERSION`].
pub fn diff(old: &ContentManifest, new: &ContentManifest) -> ContentDifference {
    let mut result = ContentDifference::default();

    for (path, old_fp) in old {
        match new.get(path) {
            Some(new_fp) if new_fp != old_fp => {
                result.modified.insert(path.clone());
            }
            Some(_) => {}
            None => {
                result.removed.insert(path.clone());
            }
        }
    }

    for path in new.paths() {
        if !old.contains(path) {
            result.added.insert(path.to_string());
        }
    }

    result
}

impl ContentDifference {
    /// An empty difference with unknown versions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach version labels. `None` keeps [`UNKNOWN_VERSION`].
    pub fn with_versions(mut self, old: Option<&str>, new: Option<&str>) -> Self {
        self.set_old_version(old);
        self.set_new_version(new);
        self
    }

    /// Set the old version label. `None` resets it to [`UNKNOWN_VERSION`].
    pub fn set_old_version(&mut self, version: Option<&str>) {
        self.old_version = version.unwrap_or(UNKNOWN_VERSION).to_string();
    }

    /// Set the new version label. `None` resets it to [`UNKNOWN_VERSION`].
    pub fn set_new_version(&mut self, version: Option<&str>) {
        self.new_version = version.unwrap_or(UNKNOWN_VERSION).to_string();
    }

    pub fn old_version(&self) -> &str {
        &self.old_version
    }

    pub fn new_version(&self) -> &str {
        &self.new_version
    }

    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    /// The path set of one category.
    pub fn paths(&self, kind: ChangeKind) -> &BTreeSet<String> {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
            ChangeKind::Modified => &self.modified,
        }
    }

    fn paths_mut(&mut self, kind: ChangeKind) -> &mut BTreeSet<String> {
        match kind {
            ChangeKind::Added => &mut self.added,
            ChangeKind::Removed => &mut self.removed,
            ChangeKind::Modified => &mut self.modified,
        }
    }

    /// The category a path falls in, if it changed at all.
    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        ChangeKind::ALL
            .into_iter()
            .find(|kind| self.paths(*kind).contains(path))
    }

    /// Paths added or removed: the structural part of the change.
    pub fn structural_paths(&self) -> impl Iterator<Item = &str> {
        self.added.iter().chain(self.removed.iter()).map(String::as_str)
    }

    /// Paths whose new content must be fetched: added and modified.
    pub fn incoming_paths(&self) -> impl Iterator<Item = &str> {
        self.added.iter().chain(self.modified.iter()).map(String::as_str)
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Remove `path` from the given categories. Returns `true` if it was
    /// present in any of them.
    pub fn exclude(&mut self, path: &str, kinds: &[ChangeKind]) -> bool {
        let mut found = false;
        for kind in kinds {
            found |= self.paths_mut(*kind).remove(path);
        }
        found
    }

    /// Remove `path` from every category.
    pub fn exclude_all(&mut self, path: &str) -> bool {
        self.exclude(path, &ChangeKind::ALL)
    }

    /// Make sure `path` is rewritten on upgrade, whatever its current state.
    ///
    /// The path is taken out of `added` and `removed` and put in `modified`.
    /// An overwrite creates the file when the target lacks it, so this is how
    /// files that must always be refreshed (the sidecar, the version checker)
    /// are carried along.
    pub fn force_modified(&mut self, path: &str) {
        self.added.remove(path);
        self.removed.remove(path);
        self.modified.insert(path.to_string());
    }

    /// Render the difference as a patchnote.
    pub fn patchnote(&self, style: PatchnoteStyle, indent: usize) -> String {
        format_patchnote(self, style, indent)
    }
}
