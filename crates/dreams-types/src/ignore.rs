//! Application-time ignore rules.
//!
//! Ignore rules never influence how a difference is computed. They only decide
//! which entries of an already computed difference the upgrade step acts on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::is_excluded;

/// Category of a change between two manifests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// All categories, in application order.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Removed, ChangeKind::Modified];

    /// Single-character marker used in patchnotes.
    pub fn symbol(self) -> char {
        match self {
            ChangeKind::Added => '+',
            ChangeKind::Removed => '-',
            ChangeKind::Modified => '~',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// Prefix lists excluding paths from the upgrade, globally or per category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Prefixes skipped for every category.
    pub global: Vec<String>,
    /// Prefixes skipped when adding files.
    pub added: Vec<String>,
    /// Prefixes skipped when removing files.
    pub removed: Vec<String>,
    /// Prefixes skipped when overwriting modified files.
    pub modified: Vec<String>,
}

impl IgnoreRules {
    /// Rules that ignore nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` if no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// The category-specific list.
    pub fn for_kind(&self, kind: ChangeKind) -> &[String] {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
            ChangeKind::Modified => &self.modified,
        }
    }

    /// Returns `true` if `path` must be left alone for the given category.
    pub fn ignores(&self, kind: ChangeKind, path: &str) -> bool {
        is_excluded(path, &self.global) || is_excluded(path, self.for_kind(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> IgnoreRules {
        IgnoreRules {
            global: vec!["options.txt".into()],
            added: vec!["resourcepacks".into()],
            removed: vec!["config".into()],
            modified: vec!["config/user".into()],
        }
    }

    #[test]
    fn global_rules_apply_to_every_category() {
        let r = rules();
        for kind in ChangeKind::ALL {
            assert!(r.ignores(kind, "options.txt"), "{kind} should ignore options.txt");
        }
    }

    #[test]
    fn category_rules_are_scoped() {
        let r = rules();
        assert!(r.ignores(ChangeKind::Removed, "config/a.toml"));
        assert!(!r.ignores(ChangeKind::Added, "config/a.toml"));
        assert!(r.ignores(ChangeKind::Modified, "config/user/keys.toml"));
        assert!(!r.ignores(ChangeKind::Modified, "config/server.toml"));
        assert!(r.ignores(ChangeKind::Added, "resourcepacks/pack.zip"));
    }

    #[test]
    fn empty_rules_ignore_nothing() {
        let r = IgnoreRules::none();
        assert!(r.is_empty());
        assert!(!r.ignores(ChangeKind::Added, "mods/a.jar"));
    }

    #[test]
    fn symbols() {
        assert_eq!(ChangeKind::Added.symbol(), '+');
        assert_eq!(ChangeKind::Removed.symbol(), '-');
        assert_eq!(ChangeKind::Modified.symbol(), '~');
    }
}
