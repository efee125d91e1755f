//! Application of a content difference to a live installation.
//!
//! The applier never stops on a single file. Each add, removal, or overwrite
//! that cannot be carried out becomes an [`ApplyWarning`] and the run moves on
//! to the next entry. Only missing roots are fatal, and they are checked
//! before anything is touched.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use dreams_diff::ContentDifference;
use dreams_types::layout::DEFAULTS_DIR;
use dreams_types::{ChangeKind, IgnoreRules};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{UpgradeError, UpgradeResult};

/// A non-fatal problem met while applying a difference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyWarning {
    /// An added file already exists in the target; it was left untouched.
    Conflict { path: String },
    /// A removed file was already absent from the target.
    AlreadyAbsent { path: String },
    /// Reading, writing, or deleting a file failed; the file was skipped.
    IoFailure {
        path: String,
        kind: ChangeKind,
        reason: String,
    },
}

impl ApplyWarning {
    /// The relative path the warning is about.
    pub fn path(&self) -> &str {
        match self {
            ApplyWarning::Conflict { path }
            | ApplyWarning::AlreadyAbsent { path }
            | ApplyWarning::IoFailure { path, .. } => path,
        }
    }
}

impl fmt::Display for ApplyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyWarning::Conflict { path } => write!(f, "file {path} already exists; not overwritten"),
            ApplyWarning::AlreadyAbsent { path } => write!(f, "file {path} has already been removed"),
            ApplyWarning::IoFailure { path, kind, reason } => {
                write!(f, "could not apply {kind} file {path}: {reason}")
            }
        }
    }
}

/// Result of [`apply`].
#[derive(Clone, Debug)]
pub struct ApplyOutcome {
    /// The requested difference minus every entry skipped by ignore rules.
    pub effective: ContentDifference,
    /// Per-file problems, in processing order.
    pub warnings: Vec<ApplyWarning>,
    /// Files copied from the defaults subtree.
    pub defaults_installed: Vec<String>,
}

impl ApplyOutcome {
    /// Returns `true` if every requested file was handled without a warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Apply `diff` to `target_root`, taking new content from `source_root`.
///
/// Added files are copied unless the target already has them, removed files
/// are deleted, modified files are overwritten. Entries matched by `ignore`
/// are skipped and dropped from the returned effective difference; `diff`
/// itself is not modified. With `with_defaults`, the defaults subtree of the
/// target is copied over afterwards without overwriting anything.
pub fn apply(
    diff: &ContentDifference,
    source_root: &Path,
    target_root: &Path,
    ignore: &IgnoreRules,
    with_defaults: bool,
) -> UpgradeResult<ApplyOutcome> {
    if !source_root.is_dir() {
        return Err(UpgradeError::NotFound(source_root.to_path_buf()));
    }
    if !target_root.is_dir() {
        return Err(UpgradeError::NotFound(target_root.to_path_buf()));
    }

    let mut effective = diff.clone();
    let mut warnings = Vec::new();

    for kind in ChangeKind::ALL {
        let paths = diff.paths(kind);
        let total = paths.len();
        for (index, path) in paths.iter().enumerate() {
            if ignore.ignores(kind, path) {
                debug!(%kind, path = %path, "ignored by upgrade rules");
                effective.exclude(path, &[kind]);
                continue;
            }
            debug!(%kind, path = %path, progress = index + 1, total, "applying");
            if let Some(warning) = apply_one(kind, path, source_root, target_root) {
                warn!(%warning, "skipped file");
                warnings.push(warning);
            }
        }
        if total > 0 {
            info!(%kind, total, kept = effective.paths(kind).len(), "applied category");
        }
    }

    let defaults_installed = if with_defaults {
        install_defaults(target_root, &mut warnings)
    } else {
        Vec::new()
    };

    Ok(ApplyOutcome {
        effective,
        warnings,
        defaults_installed,
    })
}

fn apply_one(kind: ChangeKind, path: &str, source_root: &Path, target_root: &Path) -> Option<ApplyWarning> {
    let failure = |reason: String| ApplyWarning::IoFailure {
        path: path.to_string(),
        kind,
        reason,
    };

    let (Some(source), Some(target)) = (safe_join(source_root, path), safe_join(target_root, path)) else {
        return Some(failure("path escapes the installation root".to_string()));
    };

    let result = match kind {
        ChangeKind::Added => {
            if target.exists() {
                return Some(ApplyWarning::Conflict { path: path.to_string() });
            }
            copy_file(&source, &target)
        }
        ChangeKind::Removed => match fs::symlink_metadata(&target) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Some(ApplyWarning::AlreadyAbsent { path: path.to_string() });
            }
            Err(e) => Err(e),
            Ok(meta) if meta.is_dir() => {
                return Some(failure("a directory is in the way".to_string()));
            }
            Ok(_) => fs::remove_file(&target),
        },
        ChangeKind::Modified => copy_file(&source, &target),
    };
    result.err().map(|e| failure(e.to_string()))
}

/// Copy every file of the target's defaults subtree to the same relative
/// location in the target, when nothing is there yet.
///
/// Never overwrites; running it twice is a no-op the second time. Problems
/// are pushed to `warnings`. Returns the relative paths that were installed.
pub fn install_defaults(target_root: &Path, warnings: &mut Vec<ApplyWarning>) -> Vec<String> {
    let defaults_root = target_root.join(DEFAULTS_DIR);
    let mut installed = Vec::new();
    if !defaults_root.is_dir() {
        return installed;
    }

    for entry in WalkDir::new(&defaults_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "unreadable defaults entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&defaults_root) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let dest = target_root.join(&rel);
        if dest.exists() {
            continue;
        }
        match copy_file(entry.path(), &dest) {
            Ok(()) => {
                debug!(path = %rel, "installed default");
                installed.push(rel);
            }
            Err(e) => {
                let warning = ApplyWarning::IoFailure {
                    path: rel,
                    kind: ChangeKind::Added,
                    reason: e.to_string(),
                };
                warn!(%warning, "default not installed");
                warnings.push(warning);
            }
        }
    }

    if !installed.is_empty() {
        info!(count = installed.len(), "installed defaults");
    }
    installed
}

fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

/// Join a relative manifest path onto `root`, refusing anything that could
/// resolve outside it.
pub(crate) fn safe_join(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    if rel.as_os_str().is_empty() {
        return None;
    }
    let mut joined = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
