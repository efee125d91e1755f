//! Directory listing shared by manifest building and release bundling.

use std::collections::BTreeSet;
use std::path::Path;

use dreams_types::filter::normalize_path;
use dreams_types::PathFilter;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IndexError, IndexResult};

/// List every regular file under `root` selected by `filter`.
///
/// Each include root is walked in turn; an include root naming a file lists
/// just that file. Excluded directories are pruned during the walk rather
/// than filtered afterwards. Returned paths are relative to `root`, use `/`
/// separators, and are sorted and de-duplicated.
pub fn list_content(root: &Path, filter: &PathFilter) -> IndexResult<Vec<String>> {
    if !root.is_dir() {
        return Err(IndexError::NotFound(root.to_path_buf()));
    }

    let mut content = BTreeSet::new();
    for include in filter.include_roots() {
        let absolute = if include.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&include)
        };

        if absolute.is_file() {
            if !filter.excludes(&include) {
                content.insert(include);
            }
            continue;
        }
        if !absolute.is_dir() {
            debug!(include = %include, "include root does not exist; skipping");
            continue;
        }

        let walker = WalkDir::new(&absolute)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| match relative(root, entry.path()) {
                Some(rel) => rel.is_empty() || !filter.excludes(&rel),
                None => false,
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "unreadable entry while listing content; skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative(root, entry.path()) {
                content.insert(rel);
            }
        }
    }

    debug!(root = %root.display(), files = content.len(), "listed content");
    Ok(content.into_iter().collect())
}

/// Relative, forward-slash form of `path` below `root`.
pub(crate) fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let joined: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(normalize_path(&joined.join("/")))
}
