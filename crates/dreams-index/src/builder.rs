//! Manifest construction from a directory, its sidecar cache, or an archive.

use std::path::Path;

use dreams_types::layout::SIDECAR_FILE;
use dreams_types::{ContentManifest, FileHasher, PathFilter};
use tracing::{debug, info};

use crate::archive;
use crate::error::{IndexError, IndexResult};
use crate::listing::list_content;
use crate::sidecar::parse_sidecar;

/// Options controlling how a manifest is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Which part of a directory tree is fingerprinted.
    pub filter: PathFilter,
    /// Read the sidecar of a directory tree instead of hashing, when present.
    pub use_cache: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            filter: PathFilter::everything(),
            use_cache: true,
        }
    }
}

impl ManifestOptions {
    /// Options that always hash the live tree.
    pub fn uncached(filter: PathFilter) -> Self {
        Self {
            filter,
            use_cache: false,
        }
    }
}

/// Build the content manifest of `root`.
///
/// - A directory with a sidecar (when `use_cache` is set) yields the sidecar
///   content, minus entries whose file has since disappeared.
/// - Any other directory is walked and every selected file is hashed.
/// - A regular file is read as a release archive and its sidecar entry is
///   returned as is.
pub fn build_manifest(root: &Path, options: &ManifestOptions) -> IndexResult<ContentManifest> {
    if root.is_dir() {
        let sidecar = root.join(SIDECAR_FILE);
        if options.use_cache && sidecar.is_file() {
            let text = std::fs::read_to_string(&sidecar)?;
            let mut manifest = parse_sidecar(&text);
            let dropped = manifest.retain_existing(root);
            debug!(root = %root.display(), entries = manifest.len(), dropped, "manifest read from sidecar");
            return Ok(manifest);
        }
        return hash_tree(root, &options.filter);
    }

    if root.is_file() {
        let data = archive::read_entry(root, SIDECAR_FILE)?
            .ok_or_else(|| IndexError::MissingManifest(root.to_path_buf()))?;
        let manifest = parse_sidecar(&String::from_utf8_lossy(&data));
        debug!(archive = %root.display(), entries = manifest.len(), "manifest read from archive");
        return Ok(manifest);
    }

    Err(IndexError::NotFound(root.to_path_buf()))
}

fn hash_tree(root: &Path, filter: &PathFilter) -> IndexResult<ContentManifest> {
    let files = list_content(root, filter)?;
    let mut manifest = ContentManifest::new();
    for rel in &files {
        let path = root.join(rel);
        let fingerprint = FileHasher::FILE
            .hash_file(&path)
            .map_err(|source| IndexError::Hash { path, source })?;
        manifest.insert(rel, fingerprint);
    }
    info!(root = %root.display(), files = manifest.len(), "hashed tree");
    Ok(manifest)
}
