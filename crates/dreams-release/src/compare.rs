//! Comparison of two release trees or archives.

use std::path::Path;

use dreams_diff::{diff, ContentDifference};
use dreams_index::{build_manifest, ManifestOptions};
use tracing::info;

use crate::descriptor::read_version;
use crate::error::ReleaseResult;

/// Compute the difference from the release at `old_root` to the one at
/// `new_root`, with version labels read from their descriptors.
///
/// Either side may be a pack tree or a release archive. A missing or broken
/// descriptor only leaves the corresponding label unknown.
pub fn compare(old_root: &Path, new_root: &Path, options: &ManifestOptions) -> ReleaseResult<ContentDifference> {
    let old = build_manifest(old_root, options)?;
    let new = build_manifest(new_root, options)?;

    let old_version = read_version(old_root);
    let new_version = read_version(new_root);
    let difference = diff(&old, &new).with_versions(old_version.as_deref(), new_version.as_deref());

    info!(
        old = %difference.old_version(),
        new = %difference.new_version(),
        added = difference.added().len(),
        removed = difference.removed().len(),
        modified = difference.modified().len(),
        "compared releases"
    );
    Ok(difference)
}
