//! Sidecar manifest codec.
//!
//! A sidecar is UTF-8 text with one `relative/path:fingerprint` line per
//! tracked file. The last line holds the sidecar's own relative path with no
//! fingerprint. Lines without a colon parse to a path with an empty
//! fingerprint.

use dreams_types::layout::SIDECAR_FILE;
use dreams_types::{ContentManifest, Fingerprint};

/// Parse sidecar text into a manifest. Never fails: malformed lines degrade
/// to entries with an empty fingerprint and blank lines are skipped.
pub fn parse_sidecar(text: &str) -> ContentManifest {
    let mut manifest = ContentManifest::new();
    for line in text.lines() {
        let line = line.trim().replace('\\', "/");
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(':');
        let path = fields.next().unwrap_or_default();
        let fingerprint = fields
            .next()
            .map(Fingerprint::from_sidecar)
            .unwrap_or_else(Fingerprint::empty);
        if path.is_empty() {
            continue;
        }
        manifest.insert(path, fingerprint);
    }
    manifest
}

/// Render a manifest as sidecar text, ending with the self-referential line.
pub fn render_sidecar(manifest: &ContentManifest) -> String {
    let mut out = String::new();
    for (path, fingerprint) in manifest {
        if path == SIDECAR_FILE {
            continue;
        }
        out.push_str(path);
        out.push(':');
        out.push_str(fingerprint.as_str());
        out.push('\n');
    }
    out.push_str(SIDECAR_FILE);
    out
}
