//! The release descriptor (`install/dreams-manifest.json`).

use std::path::Path;

use dreams_index::archive;
use dreams_types::layout::DESCRIPTOR_FILE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReleaseError, ReleaseResult};

/// Metadata describing a release. Only `version` is interpreted; every other
/// field is carried through untouched when the descriptor is rewritten.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReleaseDescriptor {
    /// Create a descriptor for the given version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Parse descriptor JSON.
    pub fn from_json(data: &[u8], origin: &Path) -> ReleaseResult<Self> {
        serde_json::from_slice(data).map_err(|e| ReleaseError::Descriptor {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the descriptor of a pack tree.
    pub fn load(root: &Path) -> ReleaseResult<Self> {
        let path = root.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Err(ReleaseError::MissingDescriptor(path));
        }
        let data = std::fs::read(&path)?;
        Self::from_json(&data, &path)
    }

    /// Write the descriptor back into a pack tree.
    pub fn save(&self, root: &Path) -> ReleaseResult<()> {
        let path = root.join(DESCRIPTOR_FILE);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ReleaseError::Descriptor {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

/// The version of the release at `root`, a pack tree or a release archive.
///
/// Returns `None` when the descriptor is missing or unreadable; callers fall
/// back to the unknown version label.
pub fn read_version(root: &Path) -> Option<String> {
    let result = if root.is_dir() {
        ReleaseDescriptor::load(root)
    } else {
        match archive::read_entry(root, DESCRIPTOR_FILE) {
            Ok(Some(data)) => ReleaseDescriptor::from_json(&data, root),
            Ok(None) => Err(ReleaseError::MissingDescriptor(root.to_path_buf())),
            Err(e) => Err(e.into()),
        }
    };
    match result {
        Ok(descriptor) => Some(descriptor.version),
        Err(e) => {
            debug!(root = %root.display(), error = %e, "release version unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn save_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DESCRIPTOR_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version":"1.2","name":"Dreams","loader":"forge"}"#).unwrap();

        let mut d = ReleaseDescriptor::load(dir.path()).unwrap();
        assert_eq!(d.name.as_deref(), Some("Dreams"));
        d.version = "1.3".into();
        d.save(dir.path()).unwrap();

        let reloaded = ReleaseDescriptor::load(dir.path()).unwrap();
        assert_eq!(reloaded.version, "1.3");
        assert_eq!(reloaded.extra["loader"], "forge");
    }

    #[test]
    fn missing_descriptor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ReleaseDescriptor::load(dir.path()),
            Err(ReleaseError::MissingDescriptor(_))
        ));
        assert_eq!(read_version(dir.path()), None);
    }

    #[test]
    fn malformed_descriptor_yields_no_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DESCRIPTOR_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ReleaseDescriptor::load(dir.path()),
            Err(ReleaseError::Descriptor { .. })
        ));
        assert_eq!(read_version(dir.path()), None);
    }

    #[test]
    fn version_is_read_from_archives() {
        let src = tempfile::tempdir().unwrap();
        ReleaseDescriptor::new("4.1").save(src.path()).unwrap();
        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("4.1.tar.zst");
        archive::write_archive(src.path(), &archive_path).unwrap();

        assert_eq!(read_version(&archive_path).as_deref(), Some("4.1"));
    }
}
