//! Retrieval of published releases.
//!
//! A release repository publishes a `latest.json` pointer at its root and the
//! files of each release under `versions/{version-name}/`. The
//! [`ReleaseSource`] trait abstracts where that layout lives;
//! [`DirectorySource`] serves it from a local or mounted directory.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use dreams_types::layout::{CONFIG_FILE, SERVER_CONFIG_FILE, SIDECAR_FILE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::applier::safe_join;
use crate::error::{UpgradeError, UpgradeResult};

/// Name of the pointer to the newest release.
pub const LATEST_FILE: &str = "latest.json";

/// Directory holding one subdirectory per published release.
pub const VERSIONS_DIR: &str = "versions";

/// The newest published release, as announced by the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRef {
    /// Human-readable version label.
    pub version: String,
    /// Directory name of the release under `versions/`.
    #[serde(rename = "version-name")]
    pub name: String,
}

/// An open remote file together with its declared length.
pub struct RemoteFile {
    pub length: u64,
    pub reader: Box<dyn Read>,
}

impl std::fmt::Debug for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFile").field("length", &self.length).finish_non_exhaustive()
    }
}

/// Where published releases are read from.
pub trait ReleaseSource {
    /// The release the repository currently points at.
    fn latest_release(&self) -> UpgradeResult<ReleaseRef>;

    /// Raw sidecar text of `release`.
    fn fetch_sidecar(&self, release: &ReleaseRef) -> UpgradeResult<String>;

    /// Open one file of `release` for streaming.
    fn fetch_file(&self, release: &ReleaseRef, path: &str) -> UpgradeResult<RemoteFile>;

    /// Toolkit configuration published with `release`, if any.
    fn fetch_config(&self, release: &ReleaseRef) -> UpgradeResult<Option<String>>;

    /// Server configuration published with `release`, if any.
    fn fetch_server_config(&self, _release: &ReleaseRef) -> UpgradeResult<Option<String>> {
        Ok(None)
    }
}

/// A release repository laid out on the filesystem.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn release_path(&self, release: &ReleaseRef, path: &str) -> UpgradeResult<PathBuf> {
        let base = safe_join(&self.root.join(VERSIONS_DIR), &release.name)
            .ok_or_else(|| UpgradeError::Metadata(format!("invalid release name {:?}", release.name)))?;
        safe_join(&base, path).ok_or_else(|| UpgradeError::Unavailable(path.to_string()))
    }

    fn read_optional(&self, release: &ReleaseRef, path: &str) -> UpgradeResult<Option<String>> {
        match fs::read_to_string(self.release_path(release, path)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ReleaseSource for DirectorySource {
    fn latest_release(&self) -> UpgradeResult<ReleaseRef> {
        let path = self.root.join(LATEST_FILE);
        let data = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => UpgradeError::Unavailable(path.display().to_string()),
            _ => UpgradeError::Io(e),
        })?;
        let latest: ReleaseRef =
            serde_json::from_slice(&data).map_err(|e| UpgradeError::Metadata(format!("{}: {e}", path.display())))?;
        debug!(version = %latest.version, name = %latest.name, "latest release");
        Ok(latest)
    }

    fn fetch_sidecar(&self, release: &ReleaseRef) -> UpgradeResult<String> {
        let path = self.release_path(release, SIDECAR_FILE)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => UpgradeError::Unavailable(format!("{} of release {}", SIDECAR_FILE, release.name)),
            _ => UpgradeError::Io(e),
        })
    }

    fn fetch_file(&self, release: &ReleaseRef, path: &str) -> UpgradeResult<RemoteFile> {
        let full = self.release_path(release, path)?;
        let file = File::open(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => UpgradeError::Unavailable(path.to_string()),
            _ => UpgradeError::Io(e),
        })?;
        let length = file.metadata()?.len();
        Ok(RemoteFile {
            length,
            reader: Box::new(file),
        })
    }

    fn fetch_config(&self, release: &ReleaseRef) -> UpgradeResult<Option<String>> {
        self.read_optional(release, CONFIG_FILE)
    }

    fn fetch_server_config(&self, release: &ReleaseRef) -> UpgradeResult<Option<String>> {
        self.read_optional(release, SERVER_CONFIG_FILE)
    }
}
