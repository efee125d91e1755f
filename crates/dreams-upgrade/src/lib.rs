//! Incremental upgrade engine for the Dreams toolkit.
//!
//! Applies a [`ContentDifference`](dreams_diff::ContentDifference) to a live
//! installation, retrieves the files a difference needs from a release
//! source, and drives the full upgrade of an installation to the latest
//! release.
//!
//! # Key Types
//!
//! - [`apply`] / [`ApplyOutcome`] / [`ApplyWarning`] -- Difference application
//! - [`ReleaseSource`] / [`DirectorySource`] -- Retrieval of published releases
//! - [`download`] / [`DownloadReport`] -- Streaming fetch of incoming files
//! - [`upgrade`] / [`UpgradeOptions`] / [`UpgradeReport`] -- End-to-end upgrade

pub mod applier;
pub mod download;
pub mod error;
pub mod source;
pub mod upgrade;

pub use applier::{apply, install_defaults, ApplyOutcome, ApplyWarning};
pub use download::{download, DownloadFailure, DownloadReport};
pub use error::{UpgradeError, UpgradeResult};
pub use source::{DirectorySource, ReleaseRef, ReleaseSource, RemoteFile};
pub use upgrade::{upgrade, UpgradeOptions, UpgradeReport};
