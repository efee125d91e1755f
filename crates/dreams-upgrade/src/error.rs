//! Error types for the upgrade crate.

use std::path::PathBuf;

/// Fatal upgrade errors. Per-file problems during application are not errors;
/// they are reported as [`ApplyWarning`](crate::ApplyWarning)s.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// A source or target root does not exist.
    #[error("directory not found: {0}")]
    NotFound(PathBuf),

    /// The release source has no such release or file.
    #[error("release source has no {0}")]
    Unavailable(String),

    /// Release metadata from the source could not be parsed.
    #[error("invalid release metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    Index(#[from] dreams_index::IndexError),

    #[error(transparent)]
    Release(#[from] dreams_release::ReleaseError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for upgrade results.
pub type UpgradeResult<T> = Result<T, UpgradeError>;
