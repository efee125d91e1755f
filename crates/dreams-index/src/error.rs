//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur while building a manifest.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Neither a directory nor a file exists at the given root.
    #[error("nothing to read content from at {0}")]
    NotFound(PathBuf),

    /// A release archive does not carry a sidecar manifest.
    #[error("archive {0} has no sidecar manifest")]
    MissingManifest(PathBuf),

    /// The file is not a readable release archive.
    #[error("cannot read archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// A tracked file could not be fingerprinted.
    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
