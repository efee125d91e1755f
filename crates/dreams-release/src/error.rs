use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("no release descriptor at {0}")]
    MissingDescriptor(PathBuf),

    #[error("invalid release descriptor {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    #[error("invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("failed to copy {path} into the release: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Version(#[from] dreams_types::TypeError),

    #[error(transparent)]
    Index(#[from] dreams_index::IndexError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReleaseResult<T> = Result<T, ReleaseError>;
