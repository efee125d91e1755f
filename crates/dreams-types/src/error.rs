use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid version identifier {input:?}: {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("version {0} has no successor: component overflow")]
    VersionOverflow(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}
