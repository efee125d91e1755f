//! Foundation types for the Dreams toolkit.
//!
//! This crate provides the value types shared by every other crate in the
//! workspace: content fingerprints, content manifests, version identifiers,
//! the path filter, and the application-time ignore rules.
//!
//! # Key Types
//!
//! - [`Fingerprint`] -- Hex digest of a file's bytes, used for change detection
//! - [`FileHasher`] -- Streaming, domain-separated BLAKE3 file hasher
//! - [`ContentManifest`] -- Relative path → fingerprint mapping of a tree
//! - [`VersionIdentifier`] -- `{epoch}.{feature}.{patch}` release version
//! - [`ChangeKind`] -- Added / removed / modified category of a change
//! - [`IgnoreRules`] -- Per-category prefix lists applied at upgrade time

pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod ignore;
pub mod layout;
pub mod manifest;
pub mod version;

pub use error::TypeError;
pub use filter::{is_excluded, normalize_path, PathFilter};
pub use fingerprint::{FileHasher, Fingerprint};
pub use ignore::{ChangeKind, IgnoreRules};
pub use manifest::ContentManifest;
pub use version::VersionIdentifier;
