//! Difference engine for the Dreams toolkit.
//!
//! Compares two content manifests and derives everything that follows from
//! the shape of the change: a suggested next version and a patchnote.
//!
//! # Key Types
//!
//! - [`ContentDifference`] / [`diff`] -- Added/removed/modified path sets
//! - [`suggest_version`] -- Next version inferred from a difference
//! - [`PatchnoteStyle`] / [`format_patchnote`] -- Human-readable report

pub mod difference;
pub mod patchnote;
pub mod policy;

pub use difference::{diff, ContentDifference, UNKNOWN_VERSION};
pub use patchnote::{format_patchnote, PatchnoteStyle};
pub use policy::suggest_version;
