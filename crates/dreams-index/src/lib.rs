//! Manifest builder for the Dreams toolkit.
//!
//! Turns a pack tree, its cached sidecar, or a release archive into a
//! [`ContentManifest`](dreams_types::ContentManifest).
//!
//! # Key Items
//!
//! - [`list_content`] -- Directory listing honoring include/exclude prefixes
//! - [`build_manifest`] / [`ManifestOptions`] -- Manifest from a tree or archive
//! - [`parse_sidecar`] / [`render_sidecar`] -- Sidecar manifest codec
//! - [`archive`] -- Reading and writing `tar` (optionally zstd) release archives

pub mod archive;
pub mod builder;
pub mod error;
pub mod listing;
pub mod sidecar;

pub use builder::{build_manifest, ManifestOptions};
pub use error::{IndexError, IndexResult};
pub use listing::list_content;
pub use sidecar::{parse_sidecar, render_sidecar};
