//! Release handling for the Dreams toolkit.
//!
//! Reads the per-tree release descriptor and toolkit configuration, compares
//! two trees or archives, and bundles a pack tree into a new release.
//!
//! # Key Types
//!
//! - [`ReleaseDescriptor`] -- `install/dreams-manifest.json`, carries the version
//! - [`ToolkitConfig`] -- `install/config.json`, bundle and upgrade settings
//! - [`compare`] -- Difference between two trees with version labels attached
//! - [`bundle`] / [`BundleOptions`] / [`BundleReport`] -- Release bundling

pub mod bundle;
pub mod compare;
pub mod config;
pub mod descriptor;
pub mod error;

pub use bundle::{bundle, BundleOptions, BundleReport};
pub use compare::compare;
pub use config::{is_server_install, orphan_configs, ToolkitConfig};
pub use descriptor::{read_version, ReleaseDescriptor};
pub use error::{ReleaseError, ReleaseResult};
