//! Well-known relative paths inside a pack tree.

/// Directory holding toolkit metadata.
pub const INSTALL_DIR: &str = "install";
/// Sidecar manifest shipped with every release.
pub const SIDECAR_FILE: &str = "install/version/version_content.txt";
/// Release descriptor carrying the pack version.
pub const DESCRIPTOR_FILE: &str = "install/dreams-manifest.json";
/// Toolkit configuration.
pub const CONFIG_FILE: &str = "install/config.json";
/// Files copied into the tree on first run when absent.
pub const DEFAULTS_DIR: &str = "install/defaults";
/// Output directory of the bundler.
pub const RELEASES_DIR: &str = "install/releases";
/// Directory receiving patchnote logs after an upgrade.
pub const PATCHNOTES_DIR: &str = "install/version";
/// Version-checker file regenerated on every bundle.
pub const VERSION_CHECKER_FILE: &str = "config/bcc.json";
/// Directory whose structural changes count as feature-level.
pub const MODULES_DIR: &str = "mods";
/// Per-module configuration directory, checked for orphans when bundling.
pub const CONFIG_DIR: &str = "config";
/// Server-specific toolkit metadata.
pub const SERVER_DIR: &str = "install/server";
/// Server configuration, overriding the toolkit configuration key by key.
pub const SERVER_CONFIG_FILE: &str = "install/server/serverconfig.json";
/// Marker present in server installations.
pub const SERVER_MARKER_FILE: &str = "install/server/is-server.json";
