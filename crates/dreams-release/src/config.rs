//! Toolkit configuration (`install/config.json`).
//!
//! Server installations carry a second file, `install/server/serverconfig.json`,
//! whose keys replace the same keys of the toolkit configuration wholesale.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use dreams_types::layout::{
    CONFIG_DIR, CONFIG_FILE, MODULES_DIR, RELEASES_DIR, SERVER_CONFIG_FILE, SERVER_MARKER_FILE,
    VERSION_CHECKER_FILE,
};
use dreams_types::{IgnoreRules, PathFilter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReleaseError, ReleaseResult};

/// Bundle and upgrade settings of a pack.
///
/// Every field has a default, so a missing file or a partial file is valid.
/// A fresh value is loaded for every operation; nothing is cached between
/// calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolkitConfig {
    /// Roots copied into a release. Empty means the whole tree.
    pub bundle_include: Vec<String>,
    /// Prefixes left out of a release.
    pub bundle_exclude: Vec<String>,
    /// Leave configuration entries without a matching module out of a release.
    pub bundle_exclude_orphans: bool,
    /// Configuration entry name to module name, for entries whose name does
    /// not reveal their module.
    pub config_matches: BTreeMap<String, String>,
    /// Prefixes never touched by an upgrade.
    pub upgrade_ignore_global: Vec<String>,
    /// Prefixes never added by an upgrade.
    pub upgrade_ignore_add: Vec<String>,
    /// Prefixes never removed by an upgrade.
    pub upgrade_ignore_remove: Vec<String>,
    /// Prefixes never overwritten by an upgrade.
    pub upgrade_ignore_modify: Vec<String>,
    /// Location releases are retrieved from.
    pub repository: Option<String>,
}

/// Returns `true` if the tree at `root` is a server installation: it has both
/// the server marker and a server configuration.
pub fn is_server_install(root: &Path) -> bool {
    root.join(SERVER_MARKER_FILE).is_file() && root.join(SERVER_CONFIG_FILE).is_file()
}

impl ToolkitConfig {
    /// Load the configuration of a pack tree. A missing file yields defaults.
    ///
    /// In a server installation the server configuration is laid over the
    /// toolkit configuration.
    pub fn load(root: &Path) -> ReleaseResult<Self> {
        let client = read_optional(&root.join(CONFIG_FILE))?;
        let server = if is_server_install(root) {
            read_optional(&root.join(SERVER_CONFIG_FILE))?
        } else {
            None
        };
        Self::from_layers(client.as_deref(), server.as_deref(), root)
    }

    /// Parse configuration JSON.
    pub fn from_json(data: &[u8], origin: &Path) -> ReleaseResult<Self> {
        serde_json::from_slice(data).map_err(|e| config_error(origin, e))
    }

    /// Parse a toolkit configuration and an optional server configuration.
    /// Every top-level key of the server layer replaces the same key of the
    /// toolkit layer; lists are not merged.
    pub fn from_layers(client: Option<&[u8]>, server: Option<&[u8]>, origin: &Path) -> ReleaseResult<Self> {
        let mut merged = match client {
            Some(data) => as_object(data, origin)?,
            None => Map::new(),
        };
        if let Some(data) = server {
            let overrides = as_object(data, origin)?;
            debug!(keys = overrides.len(), "applying server configuration");
            merged.extend(overrides);
        }
        serde_json::from_value(Value::Object(merged)).map_err(|e| config_error(origin, e))
    }

    /// The upgrade ignore rules described by this configuration.
    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules {
            global: self.upgrade_ignore_global.clone(),
            added: self.upgrade_ignore_add.clone(),
            removed: self.upgrade_ignore_remove.clone(),
            modified: self.upgrade_ignore_modify.clone(),
        }
    }

    /// The filter selecting release content. Previous releases are never
    /// bundled into a new one.
    pub fn bundle_filter(&self) -> PathFilter {
        PathFilter::new(self.bundle_include.clone(), self.bundle_exclude.clone()).exclude(RELEASES_DIR)
    }

    /// [`bundle_filter`](Self::bundle_filter) for the tree at `root`, also
    /// excluding orphan configuration entries when `bundle-exclude-orphans`
    /// is set.
    pub fn release_filter(&self, root: &Path) -> ReleaseResult<PathFilter> {
        let mut filter = self.bundle_filter();
        if self.bundle_exclude_orphans {
            for orphan in orphan_configs(root, self)? {
                filter = filter.exclude(format!("{CONFIG_DIR}/{orphan}"));
            }
        }
        Ok(filter)
    }
}

/// Entries of the `config` directory that belong to no installed module.
///
/// An entry is matched to a module by its `config-matches` name, or else by
/// the leading alphanumeric run of its name without extension. It is an
/// orphan when no `mods/*.jar` file name, lowercased and stripped of `-` and
/// `_`, contains that name. The version checker is never an orphan. Returned
/// names are relative to `config` and sorted.
pub fn orphan_configs(root: &Path, config: &ToolkitConfig) -> ReleaseResult<Vec<String>> {
    let config_dir = root.join(CONFIG_DIR);
    if !config_dir.is_dir() {
        return Ok(Vec::new());
    }
    let modules = module_names(&root.join(MODULES_DIR))?;
    let checker = VERSION_CHECKER_FILE.strip_prefix("config/").unwrap_or(VERSION_CHECKER_FILE);

    let mut orphans = Vec::new();
    for entry in fs::read_dir(&config_dir)? {
        let file = entry?.file_name().to_string_lossy().into_owned();
        if file == checker {
            continue;
        }
        let name = match config.config_matches.get(&file) {
            Some(name) => name.to_lowercase(),
            None => module_stem(&file).to_lowercase(),
        };
        if !modules.iter().any(|module| module.contains(&name)) {
            orphans.push(file);
        }
    }
    orphans.sort();
    if !orphans.is_empty() {
        debug!(count = orphans.len(), "orphan configuration entries");
    }
    Ok(orphans)
}

fn module_names(mods_dir: &Path) -> ReleaseResult<Vec<String>> {
    if !mods_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(mods_dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.ends_with(".jar") {
            names.push(name.to_lowercase().replace(['-', '_'], ""));
        }
    }
    Ok(names)
}

fn module_stem(file: &str) -> String {
    let stem = file.rfind('.').map_or(file, |i| &file[..i]);
    stem.chars().take_while(|c| c.is_alphanumeric()).collect()
}

fn read_optional(path: &Path) -> ReleaseResult<Option<Vec<u8>>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(fs::read(path)?))
}

fn as_object(data: &[u8], origin: &Path) -> ReleaseResult<Map<String, Value>> {
    match serde_json::from_slice(data).map_err(|e| config_error(origin, e))? {
        Value::Object(map) => Ok(map),
        _ => Err(ReleaseError::Config {
            path: origin.to_path_buf(),
            reason: "configuration is not a JSON object".to_string(),
        }),
    }
}

fn config_error(origin: &Path, e: serde_json::Error) -> ReleaseError {
    ReleaseError::Config {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    }
}
