//! Release bundling: snapshot a pack tree into `install/releases/{version}`.

use std::fs;
use std::path::{Path, PathBuf};

use dreams_diff::{diff, suggest_version, ContentDifference};
use dreams_index::{archive, build_manifest, list_content, render_sidecar, ManifestOptions};
use dreams_types::layout::{MODULES_DIR, RELEASES_DIR, SIDECAR_FILE, VERSION_CHECKER_FILE};
use dreams_types::{PathFilter, VersionIdentifier};
use tracing::{debug, info};

use crate::config::ToolkitConfig;
use crate::descriptor::ReleaseDescriptor;
use crate::error::{ReleaseError, ReleaseResult};

/// Extension of archived releases.
pub const ARCHIVE_EXTENSION: &str = "tar.zst";

/// Options for [`bundle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleOptions {
    /// Bump the version from the difference with the previous release of the
    /// same version.
    pub increment: bool,
    /// Produce `{version}.tar.zst` instead of a directory.
    pub archive: bool,
    /// Directory whose structural changes are feature-level.
    pub module_prefix: String,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            increment: false,
            archive: false,
            module_prefix: MODULES_DIR.to_string(),
        }
    }
}

/// What a bundle run produced.
#[derive(Clone, Debug)]
pub struct BundleReport {
    /// Version the pack had before bundling.
    pub previous_version: String,
    /// Version of the produced release.
    pub version: String,
    /// Release directory or archive.
    pub output: PathBuf,
    /// Number of files in the release, sidecar excluded.
    pub files: usize,
    /// Difference used to infer the version, when one was computed.
    pub difference: Option<ContentDifference>,
}

impl BundleReport {
    /// Returns `true` if bundling changed the pack version.
    pub fn incremented(&self) -> bool {
        self.previous_version != self.version
    }
}

/// Bundle the pack tree at `root` into a new release.
///
/// With `increment` set and a previous release of the current version
/// present, the version is re-derived from the difference between that
/// release and the live tree, and the descriptor is rewritten when it changes.
/// A previous release of a different version means the version was bumped by
/// hand, and it is kept.
pub fn bundle(root: &Path, options: &BundleOptions) -> ReleaseResult<BundleReport> {
    let config = ToolkitConfig::load(root)?;
    let mut descriptor = ReleaseDescriptor::load(root)?;
    let filter = config.release_filter(root)?;
    let releases_dir = root.join(RELEASES_DIR);
    let previous_version = descriptor.version.clone();

    let mut difference = None;
    if options.increment {
        match existing_release(&releases_dir, &descriptor.version) {
            Some(previous) => {
                let d = release_difference(root, &previous, &filter)?;
                let current: VersionIdentifier = descriptor.version.parse()?;
                let suggested = suggest_version(&current, &d, &options.module_prefix)?;
                if suggested != current {
                    info!(from = %current, to = %suggested, "incrementing version");
                    descriptor.version = suggested.to_string();
                    descriptor.save(root)?;
                } else {
                    info!(version = %current, "no content change since last release");
                }
                difference = Some(d);
            }
            None => debug!(version = %descriptor.version, "no previous release of this version; keeping it"),
        }
    }

    write_version_checker(root, &descriptor)?;

    let version = descriptor.version.clone();
    let release_dir = releases_dir.join(&version);
    if release_dir.is_dir() {
        fs::remove_dir_all(&release_dir)?;
    }
    fs::create_dir_all(&release_dir)?;

    let files = list_content(root, &filter)?;
    for rel in &files {
        copy_into(root, &release_dir, rel)?;
    }
    info!(release = %release_dir.display(), files = files.len(), "copied release content");

    let manifest = build_manifest(&release_dir, &ManifestOptions::uncached(PathFilter::everything()))?;
    let sidecar = release_dir.join(SIDECAR_FILE);
    if let Some(parent) = sidecar.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&sidecar, render_sidecar(&manifest))?;
    let tracked = manifest.paths().filter(|p| *p != SIDECAR_FILE).count();

    let output = if options.archive {
        let archive_path = releases_dir.join(format!("{version}.{ARCHIVE_EXTENSION}"));
        archive::write_archive(&release_dir, &archive_path)?;
        fs::remove_dir_all(&release_dir)?;
        archive_path
    } else {
        release_dir
    };
    info!(output = %output.display(), version = %version, "release bundled");

    Ok(BundleReport {
        previous_version,
        version,
        output,
        files: tracked,
        difference,
    })
}

/// A previously bundled release of `version`, as a directory or archive.
fn existing_release(releases_dir: &Path, version: &str) -> Option<PathBuf> {
    let dir = releases_dir.join(version);
    if dir.is_dir() {
        return Some(dir);
    }
    let archive = releases_dir.join(format!("{version}.{ARCHIVE_EXTENSION}"));
    archive.is_file().then_some(archive)
}

/// Difference from a previous release to the live tree, ignoring the files
/// that are regenerated on every bundle.
fn release_difference(root: &Path, previous: &Path, filter: &PathFilter) -> ReleaseResult<ContentDifference> {
    let old = build_manifest(previous, &ManifestOptions::default())?;
    let new = build_manifest(root, &ManifestOptions::uncached(filter.clone()))?;
    let mut d = diff(&old, &new);
    d.exclude_all(SIDECAR_FILE);
    d.exclude_all(VERSION_CHECKER_FILE);
    Ok(d)
}

fn write_version_checker(root: &Path, descriptor: &ReleaseDescriptor) -> ReleaseResult<()> {
    let path = root.join(VERSION_CHECKER_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = format!(
        "\n#General settings\n[general]\n\
         \t#The CurseForge project ID for the modpack\n\t#Range: > 0\n\tmodpackProjectID = 0\n\
         \t#The name of the modpack\n\tmodpackName = \"{}\"\n\
         \t#The version of the modpack\n\tmodpackVersion = \"{}\"\n\
         \t#Use the metadata.json to determine the modpack version\n\
         \t#ONLY ENABLE THIS IF YOU KNOW WHAT YOU ARE DOING\n\tuseMetadata = false\n\n",
        descriptor.name.as_deref().unwrap_or("?"),
        descriptor.version,
    );
    fs::write(path, content)?;
    Ok(())
}

fn copy_into(root: &Path, release_dir: &Path, rel: &str) -> ReleaseResult<()> {
    let source = root.join(rel);
    let dest = release_dir.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&source, &dest).map_err(|source_err| ReleaseError::Copy {
        path: source.clone(),
        source: source_err,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreams_index::parse_sidecar;
    use dreams_types::layout::CONFIG_FILE;

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn pack(version: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = ReleaseDescriptor::new(version);
        descriptor.name = Some("Dreams".into());
        descriptor.save(dir.path()).unwrap();
        write(dir.path(), "mods/a.jar", b"a");
        write(dir.path(), "config/a.toml", b"cfg");
        dir
    }

    #[test]
    fn first_bundle_writes_release_and_sidecar() {
        let dir = pack("1.0");
        let report = bundle(dir.path(), &BundleOptions::default()).unwrap();

        assert_eq!(report.version, "1.0");
        assert!(!report.incremented());
        let release = dir.path().join("install/releases/1.0");
        assert_eq!(report.output, release);
        assert!(release.join("mods/a.jar").is_file());
        assert!(release.join(VERSION_CHECKER_FILE).is_file());

        let sidecar = fs::read_to_string(release.join(SIDECAR_FILE)).unwrap();
        assert!(sidecar.ends_with(SIDECAR_FILE));
        let m = parse_sidecar(&sidecar);
        assert!(m.contains("mods/a.jar"));
        assert!(!m.paths().any(|p| p.starts_with("install/releases")));
        assert_eq!(report.files, m.len() - 1);
    }

    #[test]
    fn version_checker_carries_version() {
        let dir = pack("1.0");
        bundle(dir.path(), &BundleOptions::default()).unwrap();
        let checker = fs::read_to_string(dir.path().join(VERSION_CHECKER_FILE)).unwrap();
        assert!(checker.contains("modpackVersion = \"1.0\""));
        assert!(checker.contains("modpackName = \"Dreams\""));
    }

    #[test]
    fn increment_bumps_feature_on_new_module() {
        let dir = pack("1.0");
        bundle(dir.path(), &BundleOptions::default()).unwrap();

        write(dir.path(), "mods/b.jar", b"b");
        let options = BundleOptions {
            increment: true,
            ..Default::default()
        };
        let report = bundle(dir.path(), &options).unwrap();

        assert_eq!(report.version, "1.1");
        assert!(report.incremented());
        assert!(report.difference.unwrap().added().contains("mods/b.jar"));
        assert_eq!(ReleaseDescriptor::load(dir.path()).unwrap().version, "1.1");
        assert!(dir.path().join("install/releases/1.1/mods/b.jar").is_file());
    }

    #[test]
    fn increment_bumps_patch_on_edit() {
        let dir = pack("1.0");
        bundle(dir.path(), &BundleOptions::default()).unwrap();

        write(dir.path(), "config/a.toml", b"cfg2");
        let options = BundleOptions {
            increment: true,
            ..Default::default()
        };
        let report = bundle(dir.path(), &options).unwrap();
        assert_eq!(report.version, "1.0.1");
    }

    #[test]
    fn increment_without_change_keeps_version() {
        let dir = pack("1.0");
        bundle(dir.path(), &BundleOptions::default()).unwrap();

        let options = BundleOptions {
            increment: true,
            ..Default::default()
        };
        let report = bundle(dir.path(), &options).unwrap();
        assert_eq!(report.version, "1.0");
        assert!(!report.incremented());
        assert!(report.difference.unwrap().is_empty());
    }

    #[test]
    fn hand_bumped_version_is_kept() {
        let dir = pack("1.0");
        bundle(dir.path(), &BundleOptions::default()).unwrap();
        let mut descriptor = ReleaseDescriptor::load(dir.path()).unwrap();
        descriptor.version = "2.0".into();
        descriptor.save(dir.path()).unwrap();
        write(dir.path(), "mods/b.jar", b"b");

        let options = BundleOptions {
            increment: true,
            ..Default::default()
        };
        let report = bundle(dir.path(), &options).unwrap();
        assert_eq!(report.version, "2.0");
        assert!(report.difference.is_none());
    }

    #[test]
    fn archive_replaces_directory() {
        let dir = pack("1.0");
        let options = BundleOptions {
            archive: true,
            ..Default::default()
        };
        let report = bundle(dir.path(), &options).unwrap();

        assert_eq!(report.output, dir.path().join("install/releases/1.0.tar.zst"));
        assert!(report.output.is_file());
        assert!(!dir.path().join("install/releases/1.0").exists());

        let m = build_manifest(&report.output, &ManifestOptions::default()).unwrap();
        assert!(m.contains("mods/a.jar"));
    }

    #[test]
    fn bundle_exclusions_from_config_apply() {
        let dir = pack("1.0");
        write(dir.path(), "saves/world/level.dat", b"w");
        write(dir.path(), CONFIG_FILE, br#"{"bundle-exclude": ["saves"]}"#);

        let report = bundle(dir.path(), &BundleOptions::default()).unwrap();
        assert!(!report.output.join("saves").exists());
        assert!(report.output.join("mods/a.jar").is_file());
    }

    #[test]
    fn orphan_configs_are_left_out_when_enabled() {
        let dir = pack("1.0");
        write(dir.path(), "mods/sodium-0.5.jar", b"s");
        write(dir.path(), "config/sodium-options.json", b"{}");
        write(dir.path(), "config/uninstalled.toml", b"x");
        write(dir.path(), CONFIG_FILE, br#"{"bundle-exclude-orphans": true}"#);

        let report = bundle(dir.path(), &BundleOptions::default()).unwrap();
        assert!(report.output.join("config/sodium-options.json").is_file());
        assert!(!report.output.join("config/uninstalled.toml").exists());
        assert!(report.output.join(VERSION_CHECKER_FILE).is_file());
    }

    #[test]
    fn missing_descriptor_aborts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            bundle(dir.path(), &BundleOptions::default()),
            Err(ReleaseError::MissingDescriptor(_))
        ));
    }
}
