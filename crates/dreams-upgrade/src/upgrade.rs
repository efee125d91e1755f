//! End-to-end upgrade of an installation to the latest published release.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use dreams_diff::{diff, ContentDifference, PatchnoteStyle, UNKNOWN_VERSION};
use dreams_index::{build_manifest, parse_sidecar, render_sidecar, ManifestOptions};
use dreams_release::{is_server_install, read_version, ToolkitConfig};
use dreams_types::layout::{PATCHNOTES_DIR, SIDECAR_FILE, VERSION_CHECKER_FILE};
use dreams_types::{ContentManifest, IgnoreRules};
use tracing::{info, warn};

use crate::applier::{apply, ApplyWarning};
use crate::download::{download, DownloadFailure};
use crate::error::{UpgradeError, UpgradeResult};
use crate::source::{ReleaseRef, ReleaseSource};

/// Options for [`upgrade`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Take ignore rules from the configuration published with the release
    /// when it has one.
    pub use_remote_config: bool,
    /// Install missing defaults after applying.
    pub install_defaults: bool,
    /// Write a patchnote log into the installation.
    pub write_patchnote: bool,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            use_remote_config: true,
            install_defaults: true,
            write_patchnote: true,
        }
    }
}

/// What an upgrade did.
#[derive(Clone, Debug)]
pub struct UpgradeReport {
    pub release: ReleaseRef,
    /// The applied difference, after ignore rules.
    pub difference: ContentDifference,
    pub download_failures: Vec<DownloadFailure>,
    pub warnings: Vec<ApplyWarning>,
    pub defaults_installed: Vec<String>,
    /// Location of the written patchnote log.
    pub patchnote: Option<PathBuf>,
}

impl UpgradeReport {
    pub fn is_clean(&self) -> bool {
        self.download_failures.is_empty() && self.warnings.is_empty()
    }
}

/// Upgrade the installation at `install_root` to the latest release offered
/// by `source`.
///
/// The local manifest comes from the installation's sidecar when present, so
/// only files the release changed are retrieved. The sidecar and the version
/// checker are always refreshed. Files that fail to download are left as they
/// are and surface as apply warnings; the installed sidecar then records their
/// previous state so the next run retries them.
pub fn upgrade(
    install_root: &Path,
    source: &dyn ReleaseSource,
    options: &UpgradeOptions,
) -> UpgradeResult<UpgradeReport> {
    if !install_root.is_dir() {
        return Err(UpgradeError::NotFound(install_root.to_path_buf()));
    }
    let local_config = ToolkitConfig::load(install_root)?;

    let release = source.latest_release()?;
    let remote = parse_sidecar(&source.fetch_sidecar(&release)?);
    let local = build_manifest(
        install_root,
        &ManifestOptions {
            filter: local_config.bundle_filter(),
            use_cache: true,
        },
    )?;

    let mut difference = diff(&local, &remote);
    for always in [SIDECAR_FILE, VERSION_CHECKER_FILE] {
        if remote.contains(always) {
            difference.force_modified(always);
        }
    }
    let old_version = read_version(install_root);
    difference.set_old_version(old_version.as_deref());
    difference.set_new_version(Some(&release.version));
    info!(
        from = difference.old_version(),
        to = difference.new_version(),
        added = difference.added().len(),
        removed = difference.removed().len(),
        modified = difference.modified().len(),
        "upgrade planned"
    );

    let staging = tempfile::Builder::new().prefix("dreams-upgrade-").tempdir()?;
    let fetched = download(source, &release, &difference, staging.path(), &remote)?;

    let server = is_server_install(install_root);
    let rules = ignore_rules(source, &release, &local_config, server, options.use_remote_config);
    let outcome = apply(&difference, staging.path(), install_root, &rules, options.install_defaults)?;

    let failed: BTreeSet<&str> = fetched
        .failures
        .iter()
        .map(|f| f.path.as_str())
        .chain(outcome.warnings.iter().filter_map(|w| match w {
            ApplyWarning::IoFailure { path, .. } => Some(path.as_str()),
            _ => None,
        }))
        .collect();
    if !failed.is_empty() {
        let sidecar = reconciled_sidecar(&remote, &local, &failed);
        write_sidecar(install_root, &sidecar)?;
        warn!(files = failed.len(), "some files were not upgraded; they will be retried on the next run");
    }

    let patchnote = if options.write_patchnote {
        match write_patchnote(install_root, &outcome.effective) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "patchnote not written");
                None
            }
        }
    } else {
        None
    };

    info!(
        release = %release.name,
        warnings = outcome.warnings.len(),
        failed_downloads = fetched.failures.len(),
        "upgrade finished"
    );

    Ok(UpgradeReport {
        release,
        difference: outcome.effective,
        download_failures: fetched.failures,
        warnings: outcome.warnings,
        defaults_installed: outcome.defaults_installed,
        patchnote,
    })
}

fn ignore_rules(
    source: &dyn ReleaseSource,
    release: &ReleaseRef,
    local: &ToolkitConfig,
    server: bool,
    use_remote: bool,
) -> IgnoreRules {
    if use_remote {
        match published_config(source, release, server) {
            Ok(Some(config)) => return config.ignore_rules(),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "published configuration unusable, using local rules"),
        }
    }
    local.ignore_rules()
}

/// The configuration published with `release`, with the published server
/// configuration laid over it for server installations.
fn published_config(
    source: &dyn ReleaseSource,
    release: &ReleaseRef,
    server: bool,
) -> UpgradeResult<Option<ToolkitConfig>> {
    let client = source.fetch_config(release)?;
    let overlay = if server {
        source.fetch_server_config(release)?
    } else {
        None
    };
    if client.is_none() && overlay.is_none() {
        return Ok(None);
    }
    let config = ToolkitConfig::from_layers(
        client.as_deref().map(str::as_bytes),
        overlay.as_deref().map(str::as_bytes),
        Path::new(&release.name),
    )?;
    Ok(Some(config))
}

/// The sidecar describing the installation after a partial upgrade: the
/// release manifest, except that every path in `failed` keeps its previous
/// fingerprint, or is left out if it had none.
fn reconciled_sidecar(remote: &ContentManifest, local: &ContentManifest, failed: &BTreeSet<&str>) -> ContentManifest {
    let mut reconciled = remote.clone();
    for path in failed.iter().copied().filter(|p| *p != SIDECAR_FILE) {
        match local.get(path) {
            Some(previous) => {
                reconciled.insert(path, previous.clone());
            }
            None => {
                reconciled.remove(path);
            }
        }
    }
    reconciled
}

fn write_sidecar(install_root: &Path, manifest: &ContentManifest) -> std::io::Result<()> {
    let path = install_root.join(SIDECAR_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render_sidecar(manifest))
}

/// Path of the patchnote log for an upgrade between two versions.
pub fn patchnote_path(install_root: &Path, old: &str, new: &str) -> PathBuf {
    let name = format!("patchnote_{}-{}.log", file_safe(old), file_safe(new));
    install_root.join(PATCHNOTES_DIR).join(name)
}

fn write_patchnote(install_root: &Path, difference: &ContentDifference) -> std::io::Result<PathBuf> {
    let path = patchnote_path(install_root, difference.old_version(), difference.new_version());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let body = difference.patchnote(PatchnoteStyle::Fancy, 0);
    fs::write(&path, format!("{stamp}\n\n{body}"))?;
    info!(path = %path.display(), "patchnote written");
    Ok(path)
}

fn file_safe(label: &str) -> String {
    if label == UNKNOWN_VERSION {
        return "unknown".to_string();
    }
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DirectorySource, LATEST_FILE, VERSIONS_DIR};
    use dreams_release::{bundle, BundleOptions, ReleaseDescriptor};
    use dreams_types::layout::{CONFIG_FILE, DESCRIPTOR_FILE, SERVER_CONFIG_FILE, SERVER_MARKER_FILE};

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    /// Bundle `pack` and publish the release under `repo`.
    fn publish(pack: &Path, repo: &Path) -> ReleaseRef {
        let report = bundle(pack, &BundleOptions::default()).unwrap();
        let name = report.output.file_name().unwrap().to_string_lossy().into_owned();
        let dest = repo.join(VERSIONS_DIR).join(&name);
        for entry in walkdir::WalkDir::new(&report.output) {
            let entry = entry.unwrap();
            let rel = entry.path().strip_prefix(&report.output).unwrap();
            if entry.file_type().is_dir() {
                fs::create_dir_all(dest.join(rel)).unwrap();
            } else {
                fs::copy(entry.path(), dest.join(rel)).unwrap();
            }
        }
        let latest = ReleaseRef {
            version: report.version.clone(),
            name,
        };
        fs::write(repo.join(LATEST_FILE), serde_json::to_vec(&latest).unwrap()).unwrap();
        latest
    }

    fn pack_v1(root: &Path) {
        ReleaseDescriptor::new("1.0").save(root).unwrap();
        write(root, "mods/a.jar", b"a1");
        write(root, "mods/old.jar", b"old");
        write(root, "config/a.toml", b"v1");
    }

    fn pack_v2(root: &Path) {
        ReleaseDescriptor::new("1.1").save(root).unwrap();
        write(root, "mods/a.jar", b"a2");
        write(root, "mods/new.jar", b"new");
        write(root, "config/a.toml", b"v1");
    }

    #[test]
    fn upgrades_installation_to_latest_release() {
        let repo = tempfile::tempdir().unwrap();
        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        pack_v1(v1.path());
        pack_v2(v2.path());

        // The installation is the published 1.0 release.
        let install = tempfile::tempdir().unwrap();
        let first = publish(v1.path(), repo.path());
        let source = DirectorySource::new(repo.path());
        let report = upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();
        assert_eq!(report.release, first);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(fs::read(install.path().join("mods/old.jar")).unwrap(), b"old");

        publish(v2.path(), repo.path());
        let report = upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.difference.old_version(), "1.0");
        assert_eq!(report.difference.new_version(), "1.1");
        assert!(report.difference.added().contains("mods/new.jar"));
        assert!(report.difference.removed().contains("mods/old.jar"));
        assert!(report.difference.modified().contains("mods/a.jar"));
        assert!(report.difference.modified().contains(SIDECAR_FILE));
        assert!(!report.difference.modified().contains("config/a.toml"));

        assert_eq!(fs::read(install.path().join("mods/a.jar")).unwrap(), b"a2");
        assert!(install.path().join("mods/new.jar").is_file());
        assert!(!install.path().join("mods/old.jar").exists());
        assert_eq!(read_version(install.path()).as_deref(), Some("1.1"));

        let log = report.patchnote.unwrap();
        assert_eq!(log, install.path().join("install/version/patchnote_1.0-1.1.log"));
        let text = fs::read_to_string(log).unwrap();
        assert!(text.contains("[PATCHNOTE 1.0 -> 1.1]"));
        assert!(text.contains("mods/new.jar"));
    }

    #[test]
    fn published_ignore_rules_protect_local_files() {
        let repo = tempfile::tempdir().unwrap();
        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        pack_v1(v1.path());
        pack_v2(v2.path());
        write(v2.path(), CONFIG_FILE, br#"{"upgrade-ignore-remove": ["mods/old.jar"]}"#);

        let install = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(repo.path());
        publish(v1.path(), repo.path());
        upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();

        publish(v2.path(), repo.path());
        let report = upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();
        assert!(install.path().join("mods/old.jar").is_file());
        assert!(report.difference.removed().is_empty());
    }

    #[test]
    fn files_missed_by_a_partial_upgrade_are_retried() {
        let repo = tempfile::tempdir().unwrap();
        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        pack_v1(v1.path());
        pack_v2(v2.path());

        let install = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(repo.path());
        publish(v1.path(), repo.path());
        upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();

        let latest = publish(v2.path(), repo.path());
        let published = repo.path().join(VERSIONS_DIR).join(&latest.name).join("mods/a.jar");
        let parked = repo.path().join("a.jar.parked");
        fs::rename(&published, &parked).unwrap();

        let partial = upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();
        assert!(!partial.is_clean());
        assert_eq!(partial.download_failures.len(), 1);
        assert_eq!(partial.download_failures[0].path, "mods/a.jar");
        assert_eq!(fs::read(install.path().join("mods/a.jar")).unwrap(), b"a1");
        assert!(install.path().join("mods/new.jar").is_file());

        fs::rename(&parked, &published).unwrap();
        let retry = upgrade(install.path(), &source, &UpgradeOptions::default()).unwrap();
        assert!(retry.is_clean(), "{retry:?}");
        assert!(retry.difference.modified().contains("mods/a.jar"));
        assert!(retry.difference.added().is_empty());
        assert_eq!(fs::read(install.path().join("mods/a.jar")).unwrap(), b"a2");
    }

    #[test]
    fn reconciled_sidecar_keeps_previous_state_of_failures() {
        let hasher = dreams_types::FileHasher::FILE;
        let mut local = ContentManifest::new();
        local.insert("mods/a.jar", hasher.hash_bytes(b"a1"));
        let mut remote = ContentManifest::new();
        remote.insert("mods/a.jar", hasher.hash_bytes(b"a2"));
        remote.insert("mods/new.jar", hasher.hash_bytes(b"new"));
        remote.insert("mods/ok.jar", hasher.hash_bytes(b"ok"));

        let failed: BTreeSet<&str> = ["mods/a.jar", "mods/new.jar"].into_iter().collect();
        let sidecar = reconciled_sidecar(&remote, &local, &failed);
        assert_eq!(sidecar.get("mods/a.jar"), local.get("mods/a.jar"));
        assert!(!sidecar.contains("mods/new.jar"));
        assert_eq!(sidecar.get("mods/ok.jar"), remote.get("mods/ok.jar"));
    }

    #[test]
    fn server_installations_use_published_server_rules() {
        let repo = tempfile::tempdir().unwrap();
        let v1 = tempfile::tempdir().unwrap();
        let v2 = tempfile::tempdir().unwrap();
        pack_v1(v1.path());
        pack_v2(v2.path());
        write(v2.path(), SERVER_CONFIG_FILE, br#"{"upgrade-ignore-remove": ["mods/old.jar"]}"#);

        let source = DirectorySource::new(repo.path());
        publish(v1.path(), repo.path());
        let client = tempfile::tempdir().unwrap();
        let server = tempfile::tempdir().unwrap();
        upgrade(client.path(), &source, &UpgradeOptions::default()).unwrap();
        upgrade(server.path(), &source, &UpgradeOptions::default()).unwrap();
        write(server.path(), SERVER_MARKER_FILE, b"{}");
        write(server.path(), SERVER_CONFIG_FILE, b"{}");

        publish(v2.path(), repo.path());
        upgrade(client.path(), &source, &UpgradeOptions::default()).unwrap();
        upgrade(server.path(), &source, &UpgradeOptions::default()).unwrap();
        assert!(!client.path().join("mods/old.jar").exists());
        assert!(server.path().join("mods/old.jar").is_file());
    }

    #[test]
    fn fresh_installation_reports_unknown_old_version() {
        let repo = tempfile::tempdir().unwrap();
        let v1 = tempfile::tempdir().unwrap();
        pack_v1(v1.path());
        publish(v1.path(), repo.path());

        let install = tempfile::tempdir().unwrap();
        let report = upgrade(install.path(), &DirectorySource::new(repo.path()), &UpgradeOptions::default()).unwrap();
        assert_eq!(report.difference.old_version(), UNKNOWN_VERSION);
        assert!(install.path().join(DESCRIPTOR_FILE).is_file());
        assert_eq!(
            report.patchnote.unwrap(),
            install.path().join("install/version/patchnote_unknown-1.0.log")
        );
    }

    #[test]
    fn missing_installation_is_fatal() {
        let repo = tempfile::tempdir().unwrap();
        let missing = repo.path().join("nope");
        assert!(matches!(
            upgrade(&missing, &DirectorySource::new(repo.path()), &UpgradeOptions::default()),
            Err(UpgradeError::NotFound(_))
        ));
    }

    #[test]
    fn version_labels_become_file_safe() {
        assert_eq!(file_safe("1.2"), "1.2");
        assert_eq!(file_safe("?"), "unknown");
        assert_eq!(file_safe("beta/2 rc"), "beta_2_rc");
    }
}
