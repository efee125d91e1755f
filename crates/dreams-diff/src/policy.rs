//! Version policy: infer the next version from the shape of a difference.

use dreams_types::filter::has_prefix;
use dreams_types::{TypeError, VersionIdentifier};

use crate::difference::ContentDifference;

/// Suggest the version following `current` for the change in `diff`.
///
/// Rules, in priority order:
/// 1. Files added or removed: feature bump (patch reset) if any of them lives
///    under `module_prefix`, patch bump otherwise.
/// 2. Only modified files: patch bump.
/// 3. No change: `current` is returned unchanged.
///
/// The epoch is never touched. Bumping a component already at `u64::MAX`
/// fails with [`TypeError::VersionOverflow`].
pub fn suggest_version(
    current: &VersionIdentifier,
    diff: &ContentDifference,
    module_prefix: &str,
) -> Result<VersionIdentifier, TypeError> {
    if !diff.added().is_empty() || !diff.removed().is_empty() {
        if diff.structural_paths().any(|p| has_prefix(p, module_prefix)) {
            current.next_feature()
        } else {
            current.next_patch()
        }
    } else if !diff.modified().is_empty() {
        current.next_patch()
    } else {
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difference::diff;
    use dreams_types::{ContentManifest, Fingerprint};

    fn manifest(entries: &[(&str, &str)]) -> ContentManifest {
        entries
            .iter()
            .map(|(p, f)| (p.to_string(), Fingerprint::from_sidecar(f)))
            .collect()
    }

    fn v(s: &str) -> VersionIdentifier {
        s.parse().unwrap()
    }

    #[test]
    fn modified_only_bumps_patch() {
        let d = diff(&manifest(&[("a.txt", "01")]), &manifest(&[("a.txt", "02")]));
        assert_eq!(suggest_version(&v("1.2.0"), &d, "mods").unwrap().to_string(), "1.2.1");
    }

    #[test]
    fn module_addition_bumps_feature_and_resets_patch() {
        let d = diff(&ContentManifest::new(), &manifest(&[("mods/foo.jar", "01")]));
        assert_eq!(suggest_version(&v("1.2.0"), &d, "mods").unwrap().to_string(), "1.3");
        assert_eq!(suggest_version(&v("1.2.7"), &d, "mods").unwrap().to_string(), "1.3");
    }

    #[test]
    fn module_removal_bumps_feature() {
        let d = diff(&manifest(&[("mods/old.jar", "01")]), &ContentManifest::new());
        assert_eq!(suggest_version(&v("2.0.4"), &d, "mods").unwrap().to_string(), "2.1");
    }

    #[test]
    fn non_module_addition_bumps_patch() {
        let d = diff(&ContentManifest::new(), &manifest(&[("config/new.toml", "01")]));
        assert_eq!(suggest_version(&v("1.2.3"), &d, "mods").unwrap().to_string(), "1.2.4");
    }

    #[test]
    fn structural_change_wins_over_modification() {
        let old = manifest(&[("config/a.toml", "01")]);
        let new = manifest(&[("config/a.toml", "02"), ("mods/x.jar", "03")]);
        let d = diff(&old, &new);
        assert_eq!(suggest_version(&v("1.2.3"), &d, "mods").unwrap().to_string(), "1.3");
    }

    #[test]
    fn empty_difference_keeps_version() {
        let m = manifest(&[("a.txt", "01")]);
        let d = diff(&m, &m);
        let current = v("1.2.0");
        assert_eq!(suggest_version(&current, &d, "mods").unwrap(), current);
        assert_eq!(suggest_version(&current, &d, "mods").unwrap().to_string(), "1.2");
    }

    #[test]
    fn epoch_is_never_bumped() {
        let d = diff(&ContentManifest::new(), &manifest(&[("mods/a.jar", "01")]));
        assert_eq!(suggest_version(&v("7.9.9"), &d, "mods").unwrap().epoch, "7");
    }

    #[test]
    fn exhausted_component_is_an_error() {
        let added = diff(&ContentManifest::new(), &manifest(&[("mods/a.jar", "01")]));
        assert!(matches!(
            suggest_version(&v("1.18446744073709551615"), &added, "mods"),
            Err(TypeError::VersionOverflow(_))
        ));

        let touched = diff(&manifest(&[("a.txt", "01")]), &manifest(&[("a.txt", "02")]));
        assert!(matches!(
            suggest_version(&v("1.2.18446744073709551615"), &touched, "mods"),
            Err(TypeError::VersionOverflow(_))
        ));
    }
}
