//! Release version identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A release version, conventionally `{epoch}.{feature}.{patch}`.
///
/// Parsing pads missing components with `0` and ignores anything past the
/// third component. The epoch is kept verbatim and is never incremented by
/// the toolkit. A zero patch is omitted when rendering, so `1.3.0` renders
/// as `1.3`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionIdentifier {
    pub epoch: String,
    pub feature: u64,
    pub patch: u64,
}

impl VersionIdentifier {
    /// Create a version from its components.
    pub fn new(epoch: impl Into<String>, feature: u64, patch: u64) -> Self {
        Self {
            epoch: epoch.into(),
            feature,
            patch,
        }
    }

    /// The next feature version: feature + 1, patch reset to 0.
    pub fn next_feature(&self) -> Result<Self, TypeError> {
        let feature = self
            .feature
            .checked_add(1)
            .ok_or_else(|| TypeError::VersionOverflow(self.to_string()))?;
        Ok(Self::new(self.epoch.clone(), feature, 0))
    }

    /// The next patch version.
    pub fn next_patch(&self) -> Result<Self, TypeError> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| TypeError::VersionOverflow(self.to_string()))?;
        Ok(Self::new(self.epoch.clone(), self.feature, patch))
    }
}

impl FromStr for VersionIdentifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: &str| TypeError::InvalidVersion {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("empty version"));
        }

        let mut parts = trimmed.split('.');
        let epoch = parts.next().unwrap_or_default();
        if epoch.is_empty() {
            return Err(invalid("empty epoch"));
        }
        let mut numeric = |name: &str| -> Result<u64, TypeError> {
            match parts.next() {
                None => Ok(0),
                Some(part) => part
                    .parse::<u64>()
                    .map_err(|_| invalid(&format!("{name} component {part:?} is not a non-negative integer"))),
            }
        };
        let feature = numeric("feature")?;
        let patch = numeric("patch")?;

        Ok(Self::new(epoch, feature, patch))
    }
}

impl TryFrom<String> for VersionIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionIdentifier> for String {
    fn from(version: VersionIdentifier) -> Self {
        version.to_string()
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.epoch, self.feature)?;
        if self.patch > 0 {
            write!(f, ".{}", self.patch)?;
        }
        Ok(())
    }
}
