use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{Version, VersionClauses};

/// Selects the candidate versions of a package that a requirement admits.
///
/// Pre-releases and dev-releases are allowed by default; versions that don't follow PEP 440 are
/// kept unless `enforce_pep440` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct VersionFilter {
    /// Drop versions that don't follow PEP 440.
    pub enforce_pep440: bool,
    /// Keep alpha, beta and release candidate versions.
    pub allow_pre_releases: bool,
    /// Keep dev-releases.
    pub allow_dev_releases: bool,
}

impl Default for VersionFilter {
    fn default() -> Self {
        Self {
            enforce_pep440: false,
            allow_pre_releases: true,
            allow_dev_releases: true,
        }
    }
}

impl VersionFilter {
    /// Whether the version passes the release-kind checks, ignoring any clauses.
    pub fn allows(&self, version: &Version) -> bool {
        if version.is_pre_release() && !self.allow_pre_releases {
            return false;
        }
        if version.is_dev_release() && !self.allow_dev_releases {
            return false;
        }
        if !version.is_pep440_compliant() && self.enforce_pep440 {
            return false;
        }
        true
    }

    /// The versions that pass the filter and satisfy every clause, in ascending order.
    pub fn filter(
        &self,
        versions: impl IntoIterator<Item = Version>,
        clauses: &VersionClauses,
    ) -> Vec<Version> {
        versions
            .into_iter()
            .filter(|version| self.allows(version) && clauses.contains(version))
            .sorted()
            .collect()
    }
}
