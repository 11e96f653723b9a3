//! RPM metadata model.
//!
//! These types describe what goes *into* a depsolve (package sets and
//! repository configurations) and what comes *out* of one (resolved package
//! specs). They are shared between the planner, which assembles package-set
//! chains per image type, and the dnf-json solver client, which turns chains
//! into concrete NEVRA-pinned specs.

pub mod repository;

pub use repository::load_repositories;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named collection of package constraints plus the repositories they are
/// resolved against.
///
/// Chains of package sets are solved as consecutive transactions: a later
/// set's `exclude` may remove packages that an earlier set pulled in.
/// Identity is positional, not by content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSet {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepoConfig>,
}

impl PackageSet {
    /// Concatenate another set onto this one, preserving order of both
    /// name lists and repository lists.
    #[must_use]
    pub fn append(mut self, other: PackageSet) -> PackageSet {
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
        self.repositories.extend(other.repositories);
        self
    }
}

/// Configuration of an RPM repository.
///
/// The `package_sets` field tags which named package sets this repository
/// applies to. An empty list means the repository applies to every set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpg_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_gpg: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_hotfixes: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_modules: Vec<String>,
    /// Checksum of the repository metadata, when already known. Feeds the
    /// depsolve request fingerprint so a metadata refresh invalidates
    /// cached solutions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_checksum: Option<String>,
    /// Names of the package sets this repository applies to; empty applies
    /// to all sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_sets: Vec<String>,
}

impl RepoConfig {
    pub fn applies_to(&self, set_name: &str) -> bool {
        self.package_sets.is_empty() || self.package_sets.iter().any(|s| s == set_name)
    }
}

/// A resolved RPM dependency, as returned by the depsolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub epoch: u64,
    pub version: String,
    pub release: String,
    pub arch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_location: String,
    /// `algorithm:hexdigest`, e.g. `sha256:5891b5b5...`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_gpg: Option<bool>,
}

impl PackageSpec {
    /// Full NEVRA string, epoch included only when non-zero.
    pub fn nevra(&self) -> String {
        if self.epoch == 0 {
            format!("{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
        } else {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        }
    }

    /// Split the checksum into `(algorithm, hexdigest)`.
    pub fn checksum_parts(&self) -> Option<(&str, &str)> {
        self.checksum.split_once(':')
    }
}

/// Find a package by name in a resolved set.
pub fn find_package<'a>(specs: &'a [PackageSpec], name: &str) -> Option<&'a PackageSpec> {
    specs.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(include: &[&str], exclude: &[&str]) -> PackageSet {
        PackageSet {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            repositories: Vec::new(),
        }
    }

    #[test]
    fn append_preserves_order() {
        let merged = set(&["kernel", "dracut"], &["docs"]).append(set(&["bash"], &["nano"]));
        assert_eq!(merged.include, vec!["kernel", "dracut", "bash"]);
        assert_eq!(merged.exclude, vec!["docs", "nano"]);
    }

    #[test]
    fn append_concatenates_repositories() {
        let mut a = set(&["kernel"], &[]);
        a.repositories.push(RepoConfig {
            id: "baseos".into(),
            ..Default::default()
        });
        let mut b = set(&[], &[]);
        b.repositories.push(RepoConfig {
            id: "appstream".into(),
            ..Default::default()
        });
        let merged = a.append(b);
        assert_eq!(merged.repositories.len(), 2);
        assert_eq!(merged.repositories[0].id, "baseos");
        assert_eq!(merged.repositories[1].id, "appstream");
    }

    #[test]
    fn repo_applies_to_all_sets_when_untagged() {
        let repo = RepoConfig::default();
        assert!(repo.applies_to("os"));
        assert!(repo.applies_to("build"));
    }

    #[test]
    fn repo_applies_only_to_tagged_sets() {
        let repo = RepoConfig {
            package_sets: vec!["blueprint".into()],
            ..Default::default()
        };
        assert!(repo.applies_to("blueprint"));
        assert!(!repo.applies_to("os"));
    }

    #[test]
    fn nevra_omits_zero_epoch() {
        let spec = PackageSpec {
            name: "bash".into(),
            epoch: 0,
            version: "5.2.15".into(),
            release: "3.fc38".into(),
            arch: "x86_64".into(),
            ..Default::default()
        };
        assert_eq!(spec.nevra(), "bash-5.2.15-3.fc38.x86_64");
    }

    #[test]
    fn nevra_includes_nonzero_epoch() {
        let spec = PackageSpec {
            name: "openssl".into(),
            epoch: 1,
            version: "3.0.9".into(),
            release: "2.fc38".into(),
            arch: "aarch64".into(),
            ..Default::default()
        };
        assert_eq!(spec.nevra(), "openssl-1:3.0.9-2.fc38.aarch64");
    }

    #[test]
    fn checksum_parts_splits_algorithm() {
        let spec = PackageSpec {
            checksum: "sha256:abcd".into(),
            ..Default::default()
        };
        assert_eq!(spec.checksum_parts(), Some(("sha256", "abcd")));
    }
}
