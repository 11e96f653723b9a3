//! Wire format of the dnf-json solver protocol.
//!
//! One request is written to the solver's stdin as a single JSON document,
//! one response is read back from its stdout. The response is either a
//! result document or an `{kind, reason}` error document; the exit status
//! alone does not distinguish solver errors from transport failures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rpmmd::{PackageSpec, RepoConfig};

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub command: &'static str,
    pub arch: String,
    pub module_platform_id: String,
    pub releasever: String,
    pub cachedir: String,
    pub arguments: Arguments,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct Arguments {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<WireRepo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<Search>,
}

/// One package-set transaction. Transactions apply in order; excludes in a
/// later transaction may remove packages installed by an earlier one.
#[derive(Debug, Serialize)]
pub(crate) struct Transaction {
    #[serde(rename = "package-specs")]
    pub package_specs: Vec<String>,
    #[serde(rename = "exclude-specs", skip_serializing_if = "Vec::is_empty")]
    pub exclude_specs: Vec<String>,
    #[serde(rename = "repo-ids")]
    pub repo_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Search {
    pub packages: Vec<String>,
}

/// Repository as the solver wants to see it.
#[derive(Debug, Serialize)]
pub(crate) struct WireRepo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub baseurl: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
    pub gpgcheck: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sslverify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_hotfixes: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled_modules: Vec<String>,
}

impl WireRepo {
    pub(crate) fn from_config(repo: &RepoConfig, fallback_id: String) -> WireRepo {
        WireRepo {
            id: if repo.id.is_empty() {
                fallback_id
            } else {
                repo.id.clone()
            },
            name: repo.name.clone(),
            baseurl: repo.base_urls.clone(),
            metalink: repo.metalink.clone(),
            mirrorlist: repo.mirrorlist.clone(),
            gpgkeys: repo.gpg_keys.clone(),
            gpgcheck: repo.check_gpg.unwrap_or(true),
            sslverify: repo.ignore_ssl.map(|ignore| !ignore),
            module_hotfixes: repo.module_hotfixes,
            enabled_modules: repo.enabled_modules.clone(),
        }
    }
}

/// Successful result document.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub solver: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
    #[serde(default)]
    pub repos: BTreeMap<String, serde_json::Value>,
}

/// Error result document.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

/// Package metadata as returned by `search` and `dump`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Result document for the metadata commands.
#[derive(Debug, Deserialize)]
pub(crate) struct MetadataResponse {
    #[serde(default)]
    pub packages: Vec<PackageInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_uses_wire_field_names() {
        let tx = Transaction {
            package_specs: vec!["kernel".into()],
            exclude_specs: vec!["docs".into()],
            repo_ids: vec!["baseos".into()],
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("package-specs").is_some());
        assert!(json.get("exclude-specs").is_some());
        assert!(json.get("repo-ids").is_some());
    }

    #[test]
    fn wire_repo_defaults_gpgcheck_on() {
        let repo = RepoConfig {
            base_urls: vec!["https://example.org/".into()],
            ..Default::default()
        };
        let wire = WireRepo::from_config(&repo, "repo-0".into());
        assert_eq!(wire.id, "repo-0");
        assert!(wire.gpgcheck);
    }

    #[test]
    fn wire_repo_inverts_ignore_ssl() {
        let repo = RepoConfig {
            id: "nightly".into(),
            ignore_ssl: Some(true),
            ..Default::default()
        };
        let wire = WireRepo::from_config(&repo, "unused".into());
        assert_eq!(wire.id, "nightly");
        assert_eq!(wire.sslverify, Some(false));
    }

    #[test]
    fn response_parses_packages() {
        let doc = r#"{
            "solver": "dnf5",
            "packages": [
                {"name": "bash", "epoch": 0, "version": "5.2.15", "release": "3.fc38",
                 "arch": "x86_64", "repo_id": "fedora",
                 "remote_location": "https://example.org/bash.rpm",
                 "checksum": "sha256:00aa"}
            ],
            "repos": {"fedora": {}}
        }"#;
        let resp: Response = serde_json::from_str(doc).unwrap();
        assert_eq!(resp.solver.as_deref(), Some("dnf5"));
        assert_eq!(resp.packages.len(), 1);
        assert_eq!(resp.packages[0].nevra(), "bash-5.2.15-3.fc38.x86_64");
        assert!(resp.repos.contains_key("fedora"));
    }
}
