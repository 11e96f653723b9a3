//! Loading of on-disk repository definitions.
//!
//! Repository definitions live in JSON files named after the distribution
//! (`<dir>/fedora-38.json`), each mapping an architecture name to the list
//! of repositories to solve against on that architecture.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::RepoConfig;

/// One repository record as written in the definition files. Slightly looser
/// than [`RepoConfig`]: a single `baseurl` string and no package-set tags.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct RepoDefinition {
    name: String,
    #[serde(default)]
    baseurl: Option<String>,
    #[serde(default)]
    metalink: Option<String>,
    #[serde(default)]
    mirrorlist: Option<String>,
    #[serde(default)]
    gpgkey: Option<String>,
    #[serde(default)]
    check_gpg: Option<bool>,
    #[serde(default)]
    module_hotfixes: Option<bool>,
}

impl RepoDefinition {
    fn into_config(self) -> RepoConfig {
        RepoConfig {
            id: self.name.to_lowercase().replace(' ', "-"),
            name: Some(self.name),
            base_urls: self.baseurl.into_iter().collect(),
            metalink: self.metalink,
            mirrorlist: self.mirrorlist,
            gpg_keys: self.gpgkey.into_iter().collect(),
            check_gpg: self.check_gpg,
            module_hotfixes: self.module_hotfixes,
            ..Default::default()
        }
    }
}

/// Load repository definitions for a distribution.
///
/// Searches `<dir>/<distro>.json` in each of `dirs` in order; the first
/// file found wins. Returns a map from architecture name to repositories.
pub fn load_repositories(
    dirs: &[impl AsRef<Path>],
    distro: &str,
) -> Result<BTreeMap<String, Vec<RepoConfig>>> {
    let filename = format!("{distro}.json");
    for dir in dirs {
        let path = dir.as_ref().join(&filename);
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading repository definitions from {}", path.display()))?;
        let per_arch: BTreeMap<String, Vec<RepoDefinition>> = serde_json::from_str(&content)
            .with_context(|| format!("parsing repository definitions from {}", path.display()))?;

        return Ok(per_arch
            .into_iter()
            .map(|(arch, defs)| {
                (
                    arch,
                    defs.into_iter().map(RepoDefinition::into_config).collect(),
                )
            })
            .collect());
    }
    bail!("no repository definitions found for distribution '{distro}'");
}
