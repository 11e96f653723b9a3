//! User-facing blueprint model.
//!
//! A blueprint declares what should be in an image: extra packages,
//! embedded containers, and a set of typed customizations. Validation of
//! customizations against image-type policy happens in the planner, not in
//! whatever loads the blueprint.

use anyhow::{bail, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pathpolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Blueprint {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

impl Blueprint {
    /// Package names to overlay onto the OS payload.
    pub fn package_names(&self) -> Vec<String> {
        self.packages
            .iter()
            .map(|p| match &p.version {
                Some(version) if !version.is_empty() && version != "*" => {
                    format!("{}-{}", p.name, version)
                }
                _ => p.name.clone(),
            })
            .collect()
    }

    pub fn customizations(&self) -> Customizations {
        self.customizations.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A container image to embed into the OS payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Container {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Customizations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sshkey: Vec<SshKeyCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user: Vec<UserCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<GroupCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<TimezoneCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<LocaleCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall: Option<FirewallCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServicesCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filesystem: Vec<FilesystemCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdo: Option<FdoCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openscap: Option<OpenScapCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition: Option<IgnitionCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<DirectoryCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileCustomization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryCustomization>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct KernelCustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub append: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SshKeyCustomization {
    pub user: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserCustomization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GroupCustomization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TimezoneCustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntpservers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LocaleCustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FirewallCustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<FirewallServices>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<FirewallZone>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FirewallServices {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FirewallZone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ServicesCustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilesystemCustomization {
    pub mountpoint: String,
    /// Minimum size in bytes.
    #[serde(default)]
    pub minsize: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FdoCustomization {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manufacturing_server_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diun_pub_key_insecure: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diun_pub_key_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diun_pub_key_root_certs: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OpenScapCustomization {
    pub datastream: String,
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailoring: Option<OpenScapTailoring>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OpenScapTailoring {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unselected: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct IgnitionCustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<IgnitionEmbedded>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstboot: Option<IgnitionFirstboot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct IgnitionEmbedded {
    pub config: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct IgnitionFirstboot {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryCustomization {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub ensure_parents: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FileCustomization {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

/// A third-party repository baked into the image (as opposed to the
/// repositories the image is *built* from).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryCustomization {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub baseurls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Customizations {
    /// The effective kernel customization; the package name defaults to
    /// `kernel` when unset.
    pub fn kernel(&self) -> KernelCustomization {
        let mut kernel = self.kernel.clone().unwrap_or_default();
        if kernel.name.as_deref().unwrap_or("").is_empty() {
            kernel.name = Some("kernel".to_string());
        }
        kernel
    }

    /// Every customization field that is set, by its blueprint name.
    fn set_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut add = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        add(self.hostname.is_some(), "Hostname");
        add(self.kernel.is_some(), "Kernel");
        add(!self.sshkey.is_empty(), "SSHKey");
        add(!self.user.is_empty(), "User");
        add(!self.group.is_empty(), "Group");
        add(self.timezone.is_some(), "Timezone");
        add(self.locale.is_some(), "Locale");
        add(self.firewall.is_some(), "Firewall");
        add(self.services.is_some(), "Services");
        add(!self.filesystem.is_empty(), "Filesystem");
        add(self.installation_device.is_some(), "InstallationDevice");
        add(self.fdo.is_some(), "FDO");
        add(self.openscap.is_some(), "OpenSCAP");
        add(self.ignition.is_some(), "Ignition");
        add(!self.directories.is_empty(), "Directories");
        add(!self.files.is_empty(), "Files");
        add(!self.repositories.is_empty(), "Repositories");
        fields
    }

    /// Error unless every set customization is in the allow-list.
    pub fn check_allowed(&self, allowed: &[&str]) -> Result<()> {
        for field in self.set_fields() {
            if !allowed.contains(&field) {
                bail!("'{field}' is not allowed");
            }
        }
        Ok(())
    }

    /// Validate `Directories` and `Files` against each other and against
    /// the path policies: duplicate paths and file/directory collisions
    /// are rejected before any policy lookup.
    pub fn validate_dir_file_customizations(&self) -> Result<()> {
        let mut dir_paths: Vec<&str> = self.directories.iter().map(|d| d.path.as_str()).collect();
        dir_paths.sort_unstable();
        if dir_paths.windows(2).any(|w| w[0] == w[1]) {
            bail!("duplicate directory customization paths");
        }

        let mut file_paths: Vec<&str> = self.files.iter().map(|f| f.path.as_str()).collect();
        file_paths.sort_unstable();
        if file_paths.windows(2).any(|w| w[0] == w[1]) {
            bail!("duplicate file customization paths");
        }

        for file in &self.files {
            if dir_paths.iter().any(|d| *d == file.path) {
                bail!(
                    "path {:?} is used as both a file and a directory customization",
                    file.path
                );
            }
        }

        let dir_policy = pathpolicy::custom_directories_policies();
        for dir in &self.directories {
            dir_policy.check(&dir.path)?;
        }
        let file_policy = pathpolicy::custom_files_policies();
        for file in &self.files {
            file_policy.check(&file.path)?;
        }
        Ok(())
    }

    /// Validate repository customizations: each needs an id and at least
    /// one of baseurls, metalink, or mirrorlist.
    pub fn check_repositories(&self) -> Result<()> {
        for repo in &self.repositories {
            if repo.id.is_empty() {
                bail!("repository customization without an id");
            }
            if repo.baseurls.is_empty() && repo.metalink.is_none() && repo.mirrorlist.is_none() {
                bail!(
                    "repository customization {:?} needs at least one of baseurls, metalink, or mirrorlist",
                    repo.id
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names_carry_pinned_versions() {
        let bp = Blueprint {
            packages: vec![
                Package { name: "bind".into(), version: None },
                Package { name: "tmux".into(), version: Some("*".into()) },
                Package { name: "vim".into(), version: Some("9.0".into()) },
            ],
            ..Default::default()
        };
        assert_eq!(bp.package_names(), vec!["bind", "tmux", "vim-9.0"]);
    }

    #[test]
    fn kernel_name_defaults() {
        let custom = Customizations::default();
        assert_eq!(custom.kernel().name.as_deref(), Some("kernel"));

        let custom = Customizations {
            kernel: Some(KernelCustomization {
                name: Some("kernel-rt".into()),
                append: String::new(),
            }),
            ..Default::default()
        };
        assert_eq!(custom.kernel().name.as_deref(), Some("kernel-rt"));
    }

    #[test]
    fn check_allowed_accepts_listed_fields() {
        let custom = Customizations {
            user: vec![UserCustomization { name: "admin".into(), ..Default::default() }],
            group: vec![GroupCustomization { name: "admins".into(), gid: None }],
            ..Default::default()
        };
        assert!(custom.check_allowed(&["User", "Group"]).is_ok());
    }

    #[test]
    fn check_allowed_rejects_unlisted_fields() {
        let custom = Customizations {
            hostname: Some("edge-node".into()),
            ..Default::default()
        };
        let err = custom.check_allowed(&["User", "Group"]).unwrap_err();
        assert!(err.to_string().contains("Hostname"));
    }

    #[test]
    fn file_and_directory_collisions_are_rejected() {
        let custom = Customizations {
            directories: vec![DirectoryCustomization {
                path: "/etc/app".into(),
                ..Default::default()
            }],
            files: vec![FileCustomization {
                path: "/etc/app".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(custom.validate_dir_file_customizations().is_err());
    }

    #[test]
    fn files_under_usr_are_rejected() {
        let custom = Customizations {
            files: vec![FileCustomization {
                path: "/usr/share/app/config".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(custom.validate_dir_file_customizations().is_err());
    }

    #[test]
    fn repositories_need_a_source() {
        let custom = Customizations {
            repositories: vec![RepositoryCustomization {
                id: "extras".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(custom.check_repositories().is_err());
    }
}
