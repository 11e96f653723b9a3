//! The OS payload pipeline.

use anyhow::Result;

use rpmmd::{PackageSet, RepoConfig};

use crate::blueprint::{
    DirectoryCustomization, FileCustomization, FirewallCustomization, GroupCustomization,
    UserCustomization,
};
use crate::disk::PartitionTable;
use crate::osbuild;
use crate::platform::Platform;

use super::{gpg_keys, Content};

/// Everything the OS pipeline writes into the tree beyond the packages:
/// the image type's defaults merged with the blueprint customizations,
/// flattened into one record.
#[derive(Debug, Clone, Default)]
pub struct OsCustomizations {
    pub hostname: Option<String>,
    pub language: Option<String>,
    pub keyboard: Option<String>,
    pub timezone: Option<String>,
    pub ntp_servers: Vec<String>,
    pub enabled_services: Vec<String>,
    pub disabled_services: Vec<String>,
    pub masked_services: Vec<String>,
    pub default_target: Option<String>,
    pub groups: Vec<GroupCustomization>,
    pub users: Vec<UserCustomization>,
    pub firewall: Option<FirewallCustomization>,
    pub sysconfig: Option<SysconfigSections>,
    /// journald drop-in: (filename, journal section).
    pub journald: Option<(String, osbuild::SystemdJournaldConfigJournalSection)>,
    pub sshd_config: Option<osbuild::SshdConfig>,
    pub oscap: Option<OscapConfig>,
    pub directories: Vec<DirectoryCustomization>,
    pub files: Vec<FileCustomization>,
    pub exclude_docs: bool,
    pub no_selinux: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SysconfigSections {
    pub kernel: Option<osbuild::SysconfigKernelOptions>,
    pub network: Option<osbuild::SysconfigNetworkOptions>,
}

#[derive(Debug, Clone)]
pub struct OscapConfig {
    pub datastream: String,
    pub profile_id: String,
    /// Set when the blueprint tailors the profile; the autotailor stage
    /// writes this file and remediation consumes it.
    pub tailoring: Option<OscapTailoringConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct OscapTailoringConfig {
    pub selected: Vec<String>,
    pub unselected: Vec<String>,
}

/// Marks the OS tree as the input of an ostree commit.
#[derive(Debug, Clone)]
pub struct OsTreeCommitInfo {
    pub commit_ref: String,
}

pub struct OsPipeline {
    pub platform: Platform,
    pub repos: Vec<RepoConfig>,
    pub chain: Vec<PackageSet>,
    pub partition_table: Option<PartitionTable>,
    /// Full kernel command line, base options plus blueprint append.
    pub kernel_options: Vec<String>,
    pub customizations: OsCustomizations,
    /// Present when this tree feeds an ostree commit pipeline.
    pub ostree: Option<OsTreeCommitInfo>,
}

impl OsPipeline {
    pub(crate) fn serialize(&self, content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("os");
        pipeline.build = Some("name:build".to_string());
        let custom = &self.customizations;

        pipeline.stages.push(osbuild::new_rpm_stage(
            osbuild::RpmStageOptions {
                gpgkeys: gpg_keys(&self.repos),
                exclude: custom.exclude_docs.then(|| osbuild::RpmExclude {
                    docs: Some(true),
                }),
                ostree_booted: self.ostree.is_some().then_some(true),
                ..Default::default()
            },
            content.packages("os"),
        ));

        if self.partition_table.is_some() {
            pipeline.stages.push(osbuild::new_fix_bls_stage(""));
        }

        if let Some(language) = &custom.language {
            pipeline.stages.push(osbuild::new_locale_stage(language));
        }
        if let Some(keyboard) = &custom.keyboard {
            pipeline.stages.push(osbuild::new_keymap_stage(keyboard));
        }
        if let Some(hostname) = &custom.hostname {
            pipeline.stages.push(osbuild::new_hostname_stage(hostname));
        }
        if let Some(timezone) = &custom.timezone {
            pipeline.stages.push(osbuild::new_timezone_stage(timezone));
        }
        if !custom.ntp_servers.is_empty() {
            pipeline
                .stages
                .push(osbuild::new_chrony_stage(custom.ntp_servers.clone()));
        }

        if !custom.groups.is_empty() {
            pipeline.stages.push(osbuild::new_groups_stage(&custom.groups));
        }
        if !custom.users.is_empty() {
            pipeline.stages.push(osbuild::new_users_stage(&custom.users));
        }

        let systemd = osbuild::SystemdStageOptions {
            enabled_services: custom.enabled_services.clone(),
            disabled_services: custom.disabled_services.clone(),
            masked_services: custom.masked_services.clone(),
            default_target: custom.default_target.clone(),
        };
        if !systemd.is_empty() {
            pipeline.stages.push(osbuild::new_systemd_stage(systemd));
        }

        if let Some(firewall) = &custom.firewall {
            pipeline
                .stages
                .push(osbuild::new_firewall_stage(firewall.into()));
        }

        if let Some((filename, journal)) = &custom.journald {
            pipeline.stages.push(osbuild::new_systemd_journald_stage(
                osbuild::SystemdJournaldStageOptions {
                    filename: filename.clone(),
                    config: osbuild::SystemdJournaldConfigDropin {
                        journal: journal.clone(),
                    },
                },
            ));
        }

        if let Some(sysconfig) = &custom.sysconfig {
            pipeline.stages.push(osbuild::new_sysconfig_stage(
                osbuild::SysconfigStageOptions {
                    kernel: sysconfig.kernel.clone(),
                    network: sysconfig.network.clone(),
                },
            ));
        }

        if let Some(sshd) = &custom.sshd_config {
            pipeline
                .stages
                .push(osbuild::new_sshd_config_stage(sshd.clone()));
        }

        if let Some(oscap) = &custom.oscap {
            let tailoring_path = oscap.tailoring.as_ref().map(|tailoring| {
                let path = "/oscap_data/tailoring.xml".to_string();
                pipeline.stages.push(osbuild::new_oscap_autotailor_stage(
                    &path,
                    osbuild::OscapAutotailorConfig {
                        datastream: oscap.datastream.clone(),
                        profile_id: oscap.profile_id.clone(),
                        new_profile: format!("{}_osbuild_tailoring", oscap.profile_id),
                        selected: tailoring.selected.clone(),
                        unselected: tailoring.unselected.clone(),
                    },
                ));
                path
            });
            pipeline.stages.push(osbuild::new_oscap_remediation_stage(
                Some("/oscap_data".to_string()),
                osbuild::OscapRemediationConfig {
                    datastream: oscap.datastream.clone(),
                    profile_id: oscap.profile_id.clone(),
                    tailoring_path,
                },
            ));
        }

        if !custom.directories.is_empty() {
            pipeline
                .stages
                .push(osbuild::new_mkdir_stage(&custom.directories));
        }
        if !custom.files.is_empty() {
            pipeline
                .stages
                .push(osbuild::new_write_files_stage(&custom.files));
        }

        if let Some(pt) = &self.partition_table {
            pipeline.stages.push(osbuild::new_fstab_stage(pt));

            if self.platform.zipl_support() {
                pipeline.stages.push(osbuild::new_zipl_stage());
            } else {
                let root = pt
                    .find_mountpoint("/")
                    .and_then(|fs| fs.uuid.clone())
                    .unwrap_or_default();
                let boot = pt.find_mountpoint("/boot").and_then(|fs| fs.uuid.clone());
                pipeline
                    .stages
                    .push(osbuild::new_grub2_stage(osbuild::Grub2StageOptions {
                        root_fs_uuid: root,
                        boot_fs_uuid: boot,
                        kernel_opts: (!self.kernel_options.is_empty())
                            .then(|| self.kernel_options.join(" ")),
                        legacy: self.platform.bios_platform().map(str::to_string),
                        uefi: self.platform.uefi_vendor().map(|vendor| osbuild::Grub2Uefi {
                            vendor: vendor.to_string(),
                            unified: None,
                        }),
                        write_defaults: None,
                    }));
            }
        }

        if self.ostree.is_some() {
            pipeline.stages.push(osbuild::new_ostree_preptree_stage(vec![
                "wheel".to_string(),
                "docker".to_string(),
            ]));
        }

        if !custom.no_selinux {
            pipeline.stages.push(osbuild::new_selinux_stage(
                "etc/selinux/targeted/contexts/files/file_contexts",
            ));
        }

        Ok(pipeline)
    }
}
