//! OSTree commit, container, and deployment pipelines.

use anyhow::Result;

use rpmmd::{PackageSet, RepoConfig};

use crate::disk::PartitionTable;
use crate::osbuild;

use super::{gpg_keys, Content};

/// Commits the OS tree into an archive-mode repository at /repo.
pub struct OstreeCommitPipeline {
    pub tree_pipeline: String,
    pub commit_ref: String,
    pub os_version: String,
    pub parent: Option<String>,
}

impl OstreeCommitPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("ostree-commit");
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_ostree_init_stage("/repo"));
        pipeline.stages.push(osbuild::new_ostree_commit_stage(
            &self.commit_ref,
            &self.os_version,
            self.parent.clone(),
            &self.tree_pipeline,
        ));
        Ok(pipeline)
    }
}

/// A tree serving the commit repository over HTTP, the payload of the
/// iot/edge container.
pub struct ContainerTreePipeline {
    pub commit_pipeline: String,
    pub commit_ref: String,
    pub repos: Vec<RepoConfig>,
    pub chain: Vec<PackageSet>,
}

impl ContainerTreePipeline {
    pub(crate) fn serialize(&self, content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("container-tree");
        pipeline.build = Some("name:build".to_string());

        let packages = content.packages("container");
        if !packages.is_empty() {
            pipeline.stages.push(osbuild::new_rpm_stage(
                osbuild::RpmStageOptions {
                    gpgkeys: gpg_keys(&self.repos),
                    ..Default::default()
                },
                packages,
            ));
        }

        pipeline
            .stages
            .push(osbuild::new_ostree_init_stage("/usr/share/ostree/repo"));
        pipeline.stages.push(osbuild::new_ostree_pull_stage(
            "/usr/share/ostree/repo",
            &self.commit_pipeline,
            &self.commit_ref,
        ));
        Ok(pipeline)
    }
}

/// Encodes a tree as an OCI archive.
pub struct OciContainerPipeline {
    pub tree_pipeline: String,
    pub filename: String,
    pub architecture: String,
}

impl OciContainerPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("container");
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_oci_archive_stage(
            &self.filename,
            &self.architecture,
            &self.tree_pipeline,
        ));
        Ok(pipeline)
    }
}

/// Where a deployment's commit comes from.
pub enum CommitSource {
    /// Built by a pipeline in this manifest.
    Pipeline { name: String, commit_ref: String },
    /// Fetched from a remote repository; the checksum is registered in
    /// the manifest sources.
    Remote { checksum: String, commit_ref: String },
}

/// Deploys a commit into a bootable sysroot tree.
pub struct OstreeDeploymentPipeline {
    pub source: CommitSource,
    pub osname: String,
    pub kernel_options: Vec<String>,
    pub partition_table: PartitionTable,
}

impl OstreeDeploymentPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("ostree-deployment");
        pipeline.build = Some("name:build".to_string());

        pipeline.stages.push(osbuild::Stage::bare("org.osbuild.ostree.init-fs"));
        pipeline
            .stages
            .push(osbuild::new_ostree_os_init_stage(&self.osname));

        let (pull, deploy_ref) = match &self.source {
            CommitSource::Pipeline { name, commit_ref } => (
                osbuild::new_ostree_pull_stage("/ostree/repo", name, commit_ref),
                commit_ref.clone(),
            ),
            CommitSource::Remote { checksum, commit_ref } => {
                let stage = osbuild::Stage::new(
                    "org.osbuild.ostree.pull",
                    osbuild::StageOptions::OstreePull(osbuild::OstreePullStageOptions {
                        repo: "/ostree/repo".to_string(),
                        remote: None,
                    }),
                )
                .with_input("commits", osbuild::Input::ostree_commit_from_source(checksum));
                (stage, commit_ref.clone())
            }
        };
        pipeline.stages.push(pull);

        let root_label = self
            .partition_table
            .find_mountpoint("/")
            .and_then(|fs| fs.label.clone())
            .unwrap_or_else(|| "root".to_string());
        let mounts = self
            .partition_table
            .filesystems()
            .iter()
            .filter(|fs| fs.mountpoint.starts_with("/boot"))
            .map(|fs| fs.mountpoint.clone())
            .collect();
        pipeline.stages.push(osbuild::new_ostree_deploy_stage(
            osbuild::OstreeDeployStageOptions {
                osname: self.osname.clone(),
                deploy_ref,
                mounts,
                rootfs: osbuild::OstreeDeployRootfs { label: root_label },
                kernel_opts: self.kernel_options.clone(),
            },
        ));

        pipeline.stages.push(osbuild::new_ostree_config_stage(
            "/ostree/repo",
            osbuild::OstreeRepoConfig {
                sysroot: Some(osbuild::OstreeSysrootConfig {
                    readonly: Some(true),
                    bootloader: Some("none".to_string()),
                }),
            },
        ));

        pipeline
            .stages
            .push(osbuild::new_fstab_stage(&self.partition_table));

        let pt = &self.partition_table;
        let root_uuid = pt
            .find_mountpoint("/")
            .and_then(|fs| fs.uuid.clone())
            .unwrap_or_default();
        pipeline
            .stages
            .push(osbuild::new_grub2_stage(osbuild::Grub2StageOptions {
                root_fs_uuid: root_uuid,
                boot_fs_uuid: pt.find_mountpoint("/boot").and_then(|fs| fs.uuid.clone()),
                kernel_opts: (!self.kernel_options.is_empty())
                    .then(|| self.kernel_options.join(" ")),
                legacy: None,
                uefi: None,
                write_defaults: Some(false),
            }));

        Ok(pipeline)
    }
}
