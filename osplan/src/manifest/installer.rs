//! Boot ISO pipelines: the anaconda tree, its rootfs image, the EFI boot
//! tree, the ISO tree, and the final ISO.

use std::collections::BTreeMap;

use anyhow::Result;

use rpmmd::{PackageSet, RepoConfig};

use crate::blueprint::{GroupCustomization, UserCustomization};
use crate::disk::MIB;
use crate::osbuild;
use crate::platform::X86_64;

use super::{gpg_keys, Content};

/// Product identity stamped into the installer.
#[derive(Debug, Clone)]
pub struct InstallerInfo {
    pub product: String,
    pub os_version: String,
    pub variant: String,
    pub isolabel: String,
    pub arch: String,
    pub vendor: String,
}

/// The anaconda runtime tree.
pub struct AnacondaTreePipeline {
    pub info: InstallerInfo,
    pub repos: Vec<RepoConfig>,
    pub chain: Vec<PackageSet>,
    /// Users and groups preconfigured in the installer environment.
    pub users: Vec<UserCustomization>,
    pub groups: Vec<GroupCustomization>,
}

impl AnacondaTreePipeline {
    pub(crate) fn serialize(&self, content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("anaconda-tree");
        pipeline.build = Some("name:build".to_string());

        pipeline.stages.push(osbuild::new_rpm_stage(
            osbuild::RpmStageOptions {
                gpgkeys: gpg_keys(&self.repos),
                ..Default::default()
            },
            content.packages("installer"),
        ));

        pipeline
            .stages
            .push(osbuild::new_buildstamp_stage(osbuild::BuildstampStageOptions {
                arch: self.info.arch.clone(),
                product: self.info.product.clone(),
                version: self.info.os_version.clone(),
                final_build: true,
                variant: self.info.variant.clone(),
            }));
        pipeline.stages.push(osbuild::new_locale_stage("en_US.UTF-8"));

        if !self.groups.is_empty() {
            pipeline.stages.push(osbuild::new_groups_stage(&self.groups));
        }
        if !self.users.is_empty() {
            pipeline.stages.push(osbuild::new_users_stage(&self.users));
        }

        let mut modules = osbuild::anaconda_default_modules();
        if !self.users.is_empty() || !self.groups.is_empty() {
            modules.push("org.fedoraproject.Anaconda.Modules.Security".to_string());
        }
        pipeline.stages.push(osbuild::new_anaconda_stage(modules));

        Ok(pipeline)
    }
}

/// An ext4 image of the anaconda tree, shipped as images/install.img.
pub struct RootfsImagePipeline {
    pub tree_pipeline: String,
    pub size: u64,
    /// Filesystem UUID, drawn from the request RNG.
    pub uuid: String,
}

impl RootfsImagePipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("rootfs-image");
        pipeline.build = Some("name:build".to_string());

        let filename = "rootfs.img";
        pipeline
            .stages
            .push(osbuild::new_truncate_stage(filename, self.size));

        let mut devices = BTreeMap::new();
        devices.insert(
            "device".to_string(),
            osbuild::Device::loopback(filename, 0, self.size / 512),
        );
        pipeline.stages.push(osbuild::new_mkfs_stage(
            "ext4",
            &self.uuid,
            Some("Anaconda".to_string()),
            devices,
        ));

        let mut devices = BTreeMap::new();
        devices.insert(
            "device".to_string(),
            osbuild::Device::loopback(filename, 0, self.size / 512),
        );
        let mut copy = osbuild::new_copy_tree_stage(&self.tree_pipeline, "mount://root/")
            .with_devices(devices);
        copy.mounts = Some(vec![osbuild::Mount::new("root", "ext4", "device", "/")]);
        pipeline.stages.push(copy);

        Ok(pipeline)
    }
}

/// The EFI system partition tree with the ISO grub menu.
pub struct EfibootTreePipeline {
    pub info: InstallerInfo,
    pub kernel_opts: Vec<String>,
}

impl EfibootTreePipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("efiboot-tree");
        pipeline.build = Some("name:build".to_string());
        pipeline.stages.push(osbuild::new_grub2_iso_stage(
            osbuild::Grub2IsoStageOptions {
                product: osbuild::IsoProduct {
                    name: self.info.product.clone(),
                    version: self.info.os_version.clone(),
                },
                kernel: osbuild::IsoKernel {
                    dir: "/images/pxeboot".to_string(),
                    opts: self.kernel_opts.clone(),
                },
                isolabel: self.info.isolabel.clone(),
                architectures: vec![match self.info.arch.as_str() {
                    X86_64 => "X64".to_string(),
                    _ => "AA64".to_string(),
                }],
                vendor: self.info.vendor.clone(),
            },
        ));
        Ok(pipeline)
    }
}

/// What the installer installs.
pub enum IsoPayload {
    /// A squashfs of a plain OS tree.
    OsTree { os_pipeline: String },
    /// An ostree commit built by a pipeline in this manifest.
    OstreeCommit {
        commit_pipeline: String,
        commit_ref: String,
    },
    /// A remote ostree commit registered in the manifest sources.
    OstreeRemote { checksum: String },
}

/// Assembles the ISO's directory tree.
pub struct BootisoTreePipeline {
    pub info: InstallerInfo,
    pub payload: IsoPayload,
    pub kernel_opts: Vec<String>,
}

impl BootisoTreePipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("bootiso-tree");
        pipeline.build = Some("name:build".to_string());

        pipeline.stages.push(osbuild::new_mkdir_stage(&[
            crate::blueprint::DirectoryCustomization {
                path: "/images".to_string(),
                ensure_parents: true,
                ..Default::default()
            },
            crate::blueprint::DirectoryCustomization {
                path: "/images/pxeboot".to_string(),
                ensure_parents: true,
                ..Default::default()
            },
        ]));

        // kernel and initrd from the anaconda tree, the runtime image
        // from the rootfs pipeline
        let mut kernel_copy =
            osbuild::new_copy_tree_stage("anaconda-tree", "tree:///images/pxeboot/");
        kernel_copy.options = Some(osbuild::StageOptions::Copy(osbuild::CopyStageOptions {
            paths: vec![
                osbuild::CopyPath {
                    from: "input://tree/boot/vmlinuz".to_string(),
                    to: "tree:///images/pxeboot/vmlinuz".to_string(),
                },
                osbuild::CopyPath {
                    from: "input://tree/boot/initrd.img".to_string(),
                    to: "tree:///images/pxeboot/initrd.img".to_string(),
                },
            ],
        }));
        pipeline.stages.push(kernel_copy);

        let mut rootfs_copy = osbuild::new_copy_tree_stage("rootfs-image", "tree:///images/");
        rootfs_copy.options = Some(osbuild::StageOptions::Copy(osbuild::CopyStageOptions {
            paths: vec![osbuild::CopyPath {
                from: "input://tree/rootfs.img".to_string(),
                to: "tree:///images/install.img".to_string(),
            }],
        }));
        pipeline.stages.push(rootfs_copy);

        match &self.payload {
            IsoPayload::OsTree { os_pipeline } => {
                pipeline
                    .stages
                    .push(osbuild::new_squashfs_stage("liveos/squashfs.img", os_pipeline));
            }
            IsoPayload::OstreeCommit {
                commit_pipeline,
                commit_ref,
            } => {
                pipeline.stages.push(osbuild::new_ostree_init_stage("/ostree/repo"));
                pipeline.stages.push(osbuild::new_ostree_pull_stage(
                    "/ostree/repo",
                    commit_pipeline,
                    commit_ref,
                ));
            }
            IsoPayload::OstreeRemote { checksum } => {
                pipeline.stages.push(osbuild::new_ostree_init_stage("/ostree/repo"));
                pipeline.stages.push(
                    osbuild::Stage::new(
                        "org.osbuild.ostree.pull",
                        osbuild::StageOptions::OstreePull(osbuild::OstreePullStageOptions {
                            repo: "/ostree/repo".to_string(),
                            remote: None,
                        }),
                    )
                    .with_input("commits", osbuild::Input::ostree_commit_from_source(checksum)),
                );
            }
        }

        pipeline.stages.push(osbuild::new_discinfo_stage(
            &self.info.arch,
            &self.info.os_version,
        ));

        if self.info.arch == X86_64 {
            pipeline.stages.push(osbuild::new_isolinux_stage(
                osbuild::IsoProduct {
                    name: self.info.product.clone(),
                    version: self.info.os_version.clone(),
                },
                osbuild::IsoKernel {
                    dir: "/images/pxeboot".to_string(),
                    opts: self.kernel_opts.clone(),
                },
            ));
        }

        Ok(pipeline)
    }
}

/// Packs the tree into a hybrid-bootable ISO 9660 image.
pub struct BootisoPipeline {
    pub info: InstallerInfo,
    pub filename: String,
}

impl BootisoPipeline {
    pub(crate) fn serialize(&self, _content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("bootiso");
        pipeline.build = Some("name:build".to_string());

        let x86 = self.info.arch == X86_64;
        pipeline.stages.push(osbuild::new_xorrisofs_stage(
            osbuild::XorrisofsStageOptions {
                filename: self.filename.clone(),
                volid: self.info.isolabel.clone(),
                sysid: Some("LINUX".to_string()),
                boot: x86.then(|| osbuild::XorrisofsBoot {
                    image: "isolinux/isolinux.bin".to_string(),
                    catalog: "isolinux/boot.cat".to_string(),
                }),
                efi: Some("images/efiboot.img".to_string()),
                isohybridmbr: x86.then(|| "/usr/share/syslinux/isohdpfx.bin".to_string()),
                iso_level: None,
            },
            "bootiso-tree",
        ));
        pipeline
            .stages
            .push(osbuild::new_implant_isomd5_stage(&self.filename));

        Ok(pipeline)
    }
}

/// Default size of the installer runtime image.
pub const ROOTFS_IMAGE_SIZE: u64 = 3072 * MIB;
