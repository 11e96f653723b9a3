//! Image kinds.
//!
//! An [`ImageKind`] is the strategy object picked by an image type's
//! `image` function: it knows which pipelines make up one artifact
//! variant and in which order. Instantiating a kind populates a
//! [`Manifest`](crate::manifest::Manifest) with its pipelines.

use anyhow::Result;

use rpmmd::{PackageSet, RepoConfig};

use crate::blueprint::{GroupCustomization, UserCustomization};
use crate::container::ContainerSpec;
use crate::disk::PartitionTable;
use crate::manifest::{
    AnacondaTreePipeline, ArchivePipeline, BootisoPipeline, BootisoTreePipeline, BuildPipeline,
    CommitSource, ContainerTreePipeline, EfibootTreePipeline, InstallerInfo, IsoPayload, Manifest,
    OciContainerPipeline, OsCustomizations, OsPipeline, OstreeCommitPipeline,
    OstreeDeploymentPipeline, OsTreeCommitInfo, OvfPipeline, Pipeline, QemuEncoderPipeline,
    RawImagePipeline, RootfsImagePipeline, XzPipeline,
};
use crate::osbuild;
use crate::platform::{ImageFormat, Platform};
use crate::workload::Workload;

/// An ostree commit fetched from a remote repository.
#[derive(Debug, Clone)]
pub struct RemoteCommit {
    pub url: String,
    pub checksum: String,
    pub commit_ref: String,
}

/// The closed set of image construction strategies.
pub enum ImageKind {
    Live(Box<LiveImage>),
    Container(Box<ContainerImage>),
    IotCommit(Box<IotCommitImage>),
    IotContainer(Box<IotContainerImage>),
    IotInstaller(Box<IotInstallerImage>),
    IotRaw(Box<IotRawImage>),
    ImageInstaller(Box<ImageInstallerImage>),
    Ova(Box<OvaImage>),
}

impl ImageKind {
    /// Append this kind's pipelines to the manifest, in build order.
    pub fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        match self {
            ImageKind::Live(img) => img.instantiate(manifest, repos, runner),
            ImageKind::Container(img) => img.instantiate(manifest, repos, runner),
            ImageKind::IotCommit(img) => img.instantiate(manifest, repos, runner),
            ImageKind::IotContainer(img) => img.instantiate(manifest, repos, runner),
            ImageKind::IotInstaller(img) => img.instantiate(manifest, repos, runner),
            ImageKind::IotRaw(img) => img.instantiate(manifest, repos, runner),
            ImageKind::ImageInstaller(img) => img.instantiate(manifest, repos, runner),
            ImageKind::Ova(img) => img.instantiate(manifest, repos, runner),
        }
    }
}

/// Repositories for a set, plus the untagged ones.
fn repos_for(repos: &[RepoConfig], set_name: &str) -> Vec<RepoConfig> {
    crate::manifest::filter_repos(repos, set_name)
}

fn with_repos(mut set: PackageSet, repos: Vec<RepoConfig>) -> PackageSet {
    set.repositories.extend(repos);
    set
}

/// The blueprint overlay as a second transaction on the OS chain: its
/// repositories are the OS repositories plus anything tagged for the
/// blueprint set.
fn workload_set(workload: &Workload, repos: &[RepoConfig]) -> PackageSet {
    let mut merged = repos_for(repos, "os");
    for repo in repos_for(repos, "blueprint") {
        if !merged.iter().any(|existing| existing.id == repo.id) {
            merged.push(repo);
        }
    }
    for repo in &workload.repos {
        if !merged.iter().any(|existing| existing.id == repo.id) {
            merged.push(repo.clone());
        }
    }
    PackageSet {
        include: workload.packages.clone(),
        exclude: Vec::new(),
        repositories: merged,
    }
}

fn os_chain(os_packages: &PackageSet, workload: &Workload, repos: &[RepoConfig]) -> Vec<PackageSet> {
    let mut chain = vec![with_repos(os_packages.clone(), repos_for(repos, "os"))];
    if !workload.is_empty() {
        chain.push(workload_set(workload, repos));
    }
    chain
}

fn build_pipeline(build_packages: &PackageSet, repos: &[RepoConfig], runner: &str) -> Pipeline {
    let build_repos = repos_for(repos, "build");
    Pipeline::Build(BuildPipeline::new(
        runner,
        with_repos(build_packages.clone(), build_repos.clone()),
        build_repos,
    ))
}

/// A mutable-disk image: qcow2, vhd, vmdk, ami, openstack, minimal-raw.
pub struct LiveImage {
    pub platform: Platform,
    pub customizations: OsCustomizations,
    pub os_packages: PackageSet,
    pub build_packages: PackageSet,
    pub workload: Workload,
    pub partition_table: PartitionTable,
    pub kernel_options: Vec<String>,
    pub filename: String,
    /// Compress the raw image instead of encoding it.
    pub xz_compression: bool,
}

impl LiveImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));

        manifest.add_pipeline(Pipeline::Os(Box::new(OsPipeline {
            platform: self.platform.clone(),
            repos: repos_for(repos, "os"),
            chain: os_chain(&self.os_packages, &self.workload, repos),
            partition_table: Some(self.partition_table.clone()),
            kernel_options: self.kernel_options,
            customizations: self.customizations,
            ostree: None,
        })));

        let format = self.platform.image_format();
        let encoded = !matches!(format, ImageFormat::Raw | ImageFormat::Unset);
        let raw_filename = if encoded || self.xz_compression {
            "disk.raw".to_string()
        } else {
            self.filename.clone()
        };
        manifest.add_pipeline(Pipeline::RawImage(RawImagePipeline {
            filename: raw_filename.clone(),
            tree_pipeline: "os".to_string(),
            partition_table: self.partition_table,
            platform: self.platform.clone(),
        }));

        match format {
            ImageFormat::Qcow2 => manifest.add_pipeline(Pipeline::Qemu(QemuEncoderPipeline {
                name: "qcow2".to_string(),
                filename: self.filename.clone(),
                format: osbuild::QemuFormat::Qcow2 {
                    compat: self.platform.qcow2_compat().map(str::to_string),
                },
                source_pipeline: "image".to_string(),
                source_file: raw_filename.clone(),
            })),
            ImageFormat::Vhd => manifest.add_pipeline(Pipeline::Qemu(QemuEncoderPipeline {
                name: "vpc".to_string(),
                filename: self.filename.clone(),
                format: osbuild::QemuFormat::Vpc {
                    force_size: Some(true),
                },
                source_pipeline: "image".to_string(),
                source_file: raw_filename.clone(),
            })),
            ImageFormat::Vmdk | ImageFormat::Ova => {
                manifest.add_pipeline(Pipeline::Qemu(QemuEncoderPipeline {
                    name: "vmdk".to_string(),
                    filename: self.filename.clone(),
                    format: osbuild::QemuFormat::Vmdk {
                        subformat: Some("streamOptimized".to_string()),
                    },
                    source_pipeline: "image".to_string(),
                    source_file: raw_filename.clone(),
                }))
            }
            ImageFormat::Raw | ImageFormat::Unset => {}
        }

        if self.xz_compression {
            manifest.add_pipeline(Pipeline::Xz(XzPipeline {
                filename: self.filename,
                source_pipeline: "image".to_string(),
                source_file: raw_filename,
            }));
        }
        Ok(())
    }
}

/// An OCI archive of a plain OS tree.
pub struct ContainerImage {
    pub platform: Platform,
    pub customizations: OsCustomizations,
    pub os_packages: PackageSet,
    pub build_packages: PackageSet,
    pub workload: Workload,
    pub filename: String,
}

impl ContainerImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));
        manifest.add_pipeline(Pipeline::Os(Box::new(OsPipeline {
            platform: self.platform.clone(),
            repos: repos_for(repos, "os"),
            chain: os_chain(&self.os_packages, &self.workload, repos),
            partition_table: None,
            kernel_options: Vec::new(),
            customizations: self.customizations,
            ostree: None,
        })));
        manifest.add_pipeline(Pipeline::OciContainer(OciContainerPipeline {
            tree_pipeline: "os".to_string(),
            filename: self.filename,
            architecture: self.platform.arch().to_string(),
        }));
        Ok(())
    }
}

/// An ostree commit in a tar archive.
pub struct IotCommitImage {
    pub platform: Platform,
    pub customizations: OsCustomizations,
    pub os_packages: PackageSet,
    pub build_packages: PackageSet,
    pub workload: Workload,
    pub commit_ref: String,
    pub parent: Option<String>,
    pub os_version: String,
    pub filename: String,
    pub containers: Vec<ContainerSpec>,
}

impl IotCommitImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        for container in &self.containers {
            manifest.add_container(container.clone());
        }
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));
        manifest.add_pipeline(Pipeline::Os(Box::new(OsPipeline {
            platform: self.platform.clone(),
            repos: repos_for(repos, "os"),
            chain: os_chain(&self.os_packages, &self.workload, repos),
            partition_table: None,
            kernel_options: Vec::new(),
            customizations: self.customizations,
            ostree: Some(OsTreeCommitInfo {
                commit_ref: self.commit_ref.clone(),
            }),
        })));
        manifest.add_pipeline(Pipeline::OstreeCommit(OstreeCommitPipeline {
            tree_pipeline: "os".to_string(),
            commit_ref: self.commit_ref,
            os_version: self.os_version,
            parent: self.parent,
        }));
        manifest.add_pipeline(Pipeline::Archive(ArchivePipeline {
            name: "commit-archive".to_string(),
            filename: self.filename,
            tree_pipeline: "ostree-commit".to_string(),
        }));
        Ok(())
    }
}

/// An ostree commit wrapped in a web-server container.
pub struct IotContainerImage {
    pub commit: IotCommitImage,
    pub container_packages: PackageSet,
}

impl IotContainerImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        let commit = self.commit;
        let arch = commit.platform.arch().to_string();
        let commit_ref = commit.commit_ref.clone();
        let filename = commit.filename.clone();
        for container in &commit.containers {
            manifest.add_container(container.clone());
        }
        manifest.add_pipeline(build_pipeline(&commit.build_packages, repos, runner));
        manifest.add_pipeline(Pipeline::Os(Box::new(OsPipeline {
            platform: commit.platform.clone(),
            repos: repos_for(repos, "os"),
            chain: os_chain(&commit.os_packages, &commit.workload, repos),
            partition_table: None,
            kernel_options: Vec::new(),
            customizations: commit.customizations,
            ostree: Some(OsTreeCommitInfo {
                commit_ref: commit_ref.clone(),
            }),
        })));
        manifest.add_pipeline(Pipeline::OstreeCommit(OstreeCommitPipeline {
            tree_pipeline: "os".to_string(),
            commit_ref: commit_ref.clone(),
            os_version: commit.os_version,
            parent: commit.parent,
        }));
        let container_repos = repos_for(repos, "container");
        manifest.add_pipeline(Pipeline::ContainerTree(ContainerTreePipeline {
            commit_pipeline: "ostree-commit".to_string(),
            commit_ref,
            repos: container_repos.clone(),
            chain: vec![with_repos(self.container_packages, container_repos)],
        }));
        manifest.add_pipeline(Pipeline::OciContainer(OciContainerPipeline {
            tree_pipeline: "container-tree".to_string(),
            filename,
            architecture: arch,
        }));
        Ok(())
    }
}

/// A boot ISO that installs a remote ostree commit.
pub struct IotInstallerImage {
    pub platform: Platform,
    pub installer_packages: PackageSet,
    pub build_packages: PackageSet,
    pub info: InstallerInfo,
    pub commit: RemoteCommit,
    pub kernel_options: Vec<String>,
    pub users: Vec<UserCustomization>,
    pub groups: Vec<GroupCustomization>,
    pub rootfs_uuid: String,
    pub rootfs_size: u64,
    pub filename: String,
}

impl IotInstallerImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        manifest.add_ostree_commit(&self.commit.checksum, &self.commit.url);
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));

        let installer_repos = repos_for(repos, "installer");
        manifest.add_pipeline(Pipeline::AnacondaTree(Box::new(AnacondaTreePipeline {
            info: self.info.clone(),
            repos: installer_repos.clone(),
            chain: vec![with_repos(self.installer_packages, installer_repos)],
            users: self.users,
            groups: self.groups,
        })));
        manifest.add_pipeline(Pipeline::RootfsImage(
            RootfsImagePipeline {
                tree_pipeline: "anaconda-tree".to_string(),
                size: self.rootfs_size,
                uuid: self.rootfs_uuid,
            },
        ));
        manifest.add_pipeline(Pipeline::EfibootTree(EfibootTreePipeline {
            info: self.info.clone(),
            kernel_opts: self.kernel_options.clone(),
        }));
        manifest.add_pipeline(Pipeline::BootisoTree(Box::new(BootisoTreePipeline {
            info: self.info.clone(),
            payload: IsoPayload::OstreeRemote {
                checksum: self.commit.checksum.clone(),
            },
            kernel_opts: self.kernel_options,
        })));
        manifest.add_pipeline(Pipeline::Bootiso(BootisoPipeline {
            info: self.info,
            filename: self.filename,
        }));
        Ok(())
    }
}

/// A raw disk with a deployed ostree commit, xz-compressed.
pub struct IotRawImage {
    pub platform: Platform,
    pub build_packages: PackageSet,
    pub commit: RemoteCommit,
    pub osname: String,
    pub kernel_options: Vec<String>,
    pub partition_table: PartitionTable,
    pub filename: String,
}

impl IotRawImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        manifest.add_ostree_commit(&self.commit.checksum, &self.commit.url);
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));
        manifest.add_pipeline(Pipeline::OstreeDeployment(Box::new(
            OstreeDeploymentPipeline {
                source: CommitSource::Remote {
                    checksum: self.commit.checksum.clone(),
                    commit_ref: self.commit.commit_ref.clone(),
                },
                osname: self.osname,
                kernel_options: self.kernel_options,
                partition_table: self.partition_table.clone(),
            },
        )));
        manifest.add_pipeline(Pipeline::RawImage(RawImagePipeline {
            filename: "image.raw".to_string(),
            tree_pipeline: "ostree-deployment".to_string(),
            partition_table: self.partition_table,
            platform: self.platform,
        }));
        manifest.add_pipeline(Pipeline::Xz(XzPipeline {
            filename: self.filename,
            source_pipeline: "image".to_string(),
            source_file: "image.raw".to_string(),
        }));
        Ok(())
    }
}

/// A boot ISO installing a plain OS payload from a squashfs.
pub struct ImageInstallerImage {
    pub platform: Platform,
    pub customizations: OsCustomizations,
    pub os_packages: PackageSet,
    pub installer_packages: PackageSet,
    pub build_packages: PackageSet,
    pub workload: Workload,
    pub info: InstallerInfo,
    pub kernel_options: Vec<String>,
    pub rootfs_uuid: String,
    pub rootfs_size: u64,
    pub filename: String,
}

impl ImageInstallerImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        manifest.add_pipeline(build_pipeline(&self.build_packages, repos, runner));

        let installer_repos = repos_for(repos, "installer");
        manifest.add_pipeline(Pipeline::AnacondaTree(Box::new(AnacondaTreePipeline {
            info: self.info.clone(),
            repos: installer_repos.clone(),
            chain: vec![with_repos(self.installer_packages, installer_repos)],
            users: Vec::new(),
            groups: Vec::new(),
        })));
        manifest.add_pipeline(Pipeline::RootfsImage(
            RootfsImagePipeline {
                tree_pipeline: "anaconda-tree".to_string(),
                size: self.rootfs_size,
                uuid: self.rootfs_uuid,
            },
        ));
        manifest.add_pipeline(Pipeline::EfibootTree(EfibootTreePipeline {
            info: self.info.clone(),
            kernel_opts: self.kernel_options.clone(),
        }));
        manifest.add_pipeline(Pipeline::Os(Box::new(OsPipeline {
            platform: self.platform.clone(),
            repos: repos_for(repos, "os"),
            chain: os_chain(&self.os_packages, &self.workload, repos),
            partition_table: None,
            kernel_options: Vec::new(),
            customizations: self.customizations,
            ostree: None,
        })));
        manifest.add_pipeline(Pipeline::BootisoTree(Box::new(BootisoTreePipeline {
            info: self.info.clone(),
            payload: IsoPayload::OsTree {
                os_pipeline: "os".to_string(),
            },
            kernel_opts: self.kernel_options,
        })));
        manifest.add_pipeline(Pipeline::Bootiso(BootisoPipeline {
            info: self.info,
            filename: self.filename,
        }));
        Ok(())
    }
}

/// A live image encoded as vmdk and packed with its OVF descriptor.
pub struct OvaImage {
    pub live: LiveImage,
    pub vmdk_filename: String,
    pub filename: String,
}

impl OvaImage {
    fn instantiate(
        self,
        manifest: &mut Manifest,
        repos: &[RepoConfig],
        runner: &str,
    ) -> Result<()> {
        let mut live = self.live;
        live.filename = self.vmdk_filename.clone();
        live.instantiate(manifest, repos, runner)?;

        manifest.add_pipeline(Pipeline::Ovf(OvfPipeline {
            vmdk_pipeline: "vmdk".to_string(),
            vmdk_filename: self.vmdk_filename,
        }));
        manifest.add_pipeline(Pipeline::Archive(ArchivePipeline {
            name: "archive".to_string(),
            filename: self.filename,
            tree_pipeline: "ovf".to_string(),
        }));
        Ok(())
    }
}
