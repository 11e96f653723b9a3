//! The manifest builder.
//!
//! A [`Manifest`] is an ordered collection of pipelines assembled by an
//! image kind. It exists in two phases: after instantiation it can report
//! the package-set chains each pipeline wants depsolved; given resolved
//! packages it serializes into the osbuild document. Pipeline order is
//! deterministic for a given image kind, options, and RNG seed.

mod build;
mod image;
mod installer;
mod os;
mod ostree;

pub use build::BuildPipeline;
pub use image::{ArchivePipeline, OvfPipeline, QemuEncoderPipeline, RawImagePipeline, XzPipeline};
pub use installer::{
    AnacondaTreePipeline, BootisoPipeline, BootisoTreePipeline, EfibootTreePipeline, InstallerInfo,
    IsoPayload, RootfsImagePipeline, ROOTFS_IMAGE_SIZE,
};
pub use os::{
    OsCustomizations, OscapConfig, OscapTailoringConfig, OsPipeline, OsTreeCommitInfo,
    SysconfigSections,
};
pub use ostree::{
    CommitSource, ContainerTreePipeline, OciContainerPipeline, OstreeCommitPipeline,
    OstreeDeploymentPipeline,
};

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};

use rpmmd::{PackageSet, PackageSpec, RepoConfig};

use crate::container::ContainerSpec;
use crate::osbuild;

/// Resolved content available at serialization time.
pub(crate) struct Content<'a> {
    packages: &'a BTreeMap<String, Vec<PackageSpec>>,
}

impl Content<'_> {
    pub(crate) fn packages(&self, set_name: &str) -> &[PackageSpec] {
        self.packages.get(set_name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Default)]
pub struct Manifest {
    pipelines: Vec<Pipeline>,
    containers: Vec<ContainerSpec>,
    /// Remote ostree commits referenced by pipelines: (checksum, url).
    ostree_commits: Vec<(String, String)>,
}

impl Manifest {
    pub fn new() -> Manifest {
        Manifest::default()
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) {
        self.pipelines.push(pipeline);
    }

    pub fn add_container(&mut self, container: ContainerSpec) {
        self.containers.push(container);
    }

    pub fn add_ostree_commit(&mut self, checksum: &str, url: &str) {
        self.ostree_commits
            .push((checksum.to_string(), url.to_string()));
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(Pipeline::name).collect()
    }

    /// The package-set chains this manifest wants depsolved, keyed by set
    /// name. Chain order is the transaction order handed to the solver.
    pub fn package_set_chains(&self) -> BTreeMap<String, Vec<PackageSet>> {
        let mut chains = BTreeMap::new();
        for pipeline in &self.pipelines {
            if let Some((name, chain)) = pipeline.package_set_chain() {
                chains.insert(name.to_string(), chain.to_vec());
            }
        }
        chains
    }

    /// Substitute resolved packages and emit the osbuild document.
    pub fn serialize(&self, packages: &BTreeMap<String, Vec<PackageSpec>>) -> Result<Vec<u8>> {
        let content = Content { packages };

        let mut serialized = Vec::with_capacity(self.pipelines.len());
        for pipeline in &self.pipelines {
            serialized.push(
                pipeline
                    .serialize(&content)
                    .with_context(|| format!("serializing pipeline '{}'", pipeline.name()))?,
            );
        }

        let mut sources = osbuild::Sources::default();
        for specs in packages.values() {
            sources.add_packages(specs);
        }
        for (checksum, url) in &self.ostree_commits {
            sources.add_ostree_commit(checksum, url);
        }
        for container in &self.containers {
            if !container.image_id.is_empty() {
                sources.add_container(&container.image_id, &container.source, &container.digest);
            }
        }

        let document = osbuild::Manifest::new(serialized, sources);
        serde_json::to_vec(&document).context("serializing manifest document")
    }
}

/// One pipeline of the build graph. Closed set; the variant decides both
/// the stage sequence and the package-set chain.
pub enum Pipeline {
    Build(BuildPipeline),
    Os(Box<OsPipeline>),
    RawImage(RawImagePipeline),
    Qemu(QemuEncoderPipeline),
    Xz(XzPipeline),
    Archive(ArchivePipeline),
    Ovf(OvfPipeline),
    OstreeCommit(OstreeCommitPipeline),
    ContainerTree(ContainerTreePipeline),
    OciContainer(OciContainerPipeline),
    OstreeDeployment(Box<OstreeDeploymentPipeline>),
    AnacondaTree(Box<AnacondaTreePipeline>),
    RootfsImage(RootfsImagePipeline),
    EfibootTree(EfibootTreePipeline),
    BootisoTree(Box<BootisoTreePipeline>),
    Bootiso(BootisoPipeline),
}

impl Pipeline {
    pub fn name(&self) -> &str {
        match self {
            Pipeline::Build(_) => "build",
            Pipeline::Os(_) => "os",
            Pipeline::RawImage(_) => "image",
            Pipeline::Qemu(p) => &p.name,
            Pipeline::Xz(_) => "xz",
            Pipeline::Archive(p) => &p.name,
            Pipeline::Ovf(_) => "ovf",
            Pipeline::OstreeCommit(_) => "ostree-commit",
            Pipeline::ContainerTree(_) => "container-tree",
            Pipeline::OciContainer(_) => "container",
            Pipeline::OstreeDeployment(_) => "ostree-deployment",
            Pipeline::AnacondaTree(_) => "anaconda-tree",
            Pipeline::RootfsImage(_) => "rootfs-image",
            Pipeline::EfibootTree(_) => "efiboot-tree",
            Pipeline::BootisoTree(_) => "bootiso-tree",
            Pipeline::Bootiso(_) => "bootiso",
        }
    }

    fn package_set_chain(&self) -> Option<(&str, &[PackageSet])> {
        match self {
            Pipeline::Build(p) => Some(("build", &p.chain)),
            Pipeline::Os(p) => Some(("os", &p.chain)),
            Pipeline::AnacondaTree(p) => Some(("installer", &p.chain)),
            Pipeline::ContainerTree(p) => Some(("container", &p.chain)),
            _ => None,
        }
    }

    fn serialize(&self, content: &Content) -> Result<osbuild::Pipeline> {
        match self {
            Pipeline::Build(p) => p.serialize(content),
            Pipeline::Os(p) => p.serialize(content),
            Pipeline::RawImage(p) => p.serialize(content),
            Pipeline::Qemu(p) => p.serialize(content),
            Pipeline::Xz(p) => p.serialize(content),
            Pipeline::Archive(p) => p.serialize(content),
            Pipeline::Ovf(p) => p.serialize(content),
            Pipeline::OstreeCommit(p) => p.serialize(content),
            Pipeline::ContainerTree(p) => p.serialize(content),
            Pipeline::OciContainer(p) => p.serialize(content),
            Pipeline::OstreeDeployment(p) => p.serialize(content),
            Pipeline::AnacondaTree(p) => p.serialize(content),
            Pipeline::RootfsImage(p) => p.serialize(content),
            Pipeline::EfibootTree(p) => p.serialize(content),
            Pipeline::BootisoTree(p) => p.serialize(content),
            Pipeline::Bootiso(p) => p.serialize(content),
        }
    }
}

/// Repositories that apply to a named package set, keeping caller order.
pub(crate) fn filter_repos(repos: &[RepoConfig], set_name: &str) -> Vec<RepoConfig> {
    repos
        .iter()
        .filter(|repo| repo.applies_to(set_name))
        .cloned()
        .collect()
}

/// GPG keys of the repositories, deduplicated, order preserved.
pub(crate) fn gpg_keys(repos: &[RepoConfig]) -> Vec<String> {
    let mut keys = Vec::new();
    for repo in repos {
        for key in &repo.gpg_keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_repos_keeps_untagged_and_matching() {
        let repos = vec![
            RepoConfig {
                id: "baseos".into(),
                ..Default::default()
            },
            RepoConfig {
                id: "nightly".into(),
                package_sets: vec!["build".into()],
                ..Default::default()
            },
        ];
        let os_repos = filter_repos(&repos, "os");
        assert_eq!(os_repos.len(), 1);
        assert_eq!(os_repos[0].id, "baseos");

        let build_repos = filter_repos(&repos, "build");
        assert_eq!(build_repos.len(), 2);
    }

    #[test]
    fn gpg_keys_deduplicate_in_order() {
        let repos = vec![
            RepoConfig {
                id: "a".into(),
                gpg_keys: vec!["KEY1".into()],
                ..Default::default()
            },
            RepoConfig {
                id: "b".into(),
                gpg_keys: vec!["KEY1".into(), "KEY2".into()],
                ..Default::default()
            },
        ];
        assert_eq!(gpg_keys(&repos), vec!["KEY1", "KEY2"]);
    }
}
