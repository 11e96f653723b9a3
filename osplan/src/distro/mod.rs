//! The distribution registry.
//!
//! A three-level catalog: [`Distribution`] → [`Architecture`] →
//! [`ImageType`]. Image-type definitions are value types copied into each
//! (architecture, platform) binding at registration, so per-arch platform
//! assignments never mutate a shared prototype. Alias problems (dangling
//! target, duplicate registration) are programmer errors and panic at
//! construction; name lookups by callers return typed errors.

pub mod fedora;
pub mod rhel9;

mod images;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use rpmmd::{PackageSet, PackageSpec, RepoConfig};

use crate::blueprint::{Blueprint, Customizations, FilesystemCustomization};
use crate::container::ContainerSpec;
use crate::disk::PartitionTable;
use crate::image::ImageKind;
use crate::manifest::Manifest;
use crate::osbuild;
use crate::pathpolicy;
use crate::platform::{boot_mode, BootMode, Platform};
use crate::workload::Workload;

/// Package-set names used across the registry.
pub const BUILD_PKGS_KEY: &str = "build";
pub const OS_PKGS_KEY: &str = "os";
pub const INSTALLER_PKGS_KEY: &str = "installer";
pub const CONTAINER_PKGS_KEY: &str = "container";
pub const BLUEPRINT_PKGS_KEY: &str = "blueprint";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("unknown distribution: {0}")]
    UnknownDistro(String),
    #[error("invalid architecture: {0}")]
    UnknownArch(String),
    #[error("invalid image type: {0}")]
    UnknownImageType(String),
}

/// Per-request knobs.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    /// Target size in bytes; 0 uses the image type's default.
    pub size: u64,
    pub ostree: OsTreeImageOptions,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Default)]
pub struct OsTreeImageOptions {
    pub url: String,
    pub image_ref: String,
    pub parent_ref: String,
    pub fetch_checksum: String,
    pub rhsm: bool,
}

impl OsTreeImageOptions {
    /// Placeholder checksum used when package sets are computed before the
    /// ostree commit is resolved. Never leaks into a manifest: the real
    /// checksum is demanded by `check_options` on the manifest path.
    pub fn planning_checksum() -> String {
        "f".repeat(64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Subscription {
    pub organization: String,
    pub activation_key: String,
    pub server_url: String,
    pub base_url: String,
    pub insights: bool,
}

/// Journald drop-in carried by an image configuration.
#[derive(Debug, Clone)]
pub struct JournaldDropin {
    pub filename: String,
    pub journal: osbuild::SystemdJournaldConfigJournalSection,
}

/// Default configuration applied to an image, before blueprint
/// customizations. Leaves inherit from their distribution's defaults via
/// [`ImageConfig::inherit_from`].
#[derive(Debug, Clone, Default)]
pub struct ImageConfig {
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub keyboard: Option<String>,
    pub enabled_services: Vec<String>,
    pub disabled_services: Vec<String>,
    pub masked_services: Vec<String>,
    pub default_target: Option<String>,
    pub sysconfig_kernel: Option<osbuild::SysconfigKernelOptions>,
    pub sysconfig_network: Option<osbuild::SysconfigNetworkOptions>,
    pub journald: Option<JournaldDropin>,
    pub sshd_config: Option<osbuild::SshdConfig>,
    pub exclude_docs: Option<bool>,
    pub no_selinux: Option<bool>,
}

impl ImageConfig {
    /// Field-wise merge: every unset field of `self` takes the parent's
    /// value. Recurses into nested sections so a leaf can override one
    /// nested field without erasing its siblings.
    pub fn inherit_from(self, parent: &ImageConfig) -> ImageConfig {
        ImageConfig {
            timezone: self.timezone.or_else(|| parent.timezone.clone()),
            locale: self.locale.or_else(|| parent.locale.clone()),
            keyboard: self.keyboard.or_else(|| parent.keyboard.clone()),
            enabled_services: pick_vec(self.enabled_services, &parent.enabled_services),
            disabled_services: pick_vec(self.disabled_services, &parent.disabled_services),
            masked_services: pick_vec(self.masked_services, &parent.masked_services),
            default_target: self.default_target.or_else(|| parent.default_target.clone()),
            sysconfig_kernel: self
                .sysconfig_kernel
                .or_else(|| parent.sysconfig_kernel.clone()),
            sysconfig_network: self
                .sysconfig_network
                .or_else(|| parent.sysconfig_network.clone()),
            journald: self.journald.or_else(|| parent.journald.clone()),
            sshd_config: merge_sshd(self.sshd_config, &parent.sshd_config),
            exclude_docs: self.exclude_docs.or(parent.exclude_docs),
            no_selinux: self.no_selinux.or(parent.no_selinux),
        }
    }
}

fn pick_vec(child: Vec<String>, parent: &[String]) -> Vec<String> {
    if child.is_empty() {
        parent.to_vec()
    } else {
        child
    }
}

fn merge_sshd(
    child: Option<osbuild::SshdConfig>,
    parent: &Option<osbuild::SshdConfig>,
) -> Option<osbuild::SshdConfig> {
    match (child, parent) {
        (Some(child), Some(parent)) => Some(osbuild::SshdConfig {
            password_authentication: child
                .password_authentication
                .or(parent.password_authentication),
            challenge_response_authentication: child
                .challenge_response_authentication
                .or(parent.challenge_response_authentication),
            client_alive_interval: child.client_alive_interval.or(parent.client_alive_interval),
            permit_root_login: child
                .permit_root_login
                .or_else(|| parent.permit_root_login.clone()),
        }),
        (Some(child), None) => Some(child),
        (None, parent) => parent.clone(),
    }
}

/// Immutable per-distribution data shared by every leaf.
#[derive(Debug)]
pub struct DistroData {
    pub name: String,
    pub product: String,
    pub os_version: String,
    pub release_version: String,
    pub module_platform_id: String,
    pub vendor: String,
    /// Template with an `{arch}` placeholder, e.g. `fedora/38/{arch}/iot`.
    pub ostree_ref_tmpl: Option<String>,
    /// Template with an `{arch}` placeholder for ISO volume ids.
    pub isolabel_tmpl: String,
    /// Build-host runner, e.g. `org.osbuild.fedora38`.
    pub runner: String,
    pub default_image_config: ImageConfig,
    pub oscap_profile_allowlist: Vec<String>,
}

pub struct Distribution {
    data: Arc<DistroData>,
    arches: BTreeMap<String, Architecture>,
}

impl Distribution {
    pub(crate) fn new(data: DistroData) -> Distribution {
        Distribution {
            data: Arc::new(data),
            arches: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn product(&self) -> &str {
        &self.data.product
    }

    pub fn releasever(&self) -> &str {
        &self.data.release_version
    }

    pub fn module_platform_id(&self) -> &str {
        &self.data.module_platform_id
    }

    pub fn ostree_ref_template(&self) -> Option<&str> {
        self.data.ostree_ref_tmpl.as_deref()
    }

    pub fn list_arches(&self) -> Vec<&str> {
        self.arches.keys().map(String::as_str).collect()
    }

    pub fn get_arch(&self, name: &str) -> Result<&Architecture, LookupError> {
        self.arches
            .get(name)
            .ok_or_else(|| LookupError::UnknownArch(name.to_string()))
    }

    pub(crate) fn new_arch(&self, name: &str) -> Architecture {
        Architecture {
            distro: self.data.clone(),
            name: name.to_string(),
            image_types: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub(crate) fn add_arches(&mut self, arches: Vec<Architecture>) {
        for arch in arches {
            self.arches.insert(arch.name.clone(), arch);
        }
    }
}

pub struct Architecture {
    distro: Arc<DistroData>,
    name: String,
    image_types: BTreeMap<String, ImageType>,
    aliases: BTreeMap<String, String>,
}

impl Architecture {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn list_image_types(&self) -> Vec<&str> {
        self.image_types.keys().map(String::as_str).collect()
    }

    /// Registered aliases as (alias, canonical name) pairs.
    pub fn list_image_type_aliases(&self) -> Vec<(&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect()
    }

    /// Look up an image type by name or alias. An alias pointing at a
    /// missing image type is a registration bug and panics.
    pub fn get_image_type(&self, name: &str) -> Result<&ImageType, LookupError> {
        if let Some(image_type) = self.image_types.get(name) {
            return Ok(image_type);
        }
        match self.aliases.get(name) {
            Some(target) => Some(self.image_types.get(target).unwrap_or_else(|| {
                panic!("image type '{name}' is an alias to a non-existing image type '{target}'")
            })),
            None => None,
        }
        .ok_or_else(|| LookupError::UnknownImageType(name.to_string()))
    }

    /// Bind image-type definitions to this architecture and a platform.
    /// Definitions are copied; the same prototype may be registered on
    /// several arches with different platforms.
    pub(crate) fn add_image_types(&mut self, platform: &Platform, defs: Vec<ImageTypeDef>) {
        for def in defs {
            for alias in &def.name_aliases {
                if let Some(existing) = self.aliases.get(alias) {
                    panic!(
                        "image type alias '{alias}' for '{}' is already defined for another image type '{existing}'",
                        def.name
                    );
                }
                self.aliases.insert(alias.clone(), def.name.clone());
            }
            let image_type = ImageType {
                distro: self.distro.clone(),
                arch_name: self.name.clone(),
                platform: platform.clone(),
                def,
            };
            self.image_types
                .insert(image_type.def.name.clone(), image_type);
        }
    }
}

pub type PackageSetFn = fn(&ImageType) -> PackageSet;
pub type BasePartitionTableFn = fn(&str) -> Option<PartitionTable>;
pub type ImageFn = fn(&ImageType, ImageRequest) -> Result<ImageKind>;

/// Everything the image function needs to pick and configure a kind.
pub struct ImageRequest<'a> {
    pub workload: &'a Workload,
    pub customizations: &'a Customizations,
    pub options: &'a ImageOptions,
    pub package_sets: &'a BTreeMap<String, PackageSet>,
    pub containers: &'a [ContainerSpec],
    pub rng: &'a mut StdRng,
}

/// An image-type prototype, before binding to an arch and platform.
#[derive(Clone)]
pub struct ImageTypeDef {
    pub name: String,
    pub name_aliases: Vec<String>,
    pub filename: String,
    pub mime_type: String,
    /// Compression applied to the final artifact (`xz`), when any.
    pub compression: Option<String>,
    pub package_sets: Vec<(String, PackageSetFn)>,
    pub default_image_config: ImageConfig,
    pub kernel_options: String,
    pub default_size: u64,
    pub build_pipelines: Vec<String>,
    pub payload_pipelines: Vec<String>,
    pub exports: Vec<String>,
    pub boot_iso: bool,
    pub rpm_ostree: bool,
    pub bootable: bool,
    pub base_partition_tables: Option<BasePartitionTableFn>,
    /// `None` uses the built-in required minima, `Some(empty)` disables
    /// them so the base table's own sizes win.
    pub required_partition_sizes: Option<Vec<(String, u64)>>,
    pub image: ImageFn,
}

impl ImageTypeDef {
    pub fn new(name: &str, filename: &str, mime_type: &str, image: ImageFn) -> ImageTypeDef {
        ImageTypeDef {
            name: name.to_string(),
            name_aliases: Vec::new(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            compression: None,
            package_sets: Vec::new(),
            default_image_config: ImageConfig::default(),
            kernel_options: String::new(),
            default_size: 0,
            build_pipelines: vec!["build".to_string()],
            payload_pipelines: Vec::new(),
            exports: Vec::new(),
            boot_iso: false,
            rpm_ostree: false,
            bootable: false,
            base_partition_tables: None,
            required_partition_sizes: None,
            image,
        }
    }
}

/// A complete image recipe bound to a distribution, architecture, and
/// platform.
pub struct ImageType {
    distro: Arc<DistroData>,
    arch_name: String,
    platform: Platform,
    def: ImageTypeDef,
}

impl ImageType {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn arch_name(&self) -> &str {
        &self.arch_name
    }

    pub fn distro_name(&self) -> &str {
        &self.distro.name
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn filename(&self) -> &str {
        &self.def.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.def.mime_type
    }

    pub fn boot_mode(&self) -> BootMode {
        boot_mode(&self.platform)
    }

    pub fn build_pipelines(&self) -> &[String] {
        &self.def.build_pipelines
    }

    pub fn payload_pipelines(&self) -> &[String] {
        &self.def.payload_pipelines
    }

    pub fn exports(&self) -> Vec<String> {
        if self.def.exports.is_empty() {
            return vec!["assembler".to_string()];
        }
        self.def.exports.clone()
    }

    /// Package sets beyond `os` that end up in the image payload.
    pub fn payload_package_sets(&self) -> Vec<&'static str> {
        vec![BLUEPRINT_PKGS_KEY]
    }

    pub fn ostree_ref(&self) -> String {
        if !self.def.rpm_ostree {
            return String::new();
        }
        self.distro
            .ostree_ref_tmpl
            .as_deref()
            .unwrap_or_default()
            .replace("{arch}", &self.arch_name)
    }

    pub fn isolabel(&self) -> String {
        self.distro.isolabel_tmpl.replace("{arch}", &self.arch_name)
    }

    /// Effective image size. Zero selects the default; vhd sizes round up
    /// to a whole MiB because Azure requires it.
    pub fn size(&self, size: u64) -> u64 {
        let mib = crate::disk::MIB;
        let size = if size == 0 { self.def.default_size } else { size };
        if self.def.name == "vhd" && size % mib != 0 {
            (size / mib + 1) * mib
        } else {
            size
        }
    }

    pub fn default_image_config(&self) -> ImageConfig {
        self.def
            .default_image_config
            .clone()
            .inherit_from(&self.distro.default_image_config)
    }

    pub(crate) fn runner(&self) -> &str {
        &self.distro.runner
    }

    pub(crate) fn os_version(&self) -> &str {
        &self.distro.os_version
    }

    pub(crate) fn product(&self) -> &str {
        &self.distro.product
    }

    pub(crate) fn vendor(&self) -> &str {
        &self.distro.vendor
    }

    pub(crate) fn oscap_profile_allowed(&self, profile: &str) -> bool {
        self.distro
            .oscap_profile_allowlist
            .iter()
            .any(|allowed| allowed == profile)
    }

    pub(crate) fn partition_table(
        &self,
        mountpoints: &[FilesystemCustomization],
        options: &ImageOptions,
        rng: &mut StdRng,
    ) -> Result<PartitionTable> {
        let base = self
            .def
            .base_partition_tables
            .and_then(|lookup| lookup(&self.arch_name))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no partition table for image type {:?} on {:?}",
                    self.def.name,
                    self.arch_name
                )
            })?;

        let image_size = self.size(options.size);
        let lvmify = !self.def.rpm_ostree;
        let required: Option<Vec<(&str, u64)>> = self
            .def
            .required_partition_sizes
            .as_ref()
            .map(|sizes| sizes.iter().map(|(mp, size)| (mp.as_str(), *size)).collect());

        PartitionTable::new_customized(
            &base,
            mountpoints,
            image_size,
            lvmify,
            required.as_deref(),
            rng,
        )
    }

    /// Assemble the package-set chains for this image type: evaluate the
    /// definition's set functions, merge tagged repositories into the
    /// right sets, and extract the chain order from a planning manifest.
    pub fn package_sets(
        &self,
        bp: &Blueprint,
        options: &ImageOptions,
        repos: &[RepoConfig],
    ) -> Result<BTreeMap<String, Vec<PackageSet>>> {
        let mut sets: BTreeMap<String, PackageSet> = BTreeMap::new();
        for (name, getter) in &self.def.package_sets {
            sets.insert(name.clone(), getter(self));
        }

        // payload-tagged repos also land on the os set, so the OS
        // pipeline sees every payload repository
        let repos = merge_payload_repo_tags(repos, &self.payload_package_sets());
        for repo in &repos {
            if repo.package_sets.is_empty() {
                continue;
            }
            for set_name in &repo.package_sets {
                sets.entry(set_name.clone())
                    .or_default()
                    .repositories
                    .push(repo.clone());
            }
        }

        let mut options = options.clone();
        // Package sets may be requested before the ostree commit is
        // resolved, but installer manifests refuse to initialize without
        // a checksum. The ostree content has no effect on package sets,
        // so plan with a placeholder.
        if self.def.rpm_ostree && self.def.boot_iso && options.ostree.fetch_checksum.is_empty() {
            options.ostree.fetch_checksum = OsTreeImageOptions::planning_checksum();
            tracing::warn!(
                image_type = %self.def.name,
                "requesting package sets without a resolved ostree commit; using a planning checksum"
            );
        }
        options.ostree.image_ref = self.ostree_ref();

        let containers: Vec<ContainerSpec> = bp
            .containers
            .iter()
            .map(|container| ContainerSpec {
                source: container.source.clone(),
                local_name: container.name.clone(),
                tls_verify: container.tls_verify,
                ..Default::default()
            })
            .collect();

        let (manifest, _warnings) =
            self.initialize_manifest(bp, &options, &repos, &sets, &containers, 0)?;
        Ok(manifest.package_set_chains())
    }

    /// Build and serialize the manifest for this image type. Returns the
    /// manifest bytes and any non-fatal warnings.
    pub fn manifest(
        &self,
        customizations: Option<&Customizations>,
        options: &ImageOptions,
        repos: &[RepoConfig],
        resolved: &BTreeMap<String, Vec<PackageSpec>>,
        containers: &[ContainerSpec],
        seed: u64,
    ) -> Result<(Vec<u8>, Vec<String>)> {
        let bp = Blueprint {
            name: "empty blueprint".to_string(),
            customizations: customizations.cloned(),
            ..Default::default()
        };

        let repos = merge_payload_repo_tags(repos, &self.payload_package_sets());
        let (manifest, warnings) =
            self.initialize_manifest(&bp, options, &repos, &BTreeMap::new(), containers, seed)?;
        let bytes = manifest.serialize(resolved)?;
        Ok((bytes, warnings))
    }

    fn initialize_manifest(
        &self,
        bp: &Blueprint,
        options: &ImageOptions,
        repos: &[RepoConfig],
        package_sets: &BTreeMap<String, PackageSet>,
        containers: &[ContainerSpec],
        seed: u64,
    ) -> Result<(Manifest, Vec<String>)> {
        let customizations = bp.customizations();
        let warnings = self.check_options(&customizations, options, containers)?;

        let services = customizations.services.clone().unwrap_or_default();
        let workload = Workload {
            packages: bp.package_names(),
            repos: package_sets
                .get(BLUEPRINT_PKGS_KEY)
                .map(|set| set.repositories.clone())
                .unwrap_or_default(),
            enabled_services: services.enabled,
            disabled_services: services.disabled,
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let request = ImageRequest {
            workload: &workload,
            customizations: &customizations,
            options,
            package_sets,
            containers,
            rng: &mut rng,
        };
        let kind = (self.def.image)(self, request)?;

        let mut manifest = Manifest::new();
        kind.instantiate(&mut manifest, repos, self.runner())?;
        Ok((manifest, warnings))
    }

    /// Validate customizations and options against this image type.
    /// Fatal violations error; the returned strings are non-fatal
    /// warnings (deprecations, workaround notices).
    pub fn check_options(
        &self,
        customizations: &Customizations,
        options: &ImageOptions,
        containers: &[ContainerSpec],
    ) -> Result<Vec<String>> {
        let warnings = Vec::new();
        let name = self.def.name.as_str();

        // containers may only be embedded into commits themselves
        let commit_types = ["iot-commit", "iot-container", "edge-commit", "edge-container"];
        if !containers.is_empty() && self.def.rpm_ostree && !commit_types.contains(&name) {
            bail!(
                "embedding containers is not supported for {} on {}",
                name,
                self.distro.name
            );
        }

        if self.def.boot_iso && self.def.rpm_ostree && options.ostree.fetch_checksum.is_empty() {
            bail!(
                "boot ISO image type {name:?} requires specifying a URL from which to retrieve the OSTree commit"
            );
        }

        if matches!(name, "iot-raw-image" | "edge-raw-image") {
            let allowed = ["User", "Group", "Directories", "Files", "Services"];
            customizations.check_allowed(&allowed).map_err(|err| {
                anyhow::anyhow!(
                    "unsupported blueprint customizations found for image type {name:?} (allowed: {}): {err}",
                    allowed.join(", ")
                )
            })?;
        }

        if self.def.boot_iso
            && matches!(name, "iot-installer" | "edge-installer" | "image-installer")
        {
            let allowed = ["User", "Group"];
            customizations.check_allowed(&allowed).map_err(|err| {
                anyhow::anyhow!(
                    "unsupported blueprint customizations found for boot ISO image type {name:?} (allowed: {}): {err}",
                    allowed.join(", ")
                )
            })?;
        }

        if self.def.rpm_ostree {
            if !customizations.kernel().append.is_empty() {
                bail!("kernel boot parameter customizations are not supported for ostree types");
            }
            if !customizations.filesystem.is_empty() {
                bail!("custom mountpoints are not supported for ostree types");
            }
        }

        let mountpoint_policy = pathpolicy::mountpoint_policies();
        for fs in &customizations.filesystem {
            mountpoint_policy.check(&fs.mountpoint)?;
        }

        if let Some(oscap) = &customizations.openscap {
            if !self.oscap_profile_allowed(&oscap.profile_id) {
                bail!("OpenSCAP unsupported profile: {}", oscap.profile_id);
            }
            if self.def.rpm_ostree {
                bail!("OpenSCAP customizations are not supported for ostree types");
            }
            if oscap.datastream.is_empty() {
                bail!("OpenSCAP datastream cannot be empty");
            }
            if oscap.profile_id.is_empty() {
                bail!("OpenSCAP profile cannot be empty");
            }
        }

        customizations.validate_dir_file_customizations()?;
        customizations.check_repositories()?;

        Ok(warnings)
    }
}

/// Shorthand for the distribution modules' package-set tables.
pub(crate) fn package_set(include: &[&str], exclude: &[&str]) -> PackageSet {
    PackageSet {
        include: include.iter().map(|s| s.to_string()).collect(),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        repositories: Vec::new(),
    }
}

/// Tag payload-set repositories onto the os set as well, so the OS
/// pipeline's rpm stage sees every repository that contributes payload
/// packages. Monotonic: tags are only ever added.
fn merge_payload_repo_tags(repos: &[RepoConfig], payload_sets: &[&str]) -> Vec<RepoConfig> {
    repos
        .iter()
        .map(|repo| {
            let mut repo = repo.clone();
            let has_os = repo.package_sets.iter().any(|set| set == OS_PKGS_KEY);
            let has_payload = repo
                .package_sets
                .iter()
                .any(|set| payload_sets.contains(&set.as_str()));
            if !has_os && has_payload {
                repo.package_sets.push(OS_PKGS_KEY.to_string());
            }
            repo
        })
        .collect()
}

/// All known distributions.
pub struct Registry {
    distros: BTreeMap<String, Distribution>,
}

impl Registry {
    pub fn new(distros: Vec<Distribution>) -> Registry {
        Registry {
            distros: distros
                .into_iter()
                .map(|distro| (distro.name().to_string(), distro))
                .collect(),
        }
    }

    /// Every distribution this build of the planner knows about.
    pub fn with_defaults() -> Registry {
        Registry::new(vec![
            fedora::new_f36(),
            fedora::new_f37(),
            fedora::new_f38(),
            fedora::new_f39(),
            rhel9::new_centos9(),
            rhel9::new_rhel92(),
        ])
    }

    pub fn list_distros(&self) -> Vec<&str> {
        self.distros.keys().map(String::as_str).collect()
    }

    pub fn get_distro(&self, name: &str) -> Result<&Distribution, LookupError> {
        self.distros
            .get(name)
            .ok_or_else(|| LookupError::UnknownDistro(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_config_inheritance_fills_unset_fields() {
        let distro_default = ImageConfig {
            timezone: Some("UTC".into()),
            locale: Some("en_US".into()),
            ..Default::default()
        };
        let leaf = ImageConfig {
            locale: Some("C.UTF-8".into()),
            ..Default::default()
        };
        let effective = leaf.inherit_from(&distro_default);
        assert_eq!(effective.timezone.as_deref(), Some("UTC"));
        assert_eq!(effective.locale.as_deref(), Some("C.UTF-8"));
    }

    #[test]
    fn image_config_inheritance_recurses_into_sshd() {
        let parent = ImageConfig {
            sshd_config: Some(osbuild::SshdConfig {
                password_authentication: Some(false),
                client_alive_interval: Some(180),
                ..Default::default()
            }),
            ..Default::default()
        };
        let leaf = ImageConfig {
            sshd_config: Some(osbuild::SshdConfig {
                password_authentication: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let effective = leaf.inherit_from(&parent);
        let sshd = effective.sshd_config.unwrap();
        // leaf override wins, untouched sibling survives
        assert_eq!(sshd.password_authentication, Some(true));
        assert_eq!(sshd.client_alive_interval, Some(180));
    }

    #[test]
    fn payload_repo_tags_merge_onto_os() {
        let repos = vec![RepoConfig {
            id: "payload".into(),
            package_sets: vec![BLUEPRINT_PKGS_KEY.to_string()],
            ..Default::default()
        }];
        let merged = merge_payload_repo_tags(&repos, &[BLUEPRINT_PKGS_KEY]);
        assert!(merged[0].package_sets.iter().any(|set| set == OS_PKGS_KEY));

        // untouched when os is already tagged
        let merged_again = merge_payload_repo_tags(&merged, &[BLUEPRINT_PKGS_KEY]);
        assert_eq!(
            merged_again[0]
                .package_sets
                .iter()
                .filter(|set| set.as_str() == OS_PKGS_KEY)
                .count(),
            1
        );
    }

    #[test]
    fn planning_checksum_is_all_f() {
        let checksum = OsTreeImageOptions::planning_checksum();
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c == 'f'));
    }

    fn unused_image(_t: &ImageType, _req: ImageRequest) -> Result<ImageKind> {
        bail!("not expected to be constructed")
    }

    #[test]
    #[should_panic(expected = "already defined")]
    fn duplicate_alias_registration_panics() {
        let distro = Distribution::new(DistroData {
            name: "testdistro-1".into(),
            product: "Test".into(),
            os_version: "1".into(),
            release_version: "1".into(),
            module_platform_id: "platform:t1".into(),
            vendor: "test".into(),
            ostree_ref_tmpl: None,
            isolabel_tmpl: "Test-1-{arch}".into(),
            runner: "org.osbuild.test1".into(),
            default_image_config: ImageConfig::default(),
            oscap_profile_allowlist: Vec::new(),
        });
        let mut arch = distro.new_arch("x86_64");

        let mut first = ImageTypeDef::new("one", "one.img", "application/disk", unused_image);
        first.name_aliases = vec!["shared-alias".to_string()];
        let mut second = ImageTypeDef::new("two", "two.img", "application/disk", unused_image);
        second.name_aliases = vec!["shared-alias".to_string()];

        arch.add_image_types(
            &Platform::X86 {
                base: crate::platform::BasePlatform::default(),
                bios: true,
                uefi_vendor: None,
            },
            vec![first, second],
        );
    }
}
