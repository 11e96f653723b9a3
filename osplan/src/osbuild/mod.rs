//! The osbuild manifest document model.
//!
//! These types serialize to the stable manifest format the image-assembly
//! engine consumes: `{version: "2", pipelines: [...], sources: {...}}`.
//! Every stage is a typed `org.osbuild.*` operation; structural
//! constraints on stage options (required fields, at-least-one rules) are
//! enforced by the options types' `Serialize` implementations, so an
//! invalid stage fails at manifest serialization time, before any output
//! is emitted.

mod disk;
mod encoders;
mod files;
mod firewall;
mod installer;
mod oscap;
mod ostree;
mod rpm;
mod selinux;
mod sysconfig;
mod system;
mod systemd;
mod users;

pub use disk::*;
pub use encoders::*;
pub use files::*;
pub use firewall::*;
pub use installer::*;
pub use oscap::*;
pub use ostree::*;
pub use rpm::*;
pub use selinux::*;
pub use sysconfig::*;
pub use system::*;
pub use systemd::*;
pub use users::*;

use std::collections::BTreeMap;

use serde::Serialize;

use rpmmd::PackageSpec;

/// The serialized manifest document.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub version: &'static str,
    pub pipelines: Vec<Pipeline>,
    pub sources: Sources,
}

impl Manifest {
    pub fn new(pipelines: Vec<Pipeline>, sources: Sources) -> Manifest {
        Manifest {
            version: "2",
            pipelines,
            sources,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Pipeline {
        Pipeline {
            name: name.into(),
            runner: None,
            build: None,
            stages: Vec::new(),
        }
    }

    /// Reference usable as another pipeline's build or input.
    pub fn reference(&self) -> String {
        format!("name:{}", self.name)
    }
}

/// One typed build operation.
#[derive(Debug, Serialize)]
pub struct Stage {
    #[serde(rename = "type")]
    pub stage_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<StageOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<&'static str, Input>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<BTreeMap<String, Device>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mounts: Option<Vec<Mount>>,
}

impl Stage {
    pub fn new(stage_type: &'static str, options: StageOptions) -> Stage {
        Stage {
            stage_type,
            options: Some(options),
            inputs: None,
            devices: None,
            mounts: None,
        }
    }

    /// A stage that takes no options at all.
    pub fn bare(stage_type: &'static str) -> Stage {
        Stage {
            stage_type,
            options: None,
            inputs: None,
            devices: None,
            mounts: None,
        }
    }

    pub fn with_input(mut self, name: &'static str, input: Input) -> Stage {
        self.inputs.get_or_insert_with(BTreeMap::new).insert(name, input);
        self
    }

    pub fn with_devices(mut self, devices: BTreeMap<String, Device>) -> Stage {
        self.devices = Some(devices);
        self
    }

    pub fn with_mounts(mut self, mounts: Vec<Mount>) -> Stage {
        self.mounts = Some(mounts);
        self
    }
}

/// The options payload of a stage. Closed set: every stage type the
/// planner can emit has exactly one variant here.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StageOptions {
    Anaconda(AnacondaStageOptions),
    Buildstamp(BuildstampStageOptions),
    Chrony(ChronyStageOptions),
    Copy(CopyStageOptions),
    Discinfo(DiscinfoStageOptions),
    Firewall(FirewallStageOptions),
    FixBls(FixBlsStageOptions),
    Fstab(FstabStageOptions),
    Groups(GroupsStageOptions),
    Grub2(Grub2StageOptions),
    Grub2Inst(Grub2InstStageOptions),
    Grub2Iso(Grub2IsoStageOptions),
    Hostname(HostnameStageOptions),
    ImplantIsomd5(ImplantIsomd5StageOptions),
    Isolinux(IsolinuxStageOptions),
    Kcmdline(KernelCmdlineStageOptions),
    Keymap(KeymapStageOptions),
    Locale(LocaleStageOptions),
    Lvm2Create(Lvm2CreateStageOptions),
    Mkdir(MkdirStageOptions),
    MkfsBtrfs(MkfsBtrfsStageOptions),
    MkfsExt4(MkfsExt4StageOptions),
    MkfsFat(MkfsFatStageOptions),
    MkfsXfs(MkfsXfsStageOptions),
    OciArchive(OciArchiveStageOptions),
    OscapAutotailor(OscapAutotailorStageOptions),
    OscapRemediation(OscapRemediationStageOptions),
    OstreeCommit(OstreeCommitStageOptions),
    OstreeConfig(OstreeConfigStageOptions),
    OstreeDeploy(OstreeDeployStageOptions),
    OstreeInit(OstreeInitStageOptions),
    OstreeOsInit(OstreeOsInitStageOptions),
    OstreePrepTree(OstreePrepTreeStageOptions),
    OstreePull(OstreePullStageOptions),
    Ovf(OvfStageOptions),
    Qemu(QemuStageOptions),
    Rpm(RpmStageOptions),
    Selinux(SelinuxStageOptions),
    Sfdisk(SfdiskStageOptions),
    SshdConfig(SshdConfigStageOptions),
    Squashfs(SquashfsStageOptions),
    Sysconfig(SysconfigStageOptions),
    Systemd(SystemdStageOptions),
    SystemdJournald(SystemdJournaldStageOptions),
    Tar(TarStageOptions),
    Timezone(TimezoneStageOptions),
    Truncate(TruncateStageOptions),
    Users(UsersStageOptions),
    Xorrisofs(XorrisofsStageOptions),
    Xz(XzStageOptions),
    Zipl(ZiplStageOptions),
}

/// A stage input: content from a source or from another pipeline.
#[derive(Debug, Serialize)]
pub struct Input {
    #[serde(rename = "type")]
    pub input_type: &'static str,
    pub origin: &'static str,
    pub references: serde_json::Value,
}

impl Input {
    /// RPM payloads by checksum, materialized from the sources section.
    pub fn files_from_packages(packages: &[PackageSpec]) -> Input {
        let references: BTreeMap<String, serde_json::Value> = packages
            .iter()
            .map(|pkg| (pkg.checksum.clone(), serde_json::json!({})))
            .collect();
        Input {
            input_type: "org.osbuild.files",
            origin: "org.osbuild.source",
            references: serde_json::to_value(references).expect("map of empty objects"),
        }
    }

    /// The output tree of another pipeline.
    pub fn tree_from_pipeline(pipeline: &str) -> Input {
        Input {
            input_type: "org.osbuild.tree",
            origin: "org.osbuild.pipeline",
            references: serde_json::json!([format!("name:{pipeline}")]),
        }
    }

    /// A single file produced by another pipeline.
    pub fn file_from_pipeline(pipeline: &str, file: &str) -> Input {
        Input {
            input_type: "org.osbuild.files",
            origin: "org.osbuild.pipeline",
            references: serde_json::json!({
                format!("name:{pipeline}"): { "file": file }
            }),
        }
    }

    /// An ostree commit from another pipeline.
    pub fn ostree_commit_from_pipeline(pipeline: &str, commit_ref: &str) -> Input {
        Input {
            input_type: "org.osbuild.ostree",
            origin: "org.osbuild.pipeline",
            references: serde_json::json!({
                format!("name:{pipeline}"): { "ref": commit_ref }
            }),
        }
    }

    /// A remote ostree commit, materialized from the sources section.
    pub fn ostree_commit_from_source(checksum: &str) -> Input {
        Input {
            input_type: "org.osbuild.ostree",
            origin: "org.osbuild.source",
            references: serde_json::json!([checksum]),
        }
    }

    /// Container images by image id, materialized from the sources section.
    pub fn containers(references: BTreeMap<String, serde_json::Value>) -> Input {
        Input {
            input_type: "org.osbuild.containers",
            origin: "org.osbuild.source",
            references: serde_json::to_value(references).expect("map of container refs"),
        }
    }
}

/// A host device made available to a stage.
#[derive(Debug, Serialize)]
pub struct Device {
    #[serde(rename = "type")]
    pub device_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub options: DeviceOptions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DeviceOptions {
    Loopback {
        filename: String,
        start: u64,
        size: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        lock: Option<bool>,
    },
    Lvm2Lv {
        volume: String,
    },
}

impl Device {
    /// Loopback device over a partition of an image file; offsets in
    /// sectors.
    pub fn loopback(filename: &str, start: u64, size: u64) -> Device {
        Device {
            device_type: "org.osbuild.loopback",
            parent: None,
            options: DeviceOptions::Loopback {
                filename: filename.to_string(),
                start,
                size,
                lock: Some(true),
            },
        }
    }

    /// A logical volume on a parent loopback device.
    pub fn lvm2_lv(parent: &str, volume: &str) -> Device {
        Device {
            device_type: "org.osbuild.lvm2.lv",
            parent: Some(parent.to_string()),
            options: DeviceOptions::Lvm2Lv {
                volume: volume.to_string(),
            },
        }
    }
}

/// A mounted filesystem visible to a stage.
#[derive(Debug, Serialize)]
pub struct Mount {
    pub name: String,
    #[serde(rename = "type")]
    pub mount_type: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<u64>,
}

impl Mount {
    pub fn new(name: &str, fs_type: &str, source: &str, target: &str) -> Mount {
        Mount {
            name: name.to_string(),
            mount_type: format!("org.osbuild.{fs_type}"),
            source: source.to_string(),
            target: target.to_string(),
            partition: None,
        }
    }

    /// Mount a numbered partition (1-based) of the source device.
    pub fn partition(name: &str, fs_type: &str, source: &str, target: &str, number: u64) -> Mount {
        Mount {
            partition: Some(number),
            ..Mount::new(name, fs_type, source, target)
        }
    }
}

/// The sources section: external content the engine fetches before any
/// pipeline runs.
#[derive(Debug, Default, Serialize)]
pub struct Sources {
    #[serde(rename = "org.osbuild.curl", skip_serializing_if = "Option::is_none")]
    pub curl: Option<CurlSource>,
    #[serde(rename = "org.osbuild.ostree", skip_serializing_if = "Option::is_none")]
    pub ostree: Option<OstreeSource>,
    #[serde(rename = "org.osbuild.skopeo", skip_serializing_if = "Option::is_none")]
    pub skopeo: Option<SkopeoSource>,
}

#[derive(Debug, Default, Serialize)]
pub struct CurlSource {
    /// checksum → download descriptor.
    pub items: BTreeMap<String, CurlItem>,
}

#[derive(Debug, Serialize)]
pub struct CurlItem {
    pub url: String,
}

#[derive(Debug, Default, Serialize)]
pub struct OstreeSource {
    /// commit checksum → fetch descriptor.
    pub items: BTreeMap<String, OstreeItem>,
}

#[derive(Debug, Serialize)]
pub struct OstreeItem {
    pub remote: OstreeRemote,
}

#[derive(Debug, Serialize)]
pub struct OstreeRemote {
    pub url: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SkopeoSource {
    /// image id → image descriptor.
    pub items: BTreeMap<String, SkopeoItem>,
}

#[derive(Debug, Serialize)]
pub struct SkopeoItem {
    pub image: SkopeoImage,
}

#[derive(Debug, Serialize)]
pub struct SkopeoImage {
    pub name: String,
    pub digest: String,
}

impl Sources {
    /// Register every package's remote location under its checksum.
    pub fn add_packages(&mut self, packages: &[PackageSpec]) {
        if packages.is_empty() {
            return;
        }
        let curl = self.curl.get_or_insert_with(CurlSource::default);
        for pkg in packages {
            if pkg.checksum.is_empty() || pkg.remote_location.is_empty() {
                continue;
            }
            curl.items.insert(
                pkg.checksum.clone(),
                CurlItem {
                    url: pkg.remote_location.clone(),
                },
            );
        }
    }

    /// Register a remote ostree commit under its checksum.
    pub fn add_ostree_commit(&mut self, checksum: &str, url: &str) {
        let ostree = self.ostree.get_or_insert_with(OstreeSource::default);
        ostree.items.insert(
            checksum.to_string(),
            OstreeItem {
                remote: OstreeRemote {
                    url: url.to_string(),
                },
            },
        );
    }

    pub fn add_container(&mut self, image_id: &str, name: &str, digest: &str) {
        let skopeo = self.skopeo.get_or_insert_with(SkopeoSource::default);
        skopeo.items.insert(
            image_id.to_string(),
            SkopeoItem {
                image: SkopeoImage {
                    name: name.to_string(),
                    digest: digest.to_string(),
                },
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_document_shape() {
        let mut pipeline = Pipeline::new("build");
        pipeline.runner = Some("org.osbuild.fedora38".to_string());
        let manifest = Manifest::new(vec![pipeline], Sources::default());

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["version"], "2");
        assert_eq!(value["pipelines"][0]["name"], "build");
        assert_eq!(value["pipelines"][0]["runner"], "org.osbuild.fedora38");
    }

    #[test]
    fn package_input_references_checksums() {
        let packages = vec![PackageSpec {
            name: "bash".into(),
            checksum: "sha256:00aa".into(),
            remote_location: "https://example.org/bash.rpm".into(),
            ..Default::default()
        }];
        let input = Input::files_from_packages(&packages);
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["origin"], "org.osbuild.source");
        assert!(value["references"].get("sha256:00aa").is_some());
    }

    #[test]
    fn sources_deduplicate_by_checksum() {
        let pkg = PackageSpec {
            name: "bash".into(),
            checksum: "sha256:00aa".into(),
            remote_location: "https://example.org/bash.rpm".into(),
            ..Default::default()
        };
        let mut sources = Sources::default();
        sources.add_packages(&[pkg.clone(), pkg]);
        assert_eq!(sources.curl.as_ref().unwrap().items.len(), 1);
    }

    #[test]
    fn pipeline_reference_is_name_prefixed() {
        assert_eq!(Pipeline::new("os").reference(), "name:os");
    }
}
