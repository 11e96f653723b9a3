//! Installer (boot ISO) stages.

use serde::Serialize;

use super::{Input, Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct BuildstampStageOptions {
    pub arch: String,
    pub product: String,
    pub version: String,
    #[serde(rename = "final")]
    pub final_build: bool,
    pub variant: String,
}

pub fn new_buildstamp_stage(options: BuildstampStageOptions) -> Stage {
    Stage::new("org.osbuild.buildstamp", StageOptions::Buildstamp(options))
}

#[derive(Debug, Serialize)]
pub struct AnacondaStageOptions {
    #[serde(rename = "kickstart-modules")]
    pub kickstart_modules: Vec<String>,
}

/// Configure which anaconda modules the installer activates.
pub fn new_anaconda_stage(kickstart_modules: Vec<String>) -> Stage {
    Stage::new(
        "org.osbuild.anaconda",
        StageOptions::Anaconda(AnacondaStageOptions { kickstart_modules }),
    )
}

/// The default module set for interactive installations.
pub fn anaconda_default_modules() -> Vec<String> {
    [
        "org.fedoraproject.Anaconda.Modules.Network",
        "org.fedoraproject.Anaconda.Modules.Payloads",
        "org.fedoraproject.Anaconda.Modules.Storage",
        "org.fedoraproject.Anaconda.Modules.Users",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Serialize)]
pub struct DiscinfoStageOptions {
    pub basearch: String,
    pub release: String,
}

pub fn new_discinfo_stage(basearch: &str, release: &str) -> Stage {
    Stage::new(
        "org.osbuild.discinfo",
        StageOptions::Discinfo(DiscinfoStageOptions {
            basearch: basearch.to_string(),
            release: release.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct IsolinuxStageOptions {
    pub product: IsoProduct,
    pub kernel: IsoKernel,
}

#[derive(Debug, Serialize)]
pub struct IsoProduct {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct IsoKernel {
    pub dir: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opts: Vec<String>,
}

/// BIOS boot menu for the ISO, x86_64 only.
pub fn new_isolinux_stage(product: IsoProduct, kernel: IsoKernel) -> Stage {
    Stage::new(
        "org.osbuild.isolinux",
        StageOptions::Isolinux(IsolinuxStageOptions { product, kernel }),
    )
}

#[derive(Debug, Serialize)]
pub struct Grub2IsoStageOptions {
    pub product: IsoProduct,
    pub kernel: IsoKernel,
    pub isolabel: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
    pub vendor: String,
}

/// UEFI boot menu for the ISO.
pub fn new_grub2_iso_stage(options: Grub2IsoStageOptions) -> Stage {
    Stage::new("org.osbuild.grub2.iso", StageOptions::Grub2Iso(options))
}

#[derive(Debug, Serialize)]
pub struct SquashfsStageOptions {
    pub filename: String,
    pub compression: SquashfsCompression,
}

#[derive(Debug, Serialize)]
pub struct SquashfsCompression {
    pub method: &'static str,
}

pub fn new_squashfs_stage(filename: &str, source_pipeline: &str) -> Stage {
    Stage::new(
        "org.osbuild.squashfs",
        StageOptions::Squashfs(SquashfsStageOptions {
            filename: filename.to_string(),
            compression: SquashfsCompression { method: "xz" },
        }),
    )
    .with_input("tree", Input::tree_from_pipeline(source_pipeline))
}

#[derive(Debug, Serialize)]
pub struct XorrisofsStageOptions {
    pub filename: String,
    pub volid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot: Option<XorrisofsBoot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isohybridmbr: Option<String>,
    #[serde(rename = "isolevel", skip_serializing_if = "Option::is_none")]
    pub iso_level: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct XorrisofsBoot {
    pub image: String,
    pub catalog: String,
}

/// Assemble the ISO 9660 filesystem from the bootiso tree.
pub fn new_xorrisofs_stage(options: XorrisofsStageOptions, tree_pipeline: &str) -> Stage {
    Stage::new("org.osbuild.xorrisofs", StageOptions::Xorrisofs(options))
        .with_input("tree", Input::tree_from_pipeline(tree_pipeline))
}

#[derive(Debug, Serialize)]
pub struct ImplantIsomd5StageOptions {
    pub filename: String,
}

pub fn new_implant_isomd5_stage(filename: &str) -> Stage {
    Stage::new(
        "org.osbuild.implantisomd5",
        StageOptions::ImplantIsomd5(ImplantIsomd5StageOptions {
            filename: filename.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buildstamp_final_field_name() {
        let value = serde_json::to_value(new_buildstamp_stage(BuildstampStageOptions {
            arch: "x86_64".into(),
            product: "Fedora".into(),
            version: "38".into(),
            final_build: true,
            variant: "IoT".into(),
        }))
        .unwrap();
        assert_eq!(value["options"]["final"], true);
    }

    #[test]
    fn anaconda_stage_uses_dashed_key() {
        let value = serde_json::to_value(new_anaconda_stage(anaconda_default_modules())).unwrap();
        assert!(value["options"].get("kickstart-modules").is_some());
    }

    #[test]
    fn xorrisofs_stage_references_tree() {
        let options = XorrisofsStageOptions {
            filename: "installer.iso".into(),
            volid: "Fedora-38-BaseOS-x86_64".into(),
            sysid: Some("LINUX".into()),
            boot: Some(XorrisofsBoot {
                image: "isolinux/isolinux.bin".into(),
                catalog: "isolinux/boot.cat".into(),
            }),
            efi: Some("images/efiboot.img".into()),
            isohybridmbr: Some("/usr/share/syslinux/isohdpfx.bin".into()),
            iso_level: None,
        };
        let value = serde_json::to_value(new_xorrisofs_stage(options, "bootiso-tree")).unwrap();
        assert_eq!(value["inputs"]["tree"]["references"][0], "name:bootiso-tree");
        assert_eq!(value["options"]["volid"], "Fedora-38-BaseOS-x86_64");
    }
}
