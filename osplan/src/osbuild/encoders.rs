//! Image encoding and archiving stages.

use serde::Serialize;

use super::{Input, Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct QemuStageOptions {
    pub filename: String,
    pub format: QemuFormat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QemuFormat {
    Qcow2 {
        #[serde(skip_serializing_if = "Option::is_none")]
        compat: Option<String>,
    },
    Vpc {
        #[serde(skip_serializing_if = "Option::is_none")]
        force_size: Option<bool>,
    },
    Vmdk {
        #[serde(skip_serializing_if = "Option::is_none")]
        subformat: Option<String>,
    },
}

/// Convert a raw image from another pipeline with qemu-img.
pub fn new_qemu_stage(
    filename: &str,
    format: QemuFormat,
    source_pipeline: &str,
    source_file: &str,
) -> Stage {
    Stage::new(
        "org.osbuild.qemu",
        StageOptions::Qemu(QemuStageOptions {
            filename: filename.to_string(),
            format,
        }),
    )
    .with_input("image", Input::file_from_pipeline(source_pipeline, source_file))
}

#[derive(Debug, Serialize)]
pub struct XzStageOptions {
    pub filename: String,
}

pub fn new_xz_stage(filename: &str, source_pipeline: &str, source_file: &str) -> Stage {
    Stage::new(
        "org.osbuild.xz",
        StageOptions::Xz(XzStageOptions {
            filename: filename.to_string(),
        }),
    )
    .with_input("file", Input::file_from_pipeline(source_pipeline, source_file))
}

#[derive(Debug, Serialize)]
pub struct TarStageOptions {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
}

/// Archive another pipeline's tree.
pub fn new_tar_stage(filename: &str, source_pipeline: &str) -> Stage {
    Stage::new(
        "org.osbuild.tar",
        StageOptions::Tar(TarStageOptions {
            filename: filename.to_string(),
            format: None,
        }),
    )
    .with_input("tree", Input::tree_from_pipeline(source_pipeline))
}

#[derive(Debug, Serialize)]
pub struct OvfStageOptions {
    pub vmdk: String,
}

/// Write the OVF descriptor and manifest next to a vmdk.
pub fn new_ovf_stage(vmdk: &str, source_pipeline: &str) -> Stage {
    Stage::new(
        "org.osbuild.ovf",
        StageOptions::Ovf(OvfStageOptions {
            vmdk: vmdk.to_string(),
        }),
    )
    .with_input("vmdk", Input::file_from_pipeline(source_pipeline, vmdk))
}

#[derive(Debug, Serialize)]
pub struct OciArchiveStageOptions {
    pub filename: String,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<OciArchiveConfig>,
}

#[derive(Debug, Default, Serialize)]
pub struct OciArchiveConfig {
    #[serde(rename = "Cmd", skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(rename = "Env", skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

/// Pack a tree into an OCI archive.
pub fn new_oci_archive_stage(filename: &str, architecture: &str, source_pipeline: &str) -> Stage {
    Stage::new(
        "org.osbuild.oci-archive",
        StageOptions::OciArchive(OciArchiveStageOptions {
            filename: filename.to_string(),
            architecture: architecture.to_string(),
            config: Some(OciArchiveConfig {
                cmd: vec!["/bin/bash".to_string()],
                env: Vec::new(),
            }),
        }),
    )
    .with_input("base", Input::tree_from_pipeline(source_pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qcow2_format_carries_compat() {
        let stage = new_qemu_stage(
            "disk.qcow2",
            QemuFormat::Qcow2 {
                compat: Some("1.1".into()),
            },
            "image",
            "disk.raw",
        );
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["options"]["format"]["type"], "qcow2");
        assert_eq!(value["options"]["format"]["compat"], "1.1");
        assert_eq!(
            value["inputs"]["image"]["references"]["name:image"]["file"],
            "disk.raw"
        );
    }

    #[test]
    fn vpc_format_is_lowercased() {
        let stage = new_qemu_stage(
            "disk.vhd",
            QemuFormat::Vpc { force_size: None },
            "image",
            "disk.raw",
        );
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["options"]["format"]["type"], "vpc");
    }

    #[test]
    fn tar_stage_references_tree() {
        let value = serde_json::to_value(new_tar_stage("commit.tar", "ostree-commit")).unwrap();
        assert_eq!(value["inputs"]["tree"]["references"][0], "name:ostree-commit");
    }
}
