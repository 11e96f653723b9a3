//! Tree manipulation stages: directory creation, file copies, image file
//! truncation.

use serde::Serialize;

use crate::blueprint::{DirectoryCustomization, FileCustomization};

use super::{Input, Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct MkdirStageOptions {
    pub paths: Vec<MkdirPath>,
}

#[derive(Debug, Default, Serialize)]
pub struct MkdirPath {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exist_ok: Option<bool>,
}

pub fn new_mkdir_stage(directories: &[DirectoryCustomization]) -> Stage {
    let paths = directories
        .iter()
        .map(|dir| MkdirPath {
            path: dir.path.clone(),
            mode: dir.mode.clone(),
            parents: dir.ensure_parents.then_some(true),
            exist_ok: Some(true),
        })
        .collect();
    Stage::new(
        "org.osbuild.mkdir",
        StageOptions::Mkdir(MkdirStageOptions { paths }),
    )
}

#[derive(Debug, Default, Serialize)]
pub struct CopyStageOptions {
    pub paths: Vec<CopyPath>,
}

#[derive(Debug, Default, Serialize)]
pub struct CopyPath {
    pub from: String,
    pub to: String,
}

/// Copy another pipeline's tree into a target, commonly a mounted disk.
pub fn new_copy_tree_stage(source_pipeline: &str, to: &str) -> Stage {
    Stage::new(
        "org.osbuild.copy",
        StageOptions::Copy(CopyStageOptions {
            paths: vec![CopyPath {
                from: "input://tree/".to_string(),
                to: to.to_string(),
            }],
        }),
    )
    .with_input("tree", Input::tree_from_pipeline(source_pipeline))
}

/// Write blueprint file customizations into the tree.
///
/// The files' contents travel inline in the copy paths; sizable payloads
/// belong in proper sources, but blueprint files are config snippets.
pub fn new_write_files_stage(files: &[FileCustomization]) -> Stage {
    use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

    let paths = files
        .iter()
        .map(|file| CopyPath {
            from: format!(
                "data:text/plain;base64,{}",
                BASE64_STANDARD.encode(file.data.as_bytes())
            ),
            to: format!("tree://{}", file.path),
        })
        .collect();
    Stage::new(
        "org.osbuild.copy",
        StageOptions::Copy(CopyStageOptions { paths }),
    )
}

#[derive(Debug, Serialize)]
pub struct TruncateStageOptions {
    pub filename: String,
    /// Size in bytes, as a decimal string.
    pub size: String,
}

pub fn new_truncate_stage(filename: &str, size: u64) -> Stage {
    Stage::new(
        "org.osbuild.truncate",
        StageOptions::Truncate(TruncateStageOptions {
            filename: filename.to_string(),
            size: size.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkdir_stage_carries_modes() {
        let dirs = vec![DirectoryCustomization {
            path: "/etc/app".into(),
            mode: Some("0750".into()),
            ensure_parents: true,
            ..Default::default()
        }];
        let value = serde_json::to_value(new_mkdir_stage(&dirs)).unwrap();
        assert_eq!(value["options"]["paths"][0]["path"], "/etc/app");
        assert_eq!(value["options"]["paths"][0]["mode"], "0750");
        assert_eq!(value["options"]["paths"][0]["parents"], true);
    }

    #[test]
    fn copy_tree_stage_references_source_pipeline() {
        let stage = new_copy_tree_stage("os", "mount://root/");
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["inputs"]["tree"]["references"][0], "name:os");
        assert_eq!(value["options"]["paths"][0]["to"], "mount://root/");
    }

    #[test]
    fn file_customizations_become_data_urls() {
        let files = vec![FileCustomization {
            path: "/etc/motd".into(),
            data: "welcome\n".into(),
            ..Default::default()
        }];
        let value = serde_json::to_value(new_write_files_stage(&files)).unwrap();
        let from = value["options"]["paths"][0]["from"].as_str().unwrap();
        assert!(from.starts_with("data:text/plain;base64,"));
        assert_eq!(value["options"]["paths"][0]["to"], "tree:///etc/motd");
    }

    #[test]
    fn truncate_size_is_a_string() {
        let value = serde_json::to_value(new_truncate_stage("disk.img", 42)).unwrap();
        assert_eq!(value["options"]["size"], "42");
    }
}
