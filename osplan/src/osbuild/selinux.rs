//! SELinux relabeling stage.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct SelinuxStageOptions {
    pub file_contexts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Relabel the tree with the policy's file contexts. Runs last in a
/// pipeline so every file the earlier stages created gets labeled.
pub fn new_selinux_stage(file_contexts: &str) -> Stage {
    Stage::new(
        "org.osbuild.selinux",
        StageOptions::Selinux(SelinuxStageOptions {
            file_contexts: file_contexts.to_string(),
            labels: None,
        }),
    )
}

/// Relabel with explicit label overrides; the build root needs
/// install_exec_t on a handful of tools.
pub fn new_selinux_stage_with_labels(
    file_contexts: &str,
    labels: BTreeMap<String, String>,
) -> Stage {
    Stage::new(
        "org.osbuild.selinux",
        StageOptions::Selinux(SelinuxStageOptions {
            file_contexts: file_contexts.to_string(),
            labels: Some(labels),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selinux_stage_wire_shape() {
        let stage = new_selinux_stage("etc/selinux/targeted/contexts/files/file_contexts");
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["type"], "org.osbuild.selinux");
        assert!(value["options"].get("labels").is_none());
    }
}
