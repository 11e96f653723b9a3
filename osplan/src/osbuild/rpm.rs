//! The RPM installation stage.

use serde::Serialize;

use rpmmd::PackageSpec;

use super::{Input, Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct RpmStageOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<RpmExclude>,
    /// Skip dracut during %posttrans; initramfs generation is its own
    /// stage when needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_dracut: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ostree_booted: Option<bool>,
}

#[derive(Debug, Default, Serialize)]
pub struct RpmExclude {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<bool>,
}

/// Install the resolved packages into the tree.
pub fn new_rpm_stage(options: RpmStageOptions, packages: &[PackageSpec]) -> Stage {
    Stage::new("org.osbuild.rpm", StageOptions::Rpm(options))
        .with_input("packages", Input::files_from_packages(packages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_stage_carries_package_input() {
        let packages = vec![PackageSpec {
            name: "kernel".into(),
            checksum: "sha256:beef".into(),
            remote_location: "https://example.org/kernel.rpm".into(),
            ..Default::default()
        }];
        let stage = new_rpm_stage(RpmStageOptions::default(), &packages);
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["type"], "org.osbuild.rpm");
        assert!(value["inputs"]["packages"]["references"]
            .get("sha256:beef")
            .is_some());
    }

    #[test]
    fn exclude_docs_serializes() {
        let options = RpmStageOptions {
            exclude: Some(RpmExclude { docs: Some(true) }),
            ..Default::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["exclude"]["docs"], true);
    }
}
