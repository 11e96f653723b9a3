//! OpenSCAP tailoring and remediation stages.

use serde::Serialize;

use super::{Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct OscapAutotailorStageOptions {
    pub filepath: String,
    pub config: OscapAutotailorConfig,
}

#[derive(Debug, Default, Serialize)]
pub struct OscapAutotailorConfig {
    pub datastream: String,
    pub profile_id: String,
    pub new_profile: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unselected: Vec<String>,
}

pub fn new_oscap_autotailor_stage(filepath: &str, config: OscapAutotailorConfig) -> Stage {
    Stage::new(
        "org.osbuild.oscap.autotailor",
        StageOptions::OscapAutotailor(OscapAutotailorStageOptions {
            filepath: filepath.to_string(),
            config,
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct OscapRemediationStageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    pub config: OscapRemediationConfig,
}

#[derive(Debug, Default, Serialize)]
pub struct OscapRemediationConfig {
    pub datastream: String,
    pub profile_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailoring_path: Option<String>,
}

pub fn new_oscap_remediation_stage(
    data_dir: Option<String>,
    config: OscapRemediationConfig,
) -> Stage {
    Stage::new(
        "org.osbuild.oscap.remediation",
        StageOptions::OscapRemediation(OscapRemediationStageOptions { data_dir, config }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_stage_wire_shape() {
        let stage = new_oscap_remediation_stage(
            Some("/oscap_data".into()),
            OscapRemediationConfig {
                datastream: "/usr/share/xml/scap/ssg/content/ssg-fedora-ds.xml".into(),
                profile_id: "xccdf_org.ssgproject.content_profile_ospp".into(),
                tailoring_path: None,
            },
        );
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["type"], "org.osbuild.oscap.remediation");
        assert_eq!(value["options"]["data_dir"], "/oscap_data");
        assert!(value["options"]["config"]["profile_id"]
            .as_str()
            .unwrap()
            .contains("ospp"));
    }
}
