//! systemd service enablement and journald configuration stages.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use super::{Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct SystemdStageOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled_services: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_services: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub masked_services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
}

impl SystemdStageOptions {
    pub fn is_empty(&self) -> bool {
        self.enabled_services.is_empty()
            && self.disabled_services.is_empty()
            && self.masked_services.is_empty()
            && self.default_target.is_none()
    }
}

pub fn new_systemd_stage(options: SystemdStageOptions) -> Stage {
    Stage::new("org.osbuild.systemd", StageOptions::Systemd(options))
}

#[derive(Debug, Default, Serialize)]
pub struct SystemdJournaldStageOptions {
    pub filename: String,
    pub config: SystemdJournaldConfigDropin,
}

pub fn new_systemd_journald_stage(options: SystemdJournaldStageOptions) -> Stage {
    Stage::new(
        "org.osbuild.systemd-journald",
        StageOptions::SystemdJournald(options),
    )
}

#[derive(Debug, Default, Serialize)]
pub struct SystemdJournaldConfigDropin {
    #[serde(rename = "Journal")]
    pub journal: SystemdJournaldConfigJournalSection,
}

/// The `[Journal]` section of a journald drop-in. At least one option
/// must be set; an empty section is rejected when the stage serializes.
#[derive(Debug, Clone, Default)]
pub struct SystemdJournaldConfigJournalSection {
    /// Controls where to store journal data.
    pub storage: Option<String>,
    /// Whether to compress stored data objects; may carry a threshold.
    pub compress: Option<String>,
    /// Split journal files per user or keep a single file.
    pub split_mode: Option<String>,
    /// Maximum time to store entries in a single file.
    pub max_file_sec: Option<String>,
    /// Maximum time to store journal entries at all.
    pub max_retention_sec: Option<String>,
    /// Timeout before synchronizing journal files to disk.
    pub sync_interval_sec: Option<u64>,
    /// Enable or disable kernel auditing on start-up.
    pub audit: Option<String>,
}

impl SystemdJournaldConfigJournalSection {
    fn has_any_option(&self) -> bool {
        self.storage.is_some()
            || self.compress.is_some()
            || self.split_mode.is_some()
            || self.max_file_sec.is_some()
            || self.max_retention_sec.is_some()
            || self.sync_interval_sec.is_some()
            || self.audit.is_some()
    }
}

impl Serialize for SystemdJournaldConfigJournalSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.has_any_option() {
            return Err(S::Error::custom(
                "at least one 'Journal' section option must be specified",
            ));
        }

        #[derive(Serialize)]
        struct Section<'a> {
            #[serde(rename = "Storage", skip_serializing_if = "Option::is_none")]
            storage: Option<&'a String>,
            #[serde(rename = "Compress", skip_serializing_if = "Option::is_none")]
            compress: Option<&'a String>,
            #[serde(rename = "SplitMode", skip_serializing_if = "Option::is_none")]
            split_mode: Option<&'a String>,
            #[serde(rename = "MaxFileSec", skip_serializing_if = "Option::is_none")]
            max_file_sec: Option<&'a String>,
            #[serde(rename = "MaxRetentionSec", skip_serializing_if = "Option::is_none")]
            max_retention_sec: Option<&'a String>,
            #[serde(rename = "SyncIntervalSec", skip_serializing_if = "Option::is_none")]
            sync_interval_sec: Option<u64>,
            #[serde(rename = "Audit", skip_serializing_if = "Option::is_none")]
            audit: Option<&'a String>,
        }

        Section {
            storage: self.storage.as_ref(),
            compress: self.compress.as_ref(),
            split_mode: self.split_mode.as_ref(),
            max_file_sec: self.max_file_sec.as_ref(),
            max_retention_sec: self.max_retention_sec.as_ref(),
            sync_interval_sec: self.sync_interval_sec,
            audit: self.audit.as_ref(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_journal_section_refuses_to_serialize() {
        let options = SystemdJournaldStageOptions {
            filename: "10-persistent.conf".into(),
            config: SystemdJournaldConfigDropin::default(),
        };
        let err = serde_json::to_string(&options).unwrap_err();
        assert!(err
            .to_string()
            .contains("at least one 'Journal' section option must be specified"));
    }

    #[test]
    fn journal_section_with_storage_serializes() {
        let options = SystemdJournaldStageOptions {
            filename: "10-persistent.conf".into(),
            config: SystemdJournaldConfigDropin {
                journal: SystemdJournaldConfigJournalSection {
                    storage: Some("persistent".into()),
                    ..Default::default()
                },
            },
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["config"]["Journal"]["Storage"], "persistent");
        assert!(value["config"]["Journal"].get("Compress").is_none());
    }

    #[test]
    fn enablement_order_is_preserved() {
        let options = SystemdStageOptions {
            enabled_services: vec!["sshd.service".into(), "chronyd.service".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(new_systemd_stage(options)).unwrap();
        assert_eq!(value["options"]["enabled_services"][0], "sshd.service");
        assert_eq!(value["options"]["enabled_services"][1], "chronyd.service");
    }
}
