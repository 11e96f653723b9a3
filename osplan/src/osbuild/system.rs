//! Basic system configuration stages: locale, keymap, timezone, time
//! synchronization, hostname, boot-loader entry fixup and kernel command
//! line.

use serde::Serialize;

use super::{Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct LocaleStageOptions {
    pub language: String,
}

pub fn new_locale_stage(language: &str) -> Stage {
    Stage::new(
        "org.osbuild.locale",
        StageOptions::Locale(LocaleStageOptions {
            language: language.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct KeymapStageOptions {
    pub keymap: String,
}

pub fn new_keymap_stage(keymap: &str) -> Stage {
    Stage::new(
        "org.osbuild.keymap",
        StageOptions::Keymap(KeymapStageOptions {
            keymap: keymap.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct TimezoneStageOptions {
    pub zone: String,
}

pub fn new_timezone_stage(zone: &str) -> Stage {
    Stage::new(
        "org.osbuild.timezone",
        StageOptions::Timezone(TimezoneStageOptions {
            zone: zone.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct ChronyStageOptions {
    pub timeservers: Vec<String>,
}

pub fn new_chrony_stage(timeservers: Vec<String>) -> Stage {
    Stage::new(
        "org.osbuild.chrony",
        StageOptions::Chrony(ChronyStageOptions { timeservers }),
    )
}

#[derive(Debug, Serialize)]
pub struct HostnameStageOptions {
    pub hostname: String,
}

pub fn new_hostname_stage(hostname: &str) -> Stage {
    Stage::new(
        "org.osbuild.hostname",
        StageOptions::Hostname(HostnameStageOptions {
            hostname: hostname.to_string(),
        }),
    )
}

/// Rewrite the BLS entries to use a path prefix, normally empty so the
/// entries are portable between the build tree and the final image.
#[derive(Debug, Serialize)]
pub struct FixBlsStageOptions {
    pub prefix: String,
}

pub fn new_fix_bls_stage(prefix: &str) -> Stage {
    Stage::new(
        "org.osbuild.fix-bls",
        StageOptions::FixBls(FixBlsStageOptions {
            prefix: prefix.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct KernelCmdlineStageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_fs_uuid: Option<String>,
    pub kernel_opts: String,
}

pub fn new_kernel_cmdline_stage(root_fs_uuid: Option<String>, kernel_opts: &str) -> Stage {
    Stage::new(
        "org.osbuild.kernel-cmdline",
        StageOptions::Kcmdline(KernelCmdlineStageOptions {
            root_fs_uuid,
            kernel_opts: kernel_opts.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timezone_stage_wire_shape() {
        let stage = new_timezone_stage("UTC");
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["type"], "org.osbuild.timezone");
        assert_eq!(value["options"]["zone"], "UTC");
    }

    #[test]
    fn kernel_cmdline_omits_missing_root_uuid() {
        let stage = new_kernel_cmdline_stage(None, "ro console=ttyS0");
        let value = serde_json::to_value(&stage).unwrap();
        assert!(value["options"].get("root_fs_uuid").is_none());
        assert_eq!(value["options"]["kernel_opts"], "ro console=ttyS0");
    }
}
