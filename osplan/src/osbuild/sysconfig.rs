//! /etc/sysconfig and sshd configuration stages.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use super::{Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct SysconfigStageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<SysconfigKernelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<SysconfigNetworkOptions>,
}

impl SysconfigStageOptions {
    pub fn is_empty(&self) -> bool {
        self.kernel.is_none() && self.network.is_none()
    }
}

/// /etc/sysconfig/kernel. Asking for the default kernel to be updated
/// without naming one is rejected when the stage serializes.
#[derive(Debug, Clone, Default)]
pub struct SysconfigKernelOptions {
    pub update_default: bool,
    pub default_kernel: Option<String>,
}

impl Serialize for SysconfigKernelOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.update_default && self.default_kernel.is_none() {
            return Err(S::Error::custom(
                "sysconfig kernel: UPDATEDEFAULT requires a DEFAULTKERNEL",
            ));
        }

        #[derive(Serialize)]
        struct Kernel<'a> {
            update_default: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            default_kernel: Option<&'a String>,
        }

        Kernel {
            update_default: self.update_default,
            default_kernel: self.default_kernel.as_ref(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SysconfigNetworkOptions {
    pub networking: bool,
    pub no_zero_conf: bool,
}

pub fn new_sysconfig_stage(options: SysconfigStageOptions) -> Stage {
    Stage::new("org.osbuild.sysconfig", StageOptions::Sysconfig(options))
}

/// An sshd_config drop-in. Field names follow sshd_config directives.
#[derive(Debug, Default, Serialize)]
pub struct SshdConfigStageOptions {
    pub config: SshdConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SshdConfig {
    #[serde(rename = "PasswordAuthentication", skip_serializing_if = "Option::is_none")]
    pub password_authentication: Option<bool>,
    #[serde(rename = "ChallengeResponseAuthentication", skip_serializing_if = "Option::is_none")]
    pub challenge_response_authentication: Option<bool>,
    #[serde(rename = "ClientAliveInterval", skip_serializing_if = "Option::is_none")]
    pub client_alive_interval: Option<u64>,
    #[serde(rename = "PermitRootLogin", skip_serializing_if = "Option::is_none")]
    pub permit_root_login: Option<String>,
}

impl SshdConfig {
    pub fn is_empty(&self) -> bool {
        self.password_authentication.is_none()
            && self.challenge_response_authentication.is_none()
            && self.client_alive_interval.is_none()
            && self.permit_root_login.is_none()
    }
}

pub fn new_sshd_config_stage(config: SshdConfig) -> Stage {
    Stage::new(
        "org.osbuild.sshd.config",
        StageOptions::SshdConfig(SshdConfigStageOptions { config }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_default_without_kernel_name_fails_to_serialize() {
        let options = SysconfigStageOptions {
            kernel: Some(SysconfigKernelOptions {
                update_default: true,
                default_kernel: None,
            }),
            network: None,
        };
        let err = serde_json::to_string(&options).unwrap_err();
        assert!(err.to_string().contains("DEFAULTKERNEL"));
    }

    #[test]
    fn update_default_with_kernel_name_serializes() {
        let options = SysconfigStageOptions {
            kernel: Some(SysconfigKernelOptions {
                update_default: true,
                default_kernel: Some("kernel".into()),
            }),
            network: Some(SysconfigNetworkOptions {
                networking: true,
                no_zero_conf: true,
            }),
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["kernel"]["default_kernel"], "kernel");
        assert_eq!(value["network"]["networking"], true);
    }

    #[test]
    fn sshd_config_uses_directive_names() {
        let config = SshdConfig {
            password_authentication: Some(false),
            ..Default::default()
        };
        let value = serde_json::to_value(new_sshd_config_stage(config)).unwrap();
        assert_eq!(value["options"]["config"]["PasswordAuthentication"], false);
    }
}
