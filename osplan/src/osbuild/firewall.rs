//! firewalld configuration stage.

use serde::Serialize;

use crate::blueprint::FirewallCustomization;

use super::{Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct FirewallStageOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled_services: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_services: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<FirewallZoneOptions>,
}

#[derive(Debug, Default, Serialize)]
pub struct FirewallZoneOptions {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl From<&FirewallCustomization> for FirewallStageOptions {
    fn from(firewall: &FirewallCustomization) -> FirewallStageOptions {
        let services = firewall.services.clone().unwrap_or_default();
        FirewallStageOptions {
            ports: firewall.ports.clone(),
            enabled_services: services.enabled,
            disabled_services: services.disabled,
            zones: firewall
                .zones
                .iter()
                .map(|zone| FirewallZoneOptions {
                    name: zone.name.clone(),
                    sources: zone.sources.clone(),
                })
                .collect(),
        }
    }
}

pub fn new_firewall_stage(options: FirewallStageOptions) -> Stage {
    Stage::new("org.osbuild.firewall", StageOptions::Firewall(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::FirewallServices;

    #[test]
    fn customization_maps_onto_stage_options() {
        let firewall = FirewallCustomization {
            ports: vec!["8080:tcp".into()],
            services: Some(FirewallServices {
                enabled: vec!["https".into()],
                disabled: vec!["telnet".into()],
            }),
            zones: Vec::new(),
        };
        let value = serde_json::to_value(new_firewall_stage((&firewall).into())).unwrap();
        assert_eq!(value["options"]["ports"][0], "8080:tcp");
        assert_eq!(value["options"]["enabled_services"][0], "https");
        assert_eq!(value["options"]["disabled_services"][0], "telnet");
    }
}
