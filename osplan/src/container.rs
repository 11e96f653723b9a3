//! Resolved container specs.

use serde::{Deserialize, Serialize};

/// A container image resolved to a digest, ready to embed into an image.
/// Resolution itself (registry lookup) happens outside the planner; the
/// blueprint only names a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    /// Content-addressed image id used as the source key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
}
