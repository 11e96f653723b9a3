//! Workloads: what the user layers on top of the base OS payload.

use rpmmd::RepoConfig;

/// The blueprint-driven overlay applied after the image type's own OS
/// package set. Solved as a separate transaction so its excludes can win
/// over the base set.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub packages: Vec<String>,
    /// Repositories tagged for the blueprint overlay.
    pub repos: Vec<RepoConfig>,
    pub enabled_services: Vec<String>,
    pub disabled_services: Vec<String>,
}

impl Workload {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
