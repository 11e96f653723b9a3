//! The build-host pipeline, always first in the manifest.

use std::collections::BTreeMap;

use anyhow::Result;

use rpmmd::{PackageSet, RepoConfig};

use crate::osbuild;

use super::{gpg_keys, Content};

pub struct BuildPipeline {
    pub runner: String,
    pub chain: Vec<PackageSet>,
    pub repos: Vec<RepoConfig>,
}

impl BuildPipeline {
    pub fn new(runner: &str, build_set: PackageSet, repos: Vec<RepoConfig>) -> BuildPipeline {
        BuildPipeline {
            runner: runner.to_string(),
            chain: vec![build_set],
            repos,
        }
    }

    pub(crate) fn serialize(&self, content: &Content) -> Result<osbuild::Pipeline> {
        let mut pipeline = osbuild::Pipeline::new("build");
        pipeline.runner = Some(self.runner.clone());

        pipeline.stages.push(osbuild::new_rpm_stage(
            osbuild::RpmStageOptions {
                gpgkeys: gpg_keys(&self.repos),
                disable_dracut: Some(true),
                ..Default::default()
            },
            content.packages("build"),
        ));

        // the build root runs osbuild modules; a few tools need the
        // install_exec_t entrypoint label
        let labels: BTreeMap<String, String> = [
            ("/usr/bin/cp", "system_u:object_r:install_exec_t:s0"),
            ("/usr/bin/tar", "system_u:object_r:install_exec_t:s0"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        pipeline.stages.push(osbuild::new_selinux_stage_with_labels(
            "etc/selinux/targeted/contexts/files/file_contexts",
            labels,
        ));

        Ok(pipeline)
    }
}
