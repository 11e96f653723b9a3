//! OSTree repository and deployment stages.

use serde::Serialize;

use super::{Input, Stage, StageOptions};

#[derive(Debug, Serialize)]
pub struct OstreeInitStageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    pub path: String,
}

pub fn new_ostree_init_stage(path: &str) -> Stage {
    Stage::new(
        "org.osbuild.ostree.init",
        StageOptions::OstreeInit(OstreeInitStageOptions {
            mode: Some("archive"),
            path: path.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct OstreeCommitStageOptions {
    #[serde(rename = "ref")]
    pub commit_ref: String,
    pub os_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Commit another pipeline's tree into the repository at /repo.
pub fn new_ostree_commit_stage(
    commit_ref: &str,
    os_version: &str,
    parent: Option<String>,
    tree_pipeline: &str,
) -> Stage {
    Stage::new(
        "org.osbuild.ostree.commit",
        StageOptions::OstreeCommit(OstreeCommitStageOptions {
            commit_ref: commit_ref.to_string(),
            os_version: os_version.to_string(),
            parent,
        }),
    )
    .with_input("tree", Input::tree_from_pipeline(tree_pipeline))
}

#[derive(Debug, Serialize)]
pub struct OstreePullStageOptions {
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Pull a commit produced by another pipeline into a repository.
pub fn new_ostree_pull_stage(repo: &str, commit_pipeline: &str, commit_ref: &str) -> Stage {
    Stage::new(
        "org.osbuild.ostree.pull",
        StageOptions::OstreePull(OstreePullStageOptions {
            repo: repo.to_string(),
            remote: None,
        }),
    )
    .with_input(
        "commits",
        Input::ostree_commit_from_pipeline(commit_pipeline, commit_ref),
    )
}

#[derive(Debug, Serialize)]
pub struct OstreeOsInitStageOptions {
    pub osname: String,
}

pub fn new_ostree_os_init_stage(osname: &str) -> Stage {
    Stage::new(
        "org.osbuild.ostree.os-init",
        StageOptions::OstreeOsInit(OstreeOsInitStageOptions {
            osname: osname.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct OstreeDeployStageOptions {
    pub osname: String,
    #[serde(rename = "ref")]
    pub deploy_ref: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<String>,
    pub rootfs: OstreeDeployRootfs,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kernel_opts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OstreeDeployRootfs {
    pub label: String,
}

pub fn new_ostree_deploy_stage(options: OstreeDeployStageOptions) -> Stage {
    Stage::new("org.osbuild.ostree.deploy", StageOptions::OstreeDeploy(options))
}

#[derive(Debug, Serialize)]
pub struct OstreePrepTreeStageOptions {
    pub etc_group_members: Vec<String>,
}

/// Rearrange a plain OS tree into the shape `ostree commit` expects.
pub fn new_ostree_preptree_stage(etc_group_members: Vec<String>) -> Stage {
    Stage::new(
        "org.osbuild.ostree.preptree",
        StageOptions::OstreePrepTree(OstreePrepTreeStageOptions { etc_group_members }),
    )
}

#[derive(Debug, Serialize)]
pub struct OstreeConfigStageOptions {
    pub repo: String,
    pub config: OstreeRepoConfig,
}

#[derive(Debug, Default, Serialize)]
pub struct OstreeRepoConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysroot: Option<OstreeSysrootConfig>,
}

#[derive(Debug, Default, Serialize)]
pub struct OstreeSysrootConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootloader: Option<String>,
}

pub fn new_ostree_config_stage(repo: &str, config: OstreeRepoConfig) -> Stage {
    Stage::new(
        "org.osbuild.ostree.config",
        StageOptions::OstreeConfig(OstreeConfigStageOptions {
            repo: repo.to_string(),
            config,
        }),
    )
}
