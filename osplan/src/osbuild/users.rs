//! User and group creation stages.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::blueprint::{GroupCustomization, UserCustomization};

use super::{Stage, StageOptions};

#[derive(Debug, Default, Serialize)]
pub struct UsersStageOptions {
    pub users: BTreeMap<String, UsersStageUser>,
}

#[derive(Debug, Default, Serialize)]
pub struct UsersStageUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<&UserCustomization> for UsersStageUser {
    fn from(user: &UserCustomization) -> UsersStageUser {
        UsersStageUser {
            uid: user.uid,
            gid: user.gid,
            groups: (!user.groups.is_empty()).then(|| user.groups.clone()),
            description: user.description.clone(),
            home: user.home.clone(),
            shell: user.shell.clone(),
            password: user.password.clone(),
            key: user.key.clone(),
        }
    }
}

pub fn new_users_stage(users: &[UserCustomization]) -> Stage {
    let users = users
        .iter()
        .map(|user| (user.name.clone(), UsersStageUser::from(user)))
        .collect();
    Stage::new(
        "org.osbuild.users",
        StageOptions::Users(UsersStageOptions { users }),
    )
}

#[derive(Debug, Default, Serialize)]
pub struct GroupsStageOptions {
    pub groups: BTreeMap<String, GroupsStageGroup>,
}

#[derive(Debug, Default, Serialize)]
pub struct GroupsStageGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u64>,
}

pub fn new_groups_stage(groups: &[GroupCustomization]) -> Stage {
    let groups = groups
        .iter()
        .map(|group| (group.name.clone(), GroupsStageGroup { gid: group.gid }))
        .collect();
    Stage::new(
        "org.osbuild.groups",
        StageOptions::Groups(GroupsStageOptions { groups }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_stage_keys_by_name() {
        let users = vec![UserCustomization {
            name: "admin".into(),
            key: Some("ssh-ed25519 AAAA...".into()),
            groups: vec!["wheel".into()],
            ..Default::default()
        }];
        let value = serde_json::to_value(new_users_stage(&users)).unwrap();
        assert_eq!(value["type"], "org.osbuild.users");
        assert_eq!(value["options"]["users"]["admin"]["groups"][0], "wheel");
        assert!(value["options"]["users"]["admin"].get("uid").is_none());
    }

    #[test]
    fn groups_stage_keys_by_name() {
        let groups = vec![GroupCustomization {
            name: "admins".into(),
            gid: Some(1200),
        }];
        let value = serde_json::to_value(new_groups_stage(&groups)).unwrap();
        assert_eq!(value["options"]["groups"]["admins"]["gid"], 1200);
    }
}
