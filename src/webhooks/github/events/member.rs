use serde::Deserialize;

use crate::webhooks::github::events::{GitHubUser, Repository};

/// Body of a `member` webhook delivery.
#[derive(Debug, Deserialize)]
pub struct MemberHook {
    pub action: String,
    #[serde(default)]
    pub member: GitHubUser,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub changes: Option<MemberChanges>,
}

#[derive(Debug, Deserialize)]
pub struct MemberChanges {
    #[serde(default)]
    pub permission: Option<PermissionChange>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionChange {
    #[serde(default)]
    pub to: Option<String>,
}
