use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::webhooks::github::events::{GitHubUser, Repository};

/// Body of a `pull_request` webhook delivery.
///
/// Everything is optional here: missing fields are reported together by the model's validation
/// instead of failing on the first one.
#[derive(Debug, Default, Deserialize)]
pub struct PullRequestHook {
    #[serde(default)]
    pub pull_request: Option<PullRequestDetails>,
    #[serde(default)]
    pub repository: Option<Repository>,
    // reviewers can be given at the top level of the hook or inside the pull request itself
    #[serde(default)]
    pub requested_reviewers: Option<Vec<GitHubUser>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PullRequestDetails {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub commits: Option<u64>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default)]
    pub requested_reviewers: Option<Vec<GitHubUser>>,
}
