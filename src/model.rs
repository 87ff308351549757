use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::webhooks::github::events::{GitHubUser, MemberHook, PullRequestHook};

const OPEN: &str = "open";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid payload: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("unsupported member action `{0}`")]
    UnsupportedAction(String),
}

/// A user with some access level on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: u64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub admin: bool,
}

impl From<GitHubUser> for Collaborator {
    fn from(user: GitHubUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            login: user.login.unwrap_or_default(),
            admin: false,
        }
    }
}

/// Review comment as returned by the GitHub API. Only `id` and `body` are looked at, every
/// other field is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequest {
    pub id: u64,
    pub html_url: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "repository_name")]
    pub repository_full_name: String,
    pub reviewers: Vec<Collaborator>,
    pub number: u64,
    pub state: String,
    #[serde(rename = "opened_at")]
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub owner_id: u64,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub review_comments: Vec<ReviewComment>,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == OPEN
    }

    /// Nobody was requested to review this pull request yet.
    pub fn needs_reviewer(&self) -> bool {
        self.reviewers.is_empty()
    }

    fn violations(&self) -> Vec<String> {
        let rules = [
            (self.id == 0, "id must not be empty"),
            (self.owner_id == 0, "owner_id must not be empty"),
            (self.number == 0, "number must not be empty"),
            (self.title.is_empty(), "title must not be empty"),
            (
                self.repository_full_name.is_empty(),
                "repository name must not be empty",
            ),
            (self.state.is_empty(), "state must not be empty"),
            (
                self.reviewers.iter().any(|reviewer| reviewer.id == 0),
                "requested reviewers must have an id",
            ),
        ];

        rules
            .iter()
            .filter(|(violated, _)| *violated)
            .map(|(_, message)| (*message).to_owned())
            .collect()
    }
}

impl From<PullRequestHook> for PullRequest {
    fn from(hook: PullRequestHook) -> Self {
        let details = hook.pull_request.unwrap_or_default();
        let requested_reviewers = [hook.requested_reviewers, details.requested_reviewers]
            .into_iter()
            .flatten()
            .find(|reviewers| !reviewers.is_empty())
            .unwrap_or_default();

        Self {
            id: details.id.unwrap_or_default(),
            html_url: details.html_url.unwrap_or_default(),
            title: details.title.unwrap_or_default(),
            body: details.body.unwrap_or_default(),
            repository_full_name: hook.repository.unwrap_or_default().full_name(),
            reviewers: requested_reviewers
                .into_iter()
                .map(Collaborator::from)
                .collect(),
            number: details.number.unwrap_or_default(),
            state: details.state.unwrap_or_default(),
            created_at: details.created_at,
            closed_at: details.closed_at,
            owner_id: details.user.and_then(|user| user.id).unwrap_or_default(),
            commits: details.commits.unwrap_or_default(),
            additions: details.additions.unwrap_or_default(),
            deletions: details.deletions.unwrap_or_default(),
            review_comments: Vec::new(),
        }
    }
}

impl Display for PullRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{} ({})", self.repository_full_name, self.number, self.state)
    }
}

/// Decodes the body of a `pull_request` webhook into a [`PullRequest`].
///
/// The requested reviewers of the hook are copied in order. When there are none,
/// [`PullRequest::reviewers`] stays empty and it is up to the caller to assign one.
pub fn decode_pull_request(raw: &str) -> Result<PullRequest, DecodeError> {
    let hook: PullRequestHook = serde_json::from_str(raw)?;
    let pull_request = PullRequest::from(hook);

    let violations = pull_request.violations();
    if !violations.is_empty() {
        return Err(DecodeError::Invalid(violations));
    }

    Ok(pull_request)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    Added,
    Edited,
    Deleted,
}

impl std::str::FromStr for MemberAction {
    type Err = DecodeError;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        match action {
            "added" => Ok(Self::Added),
            "edited" => Ok(Self::Edited),
            // GitHub calls it `removed`
            "deleted" | "removed" => Ok(Self::Deleted),
            other => Err(DecodeError::UnsupportedAction(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub action: MemberAction,
    pub repository_full_name: String,
    pub member: Collaborator,
}

/// Decodes the body of a `member` webhook into a [`MemberEvent`].
pub fn decode_member_event(raw: &str) -> Result<MemberEvent, DecodeError> {
    let hook: MemberHook = serde_json::from_str(raw)?;
    let action = hook.action.parse()?;

    let admin = hook
        .changes
        .and_then(|changes| changes.permission)
        .and_then(|permission| permission.to)
        .map_or(false, |to| to == "admin");
    let member = Collaborator {
        admin,
        ..Collaborator::from(hook.member)
    };
    let repository_full_name = hook.repository.full_name();

    let mut violations = Vec::new();
    if member.id == 0 {
        violations.push("member id must not be empty".to_owned());
    }
    if member.login.is_empty() {
        violations.push("member login must not be empty".to_owned());
    }
    if repository_full_name.is_empty() {
        violations.push("repository name must not be empty".to_owned());
    }
    if !violations.is_empty() {
        return Err(DecodeError::Invalid(violations));
    }

    Ok(MemberEvent {
        action,
        repository_full_name,
        member,
    })
}
