//! In-memory adapters and payload fixtures shared by the tests.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::assignment::RandomSource;
use crate::github::{GitHubError, Reviewers};
use crate::mediator::{Delivery, Mediate, MediationError};
use crate::model::{Collaborator, DecodeError, PullRequest, ReviewComment};
use crate::queue::{PayloadQueue, QueueError};
use crate::services::{CollaboratorsDirectory, Consumer, ServiceError, Tokens};

fn unavailable(operation: &'static str, subject: &str) -> ServiceError {
    ServiceError::UnexpectedStatus {
        operation,
        subject: subject.to_owned(),
        status: 503,
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryQueue {
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().map(ToOwned::to_owned).collect()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PayloadQueue for MemoryQueue {
    async fn save(&self, payload: &str) -> Result<(), QueueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
        }
        self.entries.lock().unwrap().push(payload.to_owned());
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        Ok(self.entries().into_iter().take(limit).collect())
    }

    async fn delete(&self, payload: &str) -> Result<(), QueueError> {
        self.entries.lock().unwrap().retain(|entry| entry != payload);
        Ok(())
    }

    async fn requeue(&self, payload: &str) -> Result<(), QueueError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|entry| entry != payload);
        entries.push(payload.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    List(String),
    Add(String, Collaborator),
    Edit(String, Collaborator),
    Delete(String, String),
}

#[derive(Default)]
pub struct MemoryDirectory {
    collaborators: Vec<Collaborator>,
    calls: Mutex<Vec<DirectoryCall>>,
    failing: AtomicBool,
}

impl MemoryDirectory {
    pub fn with_collaborators(collaborators: Vec<Collaborator>) -> Self {
        Self {
            collaborators,
            ..Default::default()
        }
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        call: DirectoryCall,
        operation: &'static str,
        repository: &str,
    ) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable(operation, repository));
        }
        Ok(())
    }
}

#[async_trait]
impl CollaboratorsDirectory for MemoryDirectory {
    async fn list_collaborators(
        &self,
        repository: &str,
    ) -> Result<Vec<Collaborator>, ServiceError> {
        self.record(
            DirectoryCall::List(repository.to_owned()),
            "get collaborators",
            repository,
        )?;
        Ok(self.collaborators.clone())
    }

    async fn add_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError> {
        self.record(
            DirectoryCall::Add(repository.to_owned(), collaborator.clone()),
            "add collaborator",
            repository,
        )
    }

    async fn edit_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError> {
        self.record(
            DirectoryCall::Edit(repository.to_owned(), collaborator.clone()),
            "edit collaborator",
            repository,
        )
    }

    async fn delete_collaborator(&self, repository: &str, login: &str) -> Result<(), ServiceError> {
        self.record(
            DirectoryCall::Delete(repository.to_owned(), login.to_owned()),
            "delete collaborator",
            repository,
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ReviewersFailure {
    #[default]
    None,
    RateLimited,
    RepositoryNotFound,
    RequestRefused,
}

#[derive(Default)]
pub struct RecordingReviewers {
    comments: Vec<ReviewComment>,
    failure: ReviewersFailure,
    requested: Mutex<Vec<(String, u64, Vec<Collaborator>)>>,
    comment_calls: Mutex<Vec<(String, u64)>>,
}

impl RecordingReviewers {
    pub fn with_comments(comments: Vec<ReviewComment>) -> Self {
        Self {
            comments,
            ..Default::default()
        }
    }

    /// Review comments run into the rate limit.
    pub fn rate_limited() -> Self {
        Self::failing(ReviewersFailure::RateLimited)
    }

    /// Review comments of a repository GitHub doesn't know.
    pub fn repository_not_found() -> Self {
        Self::failing(ReviewersFailure::RepositoryNotFound)
    }

    /// GitHub refuses every review request.
    pub fn refusing_requests() -> Self {
        Self::failing(ReviewersFailure::RequestRefused)
    }

    fn failing(failure: ReviewersFailure) -> Self {
        Self {
            failure,
            ..Default::default()
        }
    }

    pub fn requested(&self) -> Vec<(String, u64, Vec<Collaborator>)> {
        self.requested.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<(String, u64)> {
        self.comment_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reviewers for RecordingReviewers {
    async fn request_reviewers(
        &self,
        repository: &str,
        number: u64,
        reviewers: &[Collaborator],
    ) -> Result<(), GitHubError> {
        self.requested
            .lock()
            .unwrap()
            .push((repository.to_owned(), number, reviewers.to_vec()));
        if self.failure == ReviewersFailure::RequestRefused {
            return Err(GitHubError::RequestFailed {
                operation: "request reviewers",
                repository: repository.to_owned(),
                message: "GitHub returned 422 Unprocessable Entity: Reviews may only be \
                          requested from collaborators."
                    .to_owned(),
            });
        }
        Ok(())
    }

    async fn review_comments(
        &self,
        repository: &str,
        number: u64,
    ) -> Result<Vec<ReviewComment>, GitHubError> {
        self.comment_calls
            .lock()
            .unwrap()
            .push((repository.to_owned(), number));
        match self.failure {
            ReviewersFailure::RateLimited => Err(GitHubError::RateLimitExceeded {
                operation: "get review comments",
                repository: repository.to_owned(),
            }),
            ReviewersFailure::RepositoryNotFound => {
                Err(GitHubError::RepositoryNotFound(repository.to_owned()))
            }
            _ => Ok(self.comments.clone()),
        }
    }
}

#[derive(Default)]
pub struct RecordingConsumer {
    received: Mutex<Vec<PullRequest>>,
    failing: bool,
}

impl RecordingConsumer {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn received(&self) -> Vec<PullRequest> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Consumer for RecordingConsumer {
    async fn process_pull_request(&self, pull_request: &PullRequest) -> Result<(), ServiceError> {
        if self.failing {
            return Err(unavailable(
                "process hook",
                &pull_request.repository_full_name,
            ));
        }
        self.received.lock().unwrap().push(pull_request.clone());
        Ok(())
    }
}

/// Records deliveries instead of mediating them.
#[derive(Default)]
pub struct RecordingMediator {
    deliveries: Mutex<Vec<Delivery>>,
    failing: bool,
}

impl RecordingMediator {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mediate for RecordingMediator {
    async fn mediate(&self, delivery: Delivery) -> Result<(), MediationError> {
        self.deliveries.lock().unwrap().push(delivery);
        if self.failing {
            return Err(DecodeError::Invalid(vec!["id must not be empty".to_owned()]).into());
        }
        Ok(())
    }
}

/// Always picks the same index.
pub struct FixedSource(pub usize);

impl RandomSource for FixedSource {
    fn pick(&self, _len: usize) -> usize {
        self.0
    }
}

/// Hands out the same token to everyone, except to `nobody` who has none.
pub struct StaticTokens(String);

impl StaticTokens {
    pub fn new(token: &str) -> Self {
        Self(token.to_owned())
    }
}

#[async_trait]
impl Tokens for StaticTokens {
    async fn token_for(&self, username: &str) -> Result<String, ServiceError> {
        if username == "nobody" {
            return Err(ServiceError::EmptyToken(username.to_owned()));
        }
        Ok(self.0.clone())
    }
}

/// A `pull_request` delivery for blamewarrior_user/public-repo#1.
pub fn pull_request_payload(state: &str, requested_reviewers: Value) -> String {
    let (action, closed_at) = if state == "open" {
        ("opened", Value::Null)
    } else {
        ("closed", json!("2015-05-06T10:12:01Z"))
    };

    json!({
        "action": action,
        "number": 1,
        "pull_request": {
            "url": "https://api.github.com/repos/blamewarrior_user/public-repo/pulls/1",
            "id": 34778301,
            "html_url": "https://github.com/blamewarrior_user/public-repo/pull/1",
            "number": 1,
            "state": state,
            "locked": false,
            "title": "Update the README with new information",
            "user": {
                "login": "blamewarrior_user",
                "id": 6752317,
                "type": "User",
                "site_admin": false
            },
            "body": "This is a pretty simple change that we need to pull into master.",
            "created_at": "2015-05-05T23:40:27Z",
            "updated_at": "2015-05-05T23:40:27Z",
            "closed_at": closed_at,
            "merged_at": null,
            "merged": false,
            "comments": 0,
            "review_comments": 0,
            "commits": 1,
            "additions": 1,
            "deletions": 1,
            "changed_files": 1
        },
        "requested_reviewers": requested_reviewers,
        "repository": {
            "id": 35129377,
            "name": "public-repo",
            "full_name": "blamewarrior_user/public-repo",
            "owner": {
                "login": "blamewarrior_user",
                "id": 6752317
            },
            "private": false
        },
        "sender": {
            "login": "blamewarrior_user",
            "id": 6752317
        }
    })
    .to_string()
}

/// A `member` delivery adding octocat to baxterthehacker/public-repo.
pub fn member_payload(action: &str) -> String {
    json!({
        "action": action,
        "member": {
            "login": "octocat",
            "id": 583231,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=3",
            "type": "User",
            "site_admin": false
        },
        "repository": {
            "id": 35129377,
            "name": "public-repo",
            "full_name": "baxterthehacker/public-repo",
            "owner": {
                "login": "baxterthehacker",
                "id": 6752317
            },
            "private": false
        },
        "sender": {
            "login": "baxterthehacker",
            "id": 6752317
        }
    })
    .to_string()
}
