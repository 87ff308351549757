//! Adapter for the GitHub REST API.
//!
//! Everything the mediator needs from GitHub goes through the [`Reviewers`] and [`Repositories`]
//! traits, implemented on top of octocrab. Its errors are translated into [`GitHubError`] before
//! they leave this module.

use async_trait::async_trait;

use crate::model::{Collaborator, ReviewComment};

mod client;
mod error;
mod repositories;
mod reviewers;

pub use client::GitHubClient;
pub use error::GitHubError;
pub use repositories::GitHubRepositories;
pub use reviewers::GitHubReviewers;

/// Review requests and review comments of pull requests.
#[async_trait]
pub trait Reviewers: Send + Sync {
    async fn request_reviewers(
        &self,
        repository: &str,
        number: u64,
        reviewers: &[Collaborator],
    ) -> Result<(), GitHubError>;

    /// Every review comment of the pull request, in the order GitHub returns them.
    async fn review_comments(
        &self,
        repository: &str,
        number: u64,
    ) -> Result<Vec<ReviewComment>, GitHubError>;
}

/// Webhook registration on a repository, on behalf of the user owning `token`.
#[async_trait]
pub trait Repositories: Send + Sync {
    /// Everyone with access to the repository, admins flagged.
    async fn collaborators(
        &self,
        token: &str,
        repository: &str,
    ) -> Result<Vec<Collaborator>, GitHubError>;

    async fn track(&self, token: &str, repository: &str, callback_url: &str)
        -> Result<(), GitHubError>;

    async fn untrack(
        &self,
        token: &str,
        repository: &str,
        callback_url: &str,
    ) -> Result<(), GitHubError>;
}

/// Splits `owner/name` into its two parts.
pub fn split_repository_name(repository: &str) -> Option<(&str, &str)> {
    let (owner, name) = repository.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }

    Some((owner, name))
}

pub(crate) fn parse_repository_name(repository: &str) -> Result<(&str, &str), GitHubError> {
    split_repository_name(repository)
        .ok_or_else(|| GitHubError::InvalidRepositoryName(repository.to_owned()))
}
