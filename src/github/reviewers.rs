use std::sync::Arc;

use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::github::client::PER_PAGE;
use crate::github::error::map_octocrab_error;
use crate::github::{parse_repository_name, GitHubClient, GitHubError, Reviewers};
use crate::model::{Collaborator, ReviewComment};
use crate::services::Tokens;

#[derive(Debug, Serialize)]
struct ReviewRequest<'a> {
    reviewers: Vec<&'a str>,
}

/// [`Reviewers`] backed by GitHub, acting with the token of the repository owner.
pub struct GitHubReviewers {
    client: GitHubClient,
    tokens: Arc<dyn Tokens>,
}

impl GitHubReviewers {
    pub fn new(client: GitHubClient, tokens: Arc<dyn Tokens>) -> Self {
        Self { client, tokens }
    }

    async fn owner_client(&self, owner: &str) -> Result<Octocrab, GitHubError> {
        let token = self
            .tokens
            .token_for(owner)
            .await
            .map_err(|source| GitHubError::Token {
                owner: owner.to_owned(),
                source,
            })?;

        self.client.authenticated(&token)
    }
}

#[async_trait]
impl Reviewers for GitHubReviewers {
    async fn request_reviewers(
        &self,
        repository: &str,
        number: u64,
        reviewers: &[Collaborator],
    ) -> Result<(), GitHubError> {
        const OPERATION: &str = "request reviewers";

        let (owner, name) = parse_repository_name(repository)?;
        let github = self.owner_client(owner).await?;

        let route = format!(
            "/repos/{}/{}/pulls/{}/requested_reviewers",
            owner, name, number
        );
        let body = ReviewRequest {
            reviewers: reviewers.iter().map(|r| r.login.as_str()).collect(),
        };
        let _: Value = github
            .post(route, Some(&body))
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        debug!(
            "requested {:?} as reviewers of {}#{}",
            body.reviewers, repository, number
        );
        Ok(())
    }

    async fn review_comments(
        &self,
        repository: &str,
        number: u64,
    ) -> Result<Vec<ReviewComment>, GitHubError> {
        const OPERATION: &str = "get review comments";

        let (owner, name) = parse_repository_name(repository)?;
        let github = self.owner_client(owner).await?;

        let route = format!("/repos/{}/{}/pulls/{}/comments", owner, name, number);
        let page: Page<ReviewComment> = github
            .get(route, Some(&[("per_page", PER_PAGE)]))
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;
        let comments = github
            .all_pages(page)
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        debug!(
            "fetched {} review comments of {}#{}",
            comments.len(),
            repository,
            number
        );
        Ok(comments)
    }
}
