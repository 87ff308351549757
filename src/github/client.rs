use std::time::Duration;

use http::Uri;
use octocrab::Octocrab;

use crate::github::error::GitHubError;

/// Page size asked for on every listing.
pub(super) const PER_PAGE: &str = "100";

/// Builds octocrab clients against one GitHub API, one per token.
#[derive(Clone)]
pub struct GitHubClient {
    api_base: Uri,
    timeout: Duration,
}

impl GitHubClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, GitHubError> {
        let api_base = api_url
            .parse::<Uri>()
            .map_err(|source| GitHubError::InvalidApiUrl {
                url: api_url.to_owned(),
                source,
            })?;

        Ok(Self { api_base, timeout })
    }

    /// Client acting as the user owning `token`.
    pub(super) fn authenticated(&self, token: &str) -> Result<Octocrab, GitHubError> {
        Octocrab::builder()
            .set_connect_timeout(Some(self.timeout))
            .set_read_timeout(Some(self.timeout))
            .personal_token(token)
            .base_uri(self.api_base.clone())
            .map_err(GitHubError::Client)?
            .build()
            .map_err(GitHubError::Client)
    }
}
