use http::StatusCode;
use thiserror::Error;

use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub rate limit exceeded, unable to {operation} for {repository}")]
    RateLimitExceeded {
        operation: &'static str,
        repository: String,
    },

    #[error("repository {0} not found")]
    RepositoryNotFound(String),

    #[error("unable to {operation} for {repository}: {message}")]
    RequestFailed {
        operation: &'static str,
        repository: String,
        message: String,
    },

    #[error("invalid repository name `{0}`, expected owner/name")]
    InvalidRepositoryName(String),

    #[error("no hook with url {callback_url} on {repository}")]
    HookNotFound {
        repository: String,
        callback_url: String,
    },

    #[error("unable to get token of {owner}: {source}")]
    Token {
        owner: String,
        #[source]
        source: ServiceError,
    },

    #[error("invalid GitHub API url {url}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("unable to build GitHub client: {0}")]
    Client(#[source] octocrab::Error),
}

/// GitHub answers an exhausted quota with 403 or 429, and says so either in the message or by
/// pointing at the rate limit documentation.
fn is_rate_limited(status: StatusCode, message: &str, documentation_url: Option<&str>) -> bool {
    let is_rate_limit_status = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );
    let message_indicates_rate_limit = message.to_lowercase().contains("rate limit")
        || documentation_url.is_some_and(|url| url.contains("rate-limit"));

    is_rate_limit_status && message_indicates_rate_limit
}

fn is_rate_limit_error(source: &octocrab::GitHubError) -> bool {
    is_rate_limited(
        source.status_code,
        &source.message,
        source.documentation_url.as_deref(),
    )
}

/// Maps a failed octocrab call to a [`GitHubError`].
pub(super) fn map_octocrab_error(
    operation: &'static str,
    repository: &str,
    error: &octocrab::Error,
) -> GitHubError {
    let octocrab::Error::GitHub { source, .. } = error else {
        return GitHubError::RequestFailed {
            operation,
            repository: repository.to_owned(),
            message: error.to_string(),
        };
    };

    if is_rate_limit_error(source) {
        return GitHubError::RateLimitExceeded {
            operation,
            repository: repository.to_owned(),
        };
    }

    if source.status_code == StatusCode::NOT_FOUND {
        return GitHubError::RepositoryNotFound(repository.to_owned());
    }

    GitHubError::RequestFailed {
        operation,
        repository: repository.to_owned(),
        message: format!("GitHub returned {}: {}", source.status_code, source.message),
    }
}
