//! Clients for the BlameWarrior services this mediator talks to: the collaborators directory,
//! the users service handing out GitHub tokens, and the consumer that receives enriched pull
//! requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use thiserror::Error;
use url::Url;

use crate::model::{Collaborator, PullRequest};

mod collaborators;
mod consumer;
mod tokens;

pub use collaborators::CollaboratorsClient;
pub use consumer::ConsumerClient;
pub use tokens::TokensClient;

pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unable to {operation} for {subject}: {source}")]
    Request {
        operation: &'static str,
        subject: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unable to {operation} for {subject}, status_code={status}")]
    UnexpectedStatus {
        operation: &'static str,
        subject: String,
        status: u16,
    },

    #[error("token for {0} user cannot be empty")]
    EmptyToken(String),

    #[error("invalid service url `{0}`")]
    InvalidUrl(String),

    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ServiceError {
    fn request(operation: &'static str, subject: &str) -> impl FnOnce(reqwest::Error) -> Self {
        let subject = subject.to_owned();
        move |source| Self::Request {
            operation,
            subject,
            source,
        }
    }
}

/// Directory of the collaborators of every tracked repository.
#[async_trait]
pub trait CollaboratorsDirectory: Send + Sync {
    async fn list_collaborators(&self, repository: &str)
        -> Result<Vec<Collaborator>, ServiceError>;

    async fn add_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError>;

    async fn edit_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError>;

    async fn delete_collaborator(&self, repository: &str, login: &str)
        -> Result<(), ServiceError>;
}

/// Maps a user to the GitHub access token they granted.
#[async_trait]
pub trait Tokens: Send + Sync {
    async fn token_for(&self, username: &str) -> Result<String, ServiceError>;
}

/// Downstream service receiving fully enriched pull requests.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn process_pull_request(&self, pull_request: &PullRequest) -> Result<(), ServiceError>;
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ServiceError::Client)
}

fn base_url(url: &str) -> Result<Url, ServiceError> {
    match Url::parse(url) {
        Ok(base) if !base.cannot_be_a_base() => Ok(base),
        _ => Err(ServiceError::InvalidUrl(url.to_owned())),
    }
}

/// `base` followed by `segments`, each one percent-encoded so it stays a single path segment.
fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn expect_status(
    response: &Response,
    expected: StatusCode,
    operation: &'static str,
    subject: &str,
) -> Result<(), ServiceError> {
    if response.status() == expected {
        Ok(())
    } else {
        Err(ServiceError::UnexpectedStatus {
            operation,
            subject: subject.to_owned(),
            status: response.status().as_u16(),
        })
    }
}
