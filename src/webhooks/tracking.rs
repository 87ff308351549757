use std::str::FromStr;
use std::sync::Arc;

use rocket::{
    http::{uri::Origin, Status},
    State,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::github::{GitHubError, Repositories};
use crate::services::{CollaboratorsDirectory, ServiceError, Tokens};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("unsupported action {0}")]
    UnsupportedAction(String),

    #[error("unable to get token of {username}: {source}")]
    Token {
        username: String,
        #[source]
        source: ServiceError,
    },

    #[error("unable to add collaborators of {repository}: {source}")]
    Directory {
        repository: String,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingAction {
    Track,
    Untrack,
}

impl FromStr for TrackingAction {
    type Err = TrackingError;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        match action {
            "track" => Ok(Self::Track),
            "untrack" => Ok(Self::Untrack),
            other => Err(TrackingError::UnsupportedAction(other.to_owned())),
        }
    }
}

/// Registers this service's webhook on the repositories of users who ask for it.
///
/// Tracking a repository first copies its GitHub collaborators into the directory.
pub struct TrackingService {
    hostname: String,
    tokens: Arc<dyn Tokens>,
    repositories: Arc<dyn Repositories>,
    directory: Arc<dyn CollaboratorsDirectory>,
}

impl TrackingService {
    pub fn new(
        hostname: impl Into<String>,
        tokens: Arc<dyn Tokens>,
        repositories: Arc<dyn Repositories>,
        directory: Arc<dyn CollaboratorsDirectory>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            tokens,
            repositories,
            directory,
        }
    }

    /// URL GitHub delivers the events of `repository` to.
    pub fn callback_url(&self, repository: &str) -> String {
        format!("https://{}/{}/webhook", self.hostname, repository)
    }

    pub async fn do_action(
        &self,
        action: &str,
        username: &str,
        repo: &str,
    ) -> Result<(), TrackingError> {
        let action: TrackingAction = action.parse()?;
        let token = self
            .tokens
            .token_for(username)
            .await
            .map_err(|source| TrackingError::Token {
                username: username.to_owned(),
                source,
            })?;

        let repository = format!("{}/{}", username, repo);
        let callback_url = self.callback_url(&repository);
        match action {
            TrackingAction::Track => {
                self.copy_collaborators(&token, &repository).await?;
                self.repositories
                    .track(&token, &repository, &callback_url)
                    .await?
            }
            TrackingAction::Untrack => {
                self.repositories
                    .untrack(&token, &repository, &callback_url)
                    .await?
            }
        }

        info!("{:?} done on {}", action, repository);
        Ok(())
    }

    async fn copy_collaborators(&self, token: &str, repository: &str) -> Result<(), TrackingError> {
        let collaborators = self.repositories.collaborators(token, repository).await?;
        for collaborator in &collaborators {
            self.directory
                .add_collaborator(repository, collaborator)
                .await
                .map_err(|source| TrackingError::Directory {
                    repository: repository.to_owned(),
                    source,
                })?;
        }

        debug!("copied {} collaborators of {}", collaborators.len(), repository);
        Ok(())
    }
}

#[rocket::post("/<action>/<username>/<repo>")]
pub async fn track_repository(
    action: &str,
    username: &str,
    repo: &str,
    service: &State<TrackingService>,
    origin: &Origin<'_>,
) -> Result<&'static str, Status> {
    match service.do_action(action, username, repo).await {
        Ok(()) => Ok("OK"),
        Err(err) => {
            error!(
                "POST\t{}\t{}\t{}",
                origin,
                Status::InternalServerError.code,
                err
            );
            Err(Status::InternalServerError)
        }
    }
}
