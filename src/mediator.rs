//! Routes webhook deliveries and enriches pull requests before handing them to the consumer.
//!
//! A delivery that fails at any step is saved verbatim to the [`PayloadQueue`] so it can be
//! replayed once whatever broke is fixed.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::assignment::{AssignmentError, RandomSource, ReviewerAssigner};
use crate::github::{GitHubError, Reviewers};
use crate::model::{decode_member_event, decode_pull_request, DecodeError, MemberAction};
use crate::queue::{PayloadQueue, QueueError};
use crate::services::{CollaboratorsDirectory, Consumer, ServiceError};
use crate::webhooks::github::events::{MEMBER, PULL_REQUEST};

mod observed;
pub use observed::ObservedMediator;

#[derive(Debug, Error)]
pub enum MediationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("unable to update collaborators of {repository}: {source}")]
    Directory {
        repository: String,
        #[source]
        source: ServiceError,
    },

    #[error("unable to forward {pull_request}: {source}")]
    Forward {
        pull_request: String,
        #[source]
        source: ServiceError,
    },

    #[error("unable to queue payload after `{cause}`: {source}")]
    QueuePersist {
        #[source]
        source: QueueError,
        cause: Box<MediationError>,
    },
}

impl MediationError {
    /// Stable tag for logs and alerting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Assignment(AssignmentError::NoEligibleReviewer(_)) => "no_eligible_reviewer",
            Self::Assignment(AssignmentError::Directory(_)) => "directory",
            Self::GitHub(GitHubError::RateLimitExceeded { .. }) => "rate_limit_exceeded",
            Self::GitHub(GitHubError::RepositoryNotFound(_)) => "repository_not_found",
            Self::GitHub(_) => "request_failed",
            Self::Directory { .. } => "directory",
            Self::Forward { .. } => "forward",
            Self::QueuePersist { .. } => "queue_persist",
        }
    }
}

/// One webhook delivery: the `X-GitHub-Event` it came with and its raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub event: String,
    pub payload: String,
    /// Repository the hook was registered for, when known from the delivery URL.
    pub repository: Option<String>,
}

impl Delivery {
    pub fn new(event: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: payload.into(),
            repository: None,
        }
    }

    pub fn delivered_to(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }
}

#[async_trait]
pub trait Mediate: Send + Sync {
    /// Processes the delivery, queueing its payload when that fails.
    async fn mediate(&self, delivery: Delivery) -> Result<(), MediationError>;
}

pub struct Mediator {
    queue: Arc<dyn PayloadQueue>,
    consumer: Arc<dyn Consumer>,
    directory: Arc<dyn CollaboratorsDirectory>,
    reviewers: Arc<dyn Reviewers>,
    assigner: ReviewerAssigner,
}

impl Mediator {
    pub fn new(
        queue: Arc<dyn PayloadQueue>,
        consumer: Arc<dyn Consumer>,
        directory: Arc<dyn CollaboratorsDirectory>,
        reviewers: Arc<dyn Reviewers>,
        source: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            queue,
            consumer,
            assigner: ReviewerAssigner::new(Arc::clone(&directory), source),
            directory,
            reviewers,
        }
    }

    /// Runs the delivery through the pipeline without queueing anything on failure.
    pub async fn process(&self, delivery: &Delivery) -> Result<(), MediationError> {
        match delivery.event.as_str() {
            PULL_REQUEST => self.process_pull_request(delivery).await,
            MEMBER => self.process_member(&delivery.payload).await,
            other => {
                debug!(event = other, "ignoring event");
                Ok(())
            }
        }
    }

    async fn process_pull_request(&self, delivery: &Delivery) -> Result<(), MediationError> {
        let mut pull_request = decode_pull_request(&delivery.payload)?;
        trace!("decoded pull request {}", pull_request);

        if let Some(delivered_to) = delivery.repository.as_deref() {
            if delivered_to != pull_request.repository_full_name {
                warn!(
                    repository = %pull_request.repository_full_name,
                    delivered_to,
                    "pull request delivered on the hook of another repository"
                );
            }
        }

        if pull_request.needs_reviewer() {
            let reviewer = self
                .assigner
                .assign(&pull_request.repository_full_name)
                .await?;
            self.reviewers
                .request_reviewers(
                    &pull_request.repository_full_name,
                    pull_request.number,
                    std::slice::from_ref(&reviewer),
                )
                .await?;
            pull_request.reviewers = vec![reviewer];
        }

        if !pull_request.is_open() {
            pull_request.review_comments = self
                .reviewers
                .review_comments(&pull_request.repository_full_name, pull_request.number)
                .await?;
        }

        self.consumer
            .process_pull_request(&pull_request)
            .await
            .map_err(|source| MediationError::Forward {
                pull_request: pull_request.to_string(),
                source,
            })
    }

    async fn process_member(&self, payload: &str) -> Result<(), MediationError> {
        let event = decode_member_event(payload)?;
        let repository = event.repository_full_name.as_str();
        trace!("{:?} {} on {}", event.action, event.member.login, repository);

        let result = match event.action {
            MemberAction::Added => self.directory.add_collaborator(repository, &event.member).await,
            MemberAction::Edited => {
                self.directory
                    .edit_collaborator(repository, &event.member)
                    .await
            }
            MemberAction::Deleted => {
                self.directory
                    .delete_collaborator(repository, &event.member.login)
                    .await
            }
        };

        result.map_err(|source| MediationError::Directory {
            repository: repository.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl Mediate for Mediator {
    async fn mediate(&self, delivery: Delivery) -> Result<(), MediationError> {
        let Err(err) = self.process(&delivery).await else {
            return Ok(());
        };

        match self.queue.save(&delivery.payload).await {
            Ok(()) => Err(err),
            Err(source) => Err(MediationError::QueuePersist {
                source,
                cause: Box::new(err),
            }),
        }
    }
}
