use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::model::Collaborator;
use crate::services::{CollaboratorsDirectory, ServiceError};

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Directory(#[from] ServiceError),

    #[error("{0} has no admin collaborator to review pull requests")]
    NoEligibleReviewer(String),
}

/// Picks an index in `0..len`. `len` is never zero.
pub trait RandomSource: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Draws from the thread local generator, which is seeded from the OS.
#[derive(Debug, Default)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Chooses a reviewer among the admins of a repository.
pub struct ReviewerAssigner {
    directory: Arc<dyn CollaboratorsDirectory>,
    source: Arc<dyn RandomSource>,
}

impl ReviewerAssigner {
    pub fn new(directory: Arc<dyn CollaboratorsDirectory>, source: Arc<dyn RandomSource>) -> Self {
        Self { directory, source }
    }

    pub async fn assign(&self, repository: &str) -> Result<Collaborator, AssignmentError> {
        let mut eligible: Vec<Collaborator> = self
            .directory
            .list_collaborators(repository)
            .await?
            .into_iter()
            .filter(|collaborator| collaborator.admin)
            .collect();

        if eligible.is_empty() {
            return Err(AssignmentError::NoEligibleReviewer(repository.to_owned()));
        }

        let index = self.source.pick(eligible.len()).min(eligible.len() - 1);
        let reviewer = eligible.swap_remove(index);
        debug!("picked {} to review on {}", reviewer.login, repository);

        Ok(reviewer)
    }
}
