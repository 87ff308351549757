use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::mediator::{Delivery, Mediate, MediationError};

/// Logs the outcome of every mediation, tagged with the error kind.
pub struct ObservedMediator {
    inner: Arc<dyn Mediate>,
}

impl ObservedMediator {
    pub fn new(inner: Arc<dyn Mediate>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Mediate for ObservedMediator {
    async fn mediate(&self, delivery: Delivery) -> Result<(), MediationError> {
        let event = delivery.event.clone();
        let repository = delivery.repository.clone().unwrap_or_default();

        let result = self.inner.mediate(delivery).await;
        match &result {
            Ok(()) => debug!(%event, %repository, "delivery processed"),
            Err(err @ MediationError::QueuePersist { .. }) => error!(
                %event,
                %repository,
                kind = err.kind(),
                error = %err,
                "delivery lost, payload could not be queued"
            ),
            Err(err) => warn!(
                %event,
                %repository,
                kind = err.kind(),
                error = %err,
                "delivery failed, payload queued for replay"
            ),
        }

        result
    }
}
