use std::collections::HashSet;

use tracing::{info, warn};

use crate::mediator::{Delivery, Mediator};
use crate::queue::{PayloadQueue, QueueError};
use crate::webhooks::github::events::infer_event;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Runs queued payloads through the mediator again, oldest first, stopping after `limit` of them.
///
/// Payloads are processed without being queued a second time. An entry is removed from the queue
/// only once it went through successfully; duplicates of it go away with it. A payload that fails
/// again moves to the back of the queue, so the next run starts with the ones not tried yet.
/// Payloads of unknown events are left in place and don't count toward `limit`.
pub async fn replay(
    mediator: &Mediator,
    queue: &dyn PayloadQueue,
    limit: usize,
) -> Result<ReplayReport, QueueError> {
    let mut report = ReplayReport::default();
    let mut seen = HashSet::new();

    for payload in queue.list(usize::MAX).await? {
        if report.replayed + report.failed == limit {
            break;
        }
        if !seen.insert(payload.clone()) {
            continue;
        }

        let Some(event) = infer_event(&payload) else {
            warn!("can't tell which event a queued payload belongs to, skipping it");
            report.skipped += 1;
            continue;
        };

        match mediator.process(&Delivery::new(event, payload.as_str())).await {
            Ok(()) => {
                queue.delete(&payload).await?;
                report.replayed += 1;
            }
            Err(err) => {
                warn!(event, kind = err.kind(), error = %err, "replay failed");
                queue.requeue(&payload).await?;
                report.failed += 1;
            }
        }
    }

    info!(
        "replayed {} payloads, {} failed, {} skipped",
        report.replayed, report.failed, report.skipped
    );
    Ok(report)
}
