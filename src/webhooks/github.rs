use std::sync::Arc;

use anyhow::anyhow;
use rocket::{
    http::{uri::Origin, Status},
    request::{FromRequest, Outcome},
    Request, State,
};
use tracing::{error, trace};

use crate::mediator::{Delivery, Mediate};

pub mod events;
mod signing;
pub use signing::{GitHubPayload, WebhookSecret};
#[cfg(test)]
pub(crate) use signing::sign;

const X_GITHUB_EVENT: &str = "X-GitHub-Event";

/// Mediator the webhook deliveries are handed to.
pub struct MediatorHandle(pub Arc<dyn Mediate>);

#[rocket::post("/<owner>/<repo>/webhook", data = "<payload>")]
pub async fn github_webhook(
    owner: &str,
    repo: &str,
    event: GitHubEventType,
    payload: GitHubPayload,
    mediator: &State<MediatorHandle>,
    origin: &Origin<'_>,
) -> Result<&'static str, Status> {
    trace!("received {} event for {}/{}", event.0, owner, repo);
    let delivery = Delivery::new(event.0, payload.0).delivered_to(format!("{}/{}", owner, repo));

    // the mediation goes on even if GitHub hangs up before we answer
    let mediator = Arc::clone(&mediator.0);
    let result = tokio::spawn(async move { mediator.mediate(delivery).await })
        .await
        .map_err(|err| anyhow!("mediation task failed: {}", err))
        .and_then(|result| result.map_err(anyhow::Error::from));

    match result {
        Ok(()) => Ok("OK"),
        Err(err) => {
            error!("POST\t{}\t{}\t{:#}", origin, Status::InternalServerError.code, err);
            Err(Status::InternalServerError)
        }
    }
}

/// Value of the `X-GitHub-Event` header. Events the mediator doesn't know about are let through.
#[derive(Debug)]
pub struct GitHubEventType(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventType {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITHUB_EVENT).collect::<Vec<_>>();
        if event_types.len() != 1 {
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request header needs exactly one event type"),
            ));
        }

        Outcome::Success(GitHubEventType(event_types[0].trim().to_owned()))
    }
}
