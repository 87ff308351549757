use serde::Deserialize;
use serde_json::Value;

mod member;
mod pull_request;

pub use member::*;
pub use pull_request::*;

pub const PULL_REQUEST: &str = "pull_request";
pub const MEMBER: &str = "member";

#[derive(Debug, Default, Deserialize)]
pub struct GitHubUser {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        self.full_name.clone().unwrap_or_default()
    }
}

/// Guesses the `X-GitHub-Event` a payload was delivered with, from the keys it carries.
///
/// Only the events the mediator acts on are recognized, so queued payloads (which are stored
/// without their headers) can be replayed.
pub fn infer_event(payload: &str) -> Option<&'static str> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let object = value.as_object()?;

    if object.contains_key(PULL_REQUEST) {
        Some(PULL_REQUEST)
    } else if object.contains_key(MEMBER) {
        Some(MEMBER)
    } else {
        None
    }
}
