pub mod github;
pub use github::{github_webhook, MediatorHandle, WebhookSecret};

pub mod tracking;
pub use tracking::{track_repository, TrackingService};
