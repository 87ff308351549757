use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rocket::routes;
use tracing::info;

mod assignment;
use assignment::EntropySource;

mod config;
use config::HooksConfig;

mod github;
use github::{GitHubClient, GitHubRepositories, GitHubReviewers};

mod mediator;
use mediator::{Mediator, ObservedMediator};

mod model;

mod queue;
use queue::{FilePayloadQueue, PayloadQueue};

mod replay;

mod services;
use services::{CollaboratorsClient, ConsumerClient, Tokens, TokensClient};

mod webhooks;
use webhooks::{github_webhook, track_repository, MediatorHandle, TrackingService, WebhookSecret};

#[cfg(test)]
mod test_utils;

#[derive(Parser)]
#[command(version)]
struct Opts {
    /// Configuration file for hooks-mediator
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Receive GitHub webhooks (default)
    Serve,
    /// Run queued payloads through the mediator again
    Replay {
        /// Maximum number of queued payloads to go through
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },
}

struct App {
    mediator: Arc<Mediator>,
    queue: Arc<FilePayloadQueue>,
    tracking: TrackingService,
}

impl App {
    fn new(config: &HooksConfig) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();

        let queue = Arc::new(
            FilePayloadQueue::new(&config.queue_path).with_context(|| {
                format!("couldn't create queue at {}", config.queue_path.display())
            })?,
        );
        let tokens: Arc<dyn Tokens> = Arc::new(
            TokensClient::new(config.users_url.as_str(), timeout)
                .context("failed to create users client")?,
        );
        let collaborators = Arc::new(
            CollaboratorsClient::new(config.collaborators_url.as_str(), timeout)
                .context("failed to create collaborators client")?,
        );
        let consumer = Arc::new(
            ConsumerClient::new(config.consumer_url.as_str(), timeout)
                .context("failed to create consumer client")?,
        );
        let github = GitHubClient::new(config.github_api_url(), timeout)
            .context("failed to create GitHub client")?;

        let mediator = Arc::new(Mediator::new(
            queue.clone(),
            consumer,
            collaborators.clone(),
            Arc::new(GitHubReviewers::new(github.clone(), Arc::clone(&tokens))),
            Arc::new(EntropySource),
        ));
        let tracking = TrackingService::new(
            config.hostname.clone(),
            tokens,
            Arc::new(GitHubRepositories::new(github, config.github_secret.clone())),
            collaborators,
        );

        Ok(Self {
            mediator,
            queue,
            tracking,
        })
    }
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config = HooksConfig::load(&opts.config)?;
    let app = App::new(&config)?;

    match opts.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(app, config).await,
        Command::Replay { limit } => {
            let queue: &dyn PayloadQueue = &*app.queue;
            let report = replay::replay(&app.mediator, queue, limit)
                .await
                .with_context(|| format!("couldn't replay {}", app.queue.path().display()))?;
            info!(
                replayed = report.replayed,
                failed = report.failed,
                skipped = report.skipped,
                "replay done"
            );
            Ok(())
        }
    }
}

async fn serve(app: App, config: HooksConfig) -> anyhow::Result<()> {
    let rocket = rocket::build()
        .mount("/", routes![github_webhook, track_repository])
        .manage(MediatorHandle(Arc::new(ObservedMediator::new(app.mediator))))
        .manage(app.tracking)
        .manage(WebhookSecret(config.github_secret));

    let _rocket = rocket.launch().await.map_err(|err| anyhow::anyhow!("{}", err))?;
    Ok(())
}
