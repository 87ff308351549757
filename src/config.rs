use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct HooksConfig {
    /// Public hostname of this service, used to build the webhook callback URLs registered on
    /// GitHub.
    pub hostname: String,
    /// Base URL of the collaborators directory service.
    pub collaborators_url: Url,
    /// Base URL of the users service, which hands out GitHub tokens.
    pub users_url: Url,
    /// Base URL of the service enriched pull requests are forwarded to.
    pub consumer_url: Url,
    /// GitHub REST API endpoint, `https://api.github.com` when unset.
    #[serde(default)]
    pub github_api_url: Option<Url>,
    /// File holding the payloads that failed processing.
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,
    /// Secret shared with GitHub to sign webhook deliveries. Signatures are only enforced when
    /// this is set.
    #[serde(default)]
    pub github_secret: Option<String>,
    /// Timeout applied to every outbound request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("failed_payloads.jsonl")
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl HooksConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config_file =
            File::open(path).with_context(|| format!("couldn't open {}:", path.display()))?;
        serde_yaml::from_reader(BufReader::new(config_file)).context("couldn't parse config file")
    }

    pub fn github_api_url(&self) -> &str {
        self.github_api_url
            .as_ref()
            .map_or(DEFAULT_GITHUB_API_URL, Url::as_str)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
