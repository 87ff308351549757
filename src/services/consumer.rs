use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::model::PullRequest;
use crate::services::{base_url, endpoint, http_client, Consumer, ServiceError};

pub struct ConsumerClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ConsumerClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            base_url: base_url(url)?,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Consumer for ConsumerClient {
    async fn process_pull_request(&self, pull_request: &PullRequest) -> Result<(), ServiceError> {
        const OPERATION: &str = "process hook";
        let repository = pull_request.repository_full_name.as_str();

        let response = self
            .client
            .post(endpoint(
                &self.base_url,
                ["api"]
                    .into_iter()
                    .chain(repository.split('/'))
                    .chain(["pull_requests", "process"]),
            ))
            .json(pull_request)
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, repository))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::UnexpectedStatus {
                operation: OPERATION,
                subject: repository.to_owned(),
                status: status.as_u16(),
            });
        }

        debug!("forwarded {} to consumer", pull_request);
        Ok(())
    }
}
