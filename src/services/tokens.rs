use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::services::{base_url, endpoint, expect_status, http_client, ServiceError, Tokens};

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    token: String,
}

pub struct TokensClient {
    base_url: Url,
    client: reqwest::Client,
}

impl TokensClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            base_url: base_url(url)?,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Tokens for TokensClient {
    async fn token_for(&self, username: &str) -> Result<String, ServiceError> {
        const OPERATION: &str = "get token";

        let response = self
            .client
            .get(endpoint(&self.base_url, ["users", username]))
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, username))?;
        expect_status(&response, StatusCode::OK, OPERATION, username)?;

        let user: User = response
            .json()
            .await
            .map_err(ServiceError::request(OPERATION, username))?;
        if user.token.is_empty() {
            return Err(ServiceError::EmptyToken(username.to_owned()));
        }

        Ok(user.token)
    }
}
