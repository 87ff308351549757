use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::trace;
use url::Url;

use crate::model::Collaborator;
use crate::services::{
    base_url, endpoint, expect_status, http_client, CollaboratorsDirectory, ServiceError,
};

pub struct CollaboratorsClient {
    base_url: Url,
    client: reqwest::Client,
}

impl CollaboratorsClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            base_url: base_url(url)?,
            client: http_client(timeout)?,
        })
    }

    /// `{base}/{owner}/{name}/collaborators[/{login}]`
    fn collaborators_url(&self, repository: &str, login: Option<&str>) -> Url {
        let segments = repository
            .split('/')
            .chain(["collaborators"])
            .chain(login);
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl CollaboratorsDirectory for CollaboratorsClient {
    async fn list_collaborators(
        &self,
        repository: &str,
    ) -> Result<Vec<Collaborator>, ServiceError> {
        const OPERATION: &str = "get collaborators";
        trace!("listing collaborators of {}", repository);

        let response = self
            .client
            .get(self.collaborators_url(repository, None))
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, repository))?;
        expect_status(&response, StatusCode::OK, OPERATION, repository)?;

        response
            .json()
            .await
            .map_err(ServiceError::request(OPERATION, repository))
    }

    async fn add_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError> {
        const OPERATION: &str = "add collaborator";
        trace!("adding collaborator {} to {}", collaborator.login, repository);

        let response = self
            .client
            .post(self.collaborators_url(repository, None))
            .json(collaborator)
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, repository))?;
        expect_status(&response, StatusCode::CREATED, OPERATION, repository)
    }

    async fn edit_collaborator(
        &self,
        repository: &str,
        collaborator: &Collaborator,
    ) -> Result<(), ServiceError> {
        const OPERATION: &str = "edit collaborator";
        trace!("editing collaborator {} of {}", collaborator.login, repository);

        let response = self
            .client
            .put(self.collaborators_url(repository, None))
            .json(collaborator)
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, repository))?;
        expect_status(&response, StatusCode::OK, OPERATION, repository)
    }

    async fn delete_collaborator(&self, repository: &str, login: &str) -> Result<(), ServiceError> {
        const OPERATION: &str = "delete collaborator";
        trace!("deleting collaborator {} from {}", login, repository);

        let response = self
            .client
            .delete(self.collaborators_url(repository, Some(login)))
            .send()
            .await
            .map_err(ServiceError::request(OPERATION, repository))?;
        expect_status(&response, StatusCode::NO_CONTENT, OPERATION, repository)
    }
}
