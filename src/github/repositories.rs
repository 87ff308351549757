use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::github::client::PER_PAGE;
use crate::github::error::map_octocrab_error;
use crate::github::{parse_repository_name, GitHubClient, GitHubError, Repositories};
use crate::model::Collaborator;
use crate::webhooks::github::events::{MEMBER, PULL_REQUEST};

const WEB_HOOK: &str = "web";
const JSON_CONTENT: &str = "json";

#[derive(Debug, Serialize)]
struct NewHook<'a> {
    name: &'static str,
    active: bool,
    events: [&'static str; 2],
    config: NewHookConfig<'a>,
}

#[derive(Debug, Serialize)]
struct NewHookConfig<'a> {
    url: &'a str,
    content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Hook {
    id: u64,
    #[serde(default)]
    config: HookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct HookConfig {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryCollaborator {
    id: u64,
    login: String,
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, Default, Deserialize)]
struct Permissions {
    #[serde(default)]
    admin: bool,
}

impl From<RepositoryCollaborator> for Collaborator {
    fn from(collaborator: RepositoryCollaborator) -> Self {
        Self {
            id: collaborator.id,
            login: collaborator.login,
            admin: collaborator.permissions.admin,
        }
    }
}

/// [`Repositories`] backed by the GitHub hooks API.
pub struct GitHubRepositories {
    client: GitHubClient,
    secret: Option<String>,
}

impl GitHubRepositories {
    /// Hooks are created with `secret` so deliveries can be verified by the receiver.
    pub fn new(client: GitHubClient, secret: Option<String>) -> Self {
        Self { client, secret }
    }

    async fn hooks(
        github: &Octocrab,
        repository: &str,
        owner: &str,
        name: &str,
    ) -> Result<Vec<Hook>, GitHubError> {
        const OPERATION: &str = "list hooks";

        let route = format!("/repos/{}/{}/hooks", owner, name);
        let page: Page<Hook> = github
            .get(route, Some(&[("per_page", PER_PAGE)]))
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        github
            .all_pages(page)
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))
    }
}

#[async_trait]
impl Repositories for GitHubRepositories {
    async fn collaborators(
        &self,
        token: &str,
        repository: &str,
    ) -> Result<Vec<Collaborator>, GitHubError> {
        const OPERATION: &str = "list collaborators";

        let (owner, name) = parse_repository_name(repository)?;
        let github = self.client.authenticated(token)?;

        let route = format!("/repos/{}/{}/collaborators", owner, name);
        let page: Page<RepositoryCollaborator> = github
            .get(route, Some(&[("per_page", PER_PAGE)]))
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;
        let collaborators = github
            .all_pages(page)
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        debug!("{} has {} collaborators", repository, collaborators.len());
        Ok(collaborators.into_iter().map(Collaborator::from).collect())
    }

    async fn track(
        &self,
        token: &str,
        repository: &str,
        callback_url: &str,
    ) -> Result<(), GitHubError> {
        const OPERATION: &str = "create hook";

        let (owner, name) = parse_repository_name(repository)?;
        let hook = NewHook {
            name: WEB_HOOK,
            active: true,
            events: [PULL_REQUEST, MEMBER],
            config: NewHookConfig {
                url: callback_url,
                content_type: JSON_CONTENT,
                secret: self.secret.as_deref(),
            },
        };

        let github = self.client.authenticated(token)?;
        let _: Value = github
            .post(format!("/repos/{}/{}/hooks", owner, name), Some(&hook))
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        info!("tracking {} with hook {}", repository, callback_url);
        Ok(())
    }

    async fn untrack(
        &self,
        token: &str,
        repository: &str,
        callback_url: &str,
    ) -> Result<(), GitHubError> {
        const OPERATION: &str = "delete hook";

        let (owner, name) = parse_repository_name(repository)?;
        let github = self.client.authenticated(token)?;
        let hooks = Self::hooks(&github, repository, owner, name).await?;
        debug!("{} has {} hooks", repository, hooks.len());

        let hook = hooks
            .iter()
            .find(|hook| hook.config.url.as_deref() == Some(callback_url))
            .ok_or_else(|| GitHubError::HookNotFound {
                repository: repository.to_owned(),
                callback_url: callback_url.to_owned(),
            })?;

        // 204, nothing to decode
        let route = format!("/repos/{}/{}/hooks/{}", owner, name, hook.id);
        let response = github
            ._delete(route.as_str(), None::<&()>)
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|err| map_octocrab_error(OPERATION, repository, &err))?;

        info!("stopped tracking {}, deleted hook {}", repository, hook.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const REPOSITORY: &str = "blamewarrior/hooks";
    const CALLBACK: &str = "https://blamewarrior.com/blamewarrior/hooks/webhook";

    async fn setup(secret: Option<&str>) -> (MockServer, GitHubRepositories) {
        let server = MockServer::start().await;
        let client = GitHubClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let repositories = GitHubRepositories::new(client, secret.map(ToOwned::to_owned));
        (server, repositories)
    }

    #[tokio::test]
    async fn test_collaborators() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/repos/blamewarrior/hooks/collaborators"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "login": "lead",
                    "id": 1,
                    "type": "User",
                    "permissions": { "admin": true, "push": true, "pull": true }
                },
                {
                    "login": "intern",
                    "id": 2,
                    "type": "User",
                    "permissions": { "admin": false, "push": false, "pull": true }
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let collaborators = repositories
            .collaborators("user_token", REPOSITORY)
            .await
            .unwrap();

        assert_eq!(
            collaborators,
            vec![
                Collaborator {
                    id: 1,
                    login: "lead".to_owned(),
                    admin: true,
                },
                Collaborator {
                    id: 2,
                    login: "intern".to_owned(),
                    admin: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_track() {
        let (server, repositories) = setup(Some("s3cr3t")).await;
        Mock::given(method("POST"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .and(body_json(json!({
                "name": "web",
                "active": true,
                "events": ["pull_request", "member"],
                "config": {
                    "url": CALLBACK,
                    "content_type": "json",
                    "secret": "s3cr3t"
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        repositories
            .track("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0].headers.get("authorization").unwrap();
        assert!(authorization.to_str().unwrap().ends_with("user_token"));
    }

    #[tokio::test]
    async fn test_track_without_secret() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("POST"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
            .mount(&server)
            .await;

        repositories
            .track("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert!(body["config"].get("secret").is_none());
    }

    #[tokio::test]
    async fn test_untrack() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 11, "config": { "url": "https://ci.example.com/hook" } },
                { "id": 12, "config": { "url": CALLBACK } }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/blamewarrior/hooks/hooks/12"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        repositories
            .untrack("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_untrack_delete_refused() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 12, "config": { "url": CALLBACK } }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/blamewarrior/hooks/hooks/12"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "Must have admin rights to Repository.",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let err = repositories
            .untrack("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap_err();

        assert!(matches!(err, GitHubError::RequestFailed { operation, .. } if operation == "delete hook"));
    }

    #[tokio::test]
    async fn test_untrack_unknown_hook() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 11, "config": { "url": "https://ci.example.com/hook" } },
                { "id": 13, "config": {} }
            ])))
            .mount(&server)
            .await;

        let err = repositories
            .untrack("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap_err();

        assert!(matches!(err, GitHubError::HookNotFound { .. }));
    }

    #[tokio::test]
    async fn test_track_unknown_repository() {
        let (server, repositories) = setup(None).await;
        Mock::given(method("POST"))
            .and(path("/repos/blamewarrior/hooks/hooks"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let err = repositories
            .track("user_token", REPOSITORY, CALLBACK)
            .await
            .unwrap_err();

        assert!(matches!(err, GitHubError::RepositoryNotFound(_)));
    }
}
