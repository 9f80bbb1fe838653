//! GitHub ProjectV2 client
//!
//! Pulls a whole project board through the GraphQL API, following the item
//! cursor until the API reports no further page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use tracing::{debug, warn};
use url::Url;

use super::graphql::{
    GraphQlRequest, GraphQlResponse, OwnerData, PROJECT_QUERY, ProjectPage, ProjectVariables,
    RawProject,
};
use super::trait_::{FetchError, ProjectFetcher};
use crate::config::{GitHubConfig, ProjectFieldNames, ProjectOwner, ProjectSource};

const USER_AGENT: &str = concat!("charts/", env!("CARGO_PKG_VERSION"));
const BODY_SNIPPET_CHARS: usize = 200;

/// Paginating client for organization and repository project boards.
#[derive(Debug, Clone)]
pub struct GitHubProjectClient {
    http: reqwest::Client,
    api_url: Url,
    page_size: u32,
    fields: ProjectFieldNames,
}

impl GitHubProjectClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, FetchError> {
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| FetchError::GraphQl(format!("invalid API url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url,
            page_size: config.page_size,
            fields: config.fields.clone(),
        })
    }

    async fn fetch_page(
        &self,
        source: &ProjectSource,
        cursor: Option<&str>,
    ) -> Result<ProjectPage, FetchError> {
        let (operation_name, login, owner, name) = match &source.owner {
            ProjectOwner::Organization { login } => {
                ("OrganizationProject", Some(login.as_str()), None, None)
            }
            ProjectOwner::Repository { owner, name } => (
                "RepositoryProject",
                None,
                Some(owner.as_str()),
                Some(name.as_str()),
            ),
        };

        let request = GraphQlRequest {
            query: PROJECT_QUERY,
            operation_name,
            variables: ProjectVariables {
                login,
                owner,
                name,
                number: source.project_number,
                page_size: self.page_size,
                cursor,
                status_field: &self.fields.status,
                iteration_field: &self.fields.iteration,
                effort_field: &self.fields.effort,
                remaining_field: &self.fields.remaining,
            },
        };

        let response = self
            .http
            .post(self.api_url.clone())
            .bearer_auth(&source.token)
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: GraphQlResponse<OwnerData> = serde_json::from_str(&body)?;
        extract_page(source, parsed)
    }
}

#[async_trait]
impl ProjectFetcher for GitHubProjectClient {
    async fn fetch_project(&self, source: &ProjectSource) -> Result<RawProject, FetchError> {
        let mut cursor: Option<String> = None;
        let mut project: Option<RawProject> = None;
        let mut pages = 0u32;

        loop {
            let page = self.fetch_page(source, cursor.as_deref()).await?;
            pages += 1;

            let has_next = page.items.page_info.has_next_page;
            let next_cursor = page.items.page_info.end_cursor.clone();

            match project.as_mut() {
                None => project = Some(RawProject::from(page)),
                Some(acc) => acc.items.extend(page.items.nodes),
            }

            match (has_next, next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                (true, None) => {
                    warn!(source = %source, "API reported another page without a cursor; stopping");
                    break;
                }
                (false, _) => break,
            }
        }

        let project = project.ok_or_else(|| FetchError::ProjectNotFound(source.key()))?;
        debug!(
            source = %source,
            pages,
            items = project.items.len(),
            "fetched project"
        );
        Ok(project)
    }
}

async fn classify_status(status: StatusCode, response: reqwest::Response) -> FetchError {
    let headers = response.headers().clone();
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
    };

    if status == StatusCode::TOO_MANY_REQUESTS {
        return FetchError::RateLimited {
            retry_after: header_u64("retry-after"),
        };
    }

    // Primary rate limits arrive as 403 with an exhausted quota header.
    if status == StatusCode::FORBIDDEN && header_u64("x-ratelimit-remaining") == Some(0) {
        return FetchError::RateLimited {
            retry_after: header_u64("retry-after"),
        };
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return FetchError::Unauthorized;
    }

    let body = response.text().await.unwrap_or_default();
    FetchError::Http {
        status: status.as_u16(),
        body: truncate(&body),
    }
}

fn extract_page(
    source: &ProjectSource,
    response: GraphQlResponse<OwnerData>,
) -> Result<ProjectPage, FetchError> {
    if response
        .errors
        .iter()
        .any(|e| e.kind.as_deref() == Some("NOT_FOUND"))
    {
        return Err(FetchError::ProjectNotFound(source.key()));
    }

    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(FetchError::GraphQl(messages.join("; ")));
    }

    let data = response
        .data
        .ok_or_else(|| FetchError::GraphQl("response carried no data".to_string()))?;

    let owner = match source.owner {
        ProjectOwner::Organization { .. } => data.organization,
        ProjectOwner::Repository { .. } => data.repository,
    };

    owner
        .and_then(|node| node.project)
        .ok_or_else(|| FetchError::ProjectNotFound(source.key()))
}

fn truncate(body: &str) -> String {
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let head: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubProjectClient {
        let config = GitHubConfig {
            api_url: format!("{}/graphql", server.uri()),
            page_size: 2,
            ..GitHubConfig::default()
        };
        GitHubProjectClient::new(&config).unwrap()
    }

    fn org_source() -> ProjectSource {
        ProjectSource {
            owner: ProjectOwner::Organization {
                login: "acme".to_string(),
            },
            project_number: 3,
            token: "ghp_test".to_string(),
        }
    }

    fn item(id: &str) -> Value {
        json!({
            "id": id,
            "status": {"__typename": "ProjectV2ItemFieldSingleSelectValue", "name": "Todo"},
            "iteration": null,
            "effort": {"__typename": "ProjectV2ItemFieldNumberValue", "number": 2.0},
            "remaining": null,
            "content": {
                "__typename": "Issue",
                "title": format!("Issue {id}"),
                "createdAt": "2024-03-01T10:00:00Z",
                "closedAt": null,
                "labels": {"nodes": []}
            }
        })
    }

    fn page(items: Vec<Value>, has_next: bool, cursor: Option<&str>) -> Value {
        json!({
            "data": {
                "organization": {
                    "projectV2": {
                        "id": "PVT_1",
                        "title": "Roadmap",
                        "status": {
                            "__typename": "ProjectV2SingleSelectField",
                            "options": [{"id": "a", "name": "Todo"}, {"id": "b", "name": "Done"}]
                        },
                        "iteration": null,
                        "items": {
                            "pageInfo": {"hasNextPage": has_next, "endCursor": cursor},
                            "nodes": items
                        }
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn follows_cursor_until_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(body_partial_json(json!({"variables": {"cursor": null}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![item("I1"), item("I2")], true, Some("c1"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({"variables": {"cursor": "c1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(
                vec![item("I3")],
                false,
                Some("c2"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let project = client_for(&server)
            .fetch_project(&org_source())
            .await
            .unwrap();

        assert_eq!(project.id, "PVT_1");
        let ids: Vec<&str> = project.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["I1", "I2", "I3"]);
    }

    #[tokio::test]
    async fn empty_project_still_returns_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], false, None)))
            .mount(&server)
            .await;

        let project = client_for(&server)
            .fetch_project(&org_source())
            .await
            .unwrap();
        assert_eq!(project.title, "Roadmap");
        assert!(project.items.is_empty());
    }

    #[tokio::test]
    async fn repository_sources_use_repository_operation() {
        let server = MockServer::start().await;
        let mut body = page(vec![item("I1")], false, None);
        let project = body["data"]["organization"].take();
        body["data"] = json!({"repository": project});

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "operationName": "RepositoryProject",
                "variables": {"owner": "octo", "name": "widgets", "number": 9}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let source = ProjectSource {
            owner: ProjectOwner::Repository {
                owner: "octo".to_string(),
                name: "widgets".to_string(),
            },
            project_number: 9,
            token: "t".to_string(),
        };
        let project = client_for(&server).fetch_project(&source).await.unwrap();
        assert_eq!(project.items.len(), 1);
    }

    #[tokio::test]
    async fn page_failure_discards_partial_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"variables": {"cursor": null}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![item("I1")], true, Some("c1"))),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"variables": {"cursor": "c1"}})))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_project(&org_source())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 502, .. }));
    }

    #[tokio::test]
    async fn rate_limit_and_auth_failures_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer bad"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut source = org_source();

        source.token = "limited".to_string();
        let err = client.fetch_project(&source).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::RateLimited {
                retry_after: Some(30)
            }
        ));

        source.token = "bad".to_string();
        let err = client.fetch_project(&source).await.unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized));
    }

    #[tokio::test]
    async fn graphql_errors_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"organization": null},
                "errors": [{
                    "type": "NOT_FOUND",
                    "message": "Could not resolve to an Organization with the login of 'acme'."
                }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_project(&org_source())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ProjectNotFound(ref key) if key == "acme/3"));
    }

    #[tokio::test]
    async fn missing_project_without_errors_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"organization": {"projectV2": null}}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_project(&org_source())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let snippet = truncate(&body);
        assert_eq!(snippet.chars().count(), BODY_SNIPPET_CHARS + 3);
    }
}
