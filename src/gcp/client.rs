use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::auth::TokenProvider;
use super::wire::{self, Ancestor, RawPolicy};
use super::{PolicySource, ResourceDirectory, RoleLookup};
use crate::errors::ApiError;
use crate::models::{Resource, ResourceKind, Role};

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com";
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.googleapis.com";

const REQUESTED_POLICY_VERSION: i64 = 3;

#[derive(Debug, Clone)]
pub struct GcpEndpoints {
    pub resource_manager: String,
    pub iam: String,
}

impl Default for GcpEndpoints {
    fn default() -> Self {
        Self {
            resource_manager: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
            iam: DEFAULT_IAM_ENDPOINT.to_string(),
        }
    }
}

impl GcpEndpoints {
    /// Both APIs served from one base URL, as with a local mock server.
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            resource_manager: base.clone(),
            iam: base,
        }
    }
}

/// HTTP client for the Cloud Resource Manager (v1beta1 and v2beta1) and IAM
/// v1 APIs.
#[derive(Clone)]
pub struct GcpClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    endpoints: GcpEndpoints,
}

impl GcpClient {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>, endpoints: GcpEndpoints) -> Self {
        let endpoints = GcpEndpoints {
            resource_manager: endpoints.resource_manager.trim_end_matches('/').to_string(),
            iam: endpoints.iam.trim_end_matches('/').to_string(),
        };
        Self {
            http,
            tokens,
            endpoints,
        }
    }

    fn v1(&self, path: &str) -> String {
        format!("{}/v1beta1/{}", self.endpoints.resource_manager, path)
    }

    fn v2(&self, path: &str) -> String {
        format!("{}/v2beta1/{}", self.endpoints.resource_manager, path)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        tracing::debug!(url = %url, "GET");
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        decode(url, response).await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T, ApiError> {
        tracing::debug!(url = %url, "POST");
        let token = self.tokens.access_token().await?;
        let response = self.http.post(url).bearer_auth(token).json(body).send().await?;
        decode(url, response).await
    }

    /// Follows `nextPageToken` until the listing is exhausted.
    async fn drain<P, T>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        split: impl Fn(P) -> (Vec<T>, String) + Send + Sync,
    ) -> Result<Vec<T>, ApiError>
    where
        P: DeserializeOwned + Send,
        T: Send,
    {
        let mut items = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut query: Vec<(&str, &str)> = params.to_vec();
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.as_str()));
            }

            let page: P = self.get(url, &query).await?;
            let (mut batch, next) = split(page);
            items.append(&mut batch);

            if next.is_empty() {
                break;
            }
            if next == page_token {
                return Err(ApiError::unexpected_shape(format!(
                    "{url} returned page token {next:?} twice"
                )));
            }
            page_token = next;
        }

        Ok(items)
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::status(status.as_u16(), url, error_message(&body)));
    }

    let bytes = response.bytes().await?;
    serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&bytes)).map_err(|source| {
        ApiError::Decode {
            url: url.to_string(),
            source,
        }
    })
}

/// Pulls `error.message` out of a Google API error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ResourceDirectory for GcpClient {
    async fn list_organizations(&self) -> Result<Vec<wire::Organization>, ApiError> {
        let url = self.v1("organizations");
        self.drain(&url, &[], |page: wire::ListOrganizationsResponse| {
            (page.organizations, page.next_page_token)
        })
        .await
    }

    async fn list_projects(&self, filter: &str) -> Result<Vec<wire::Project>, ApiError> {
        let url = self.v1("projects");
        let params: Vec<(&str, &str)> = if filter.is_empty() {
            Vec::new()
        } else {
            vec![("filter", filter)]
        };
        self.drain(&url, &params, |page: wire::ListProjectsResponse| {
            (page.projects, page.next_page_token)
        })
        .await
    }

    async fn list_folders(&self, parent: &str) -> Result<Vec<wire::Folder>, ApiError> {
        let url = self.v2("folders");
        let params: Vec<(&str, &str)> = if parent.is_empty() {
            Vec::new()
        } else {
            vec![("parent", parent)]
        };
        self.drain(&url, &params, |page: wire::ListFoldersResponse| {
            (page.folders, page.next_page_token)
        })
        .await
    }

    async fn get_ancestry(&self, project_id: &str) -> Result<Vec<Ancestor>, ApiError> {
        let url = self.v1(&format!("projects/{project_id}:getAncestry"));
        let body: Value = self.post(&url, &json!({})).await?;
        wire::convert_ancestors(body)
    }
}

/// getIamPolicy body. Version 3 keeps conditional bindings intact instead of
/// rewriting their roles.
fn policy_request() -> Value {
    json!({"options": {"requestedPolicyVersion": REQUESTED_POLICY_VERSION}})
}

#[async_trait]
impl PolicySource for GcpClient {
    async fn get_policy(&self, resource: &Resource) -> Result<RawPolicy, ApiError> {
        let request = policy_request();
        match resource.kind {
            ResourceKind::Organization => {
                let url = self.v1(&format!("organizations/{}:getIamPolicy", resource.id));
                Ok(RawPolicy::V1(self.post(&url, &request).await?))
            }
            ResourceKind::Project => {
                let url = self.v1(&format!("projects/{}:getIamPolicy", resource.id));
                Ok(RawPolicy::V1(self.post(&url, &request).await?))
            }
            ResourceKind::Folder => {
                let name = if resource.id.starts_with("folders/") {
                    resource.id.clone()
                } else {
                    format!("folders/{}", resource.id)
                };
                let url = self.v2(&format!("{name}:getIamPolicy"));
                Ok(RawPolicy::V2(self.post(&url, &request).await?))
            }
        }
    }
}

#[async_trait]
impl RoleLookup for GcpClient {
    async fn get_role(&self, uri: &str) -> Result<Role, ApiError> {
        let url = format!("{}/v1/{}", self.endpoints.iam, uri);
        let role: wire::IamRole = self.get(&url, &[]).await?;
        let name = if role.name.is_empty() { uri.to_string() } else { role.name };
        Ok(Role::new(name, role.included_permissions))
    }
}
