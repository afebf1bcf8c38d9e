//! Collaborator seams towards the cloud APIs.
//!
//! The inventory only talks to these traits. `GcpClient` implements them over
//! HTTP; tests provide in-memory fakes.

mod auth;
mod client;
mod credentials;
pub mod wire;

pub use auth::{OAuthTokenProvider, StaticTokenProvider, TokenProvider, CLOUD_PLATFORM_SCOPE};
pub use client::{GcpClient, GcpEndpoints, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT};
pub use credentials::{
    parse_credentials, AmbientCredentials, AuthorizedUser, CredentialsKind, DiscoveredCredentials,
    ServiceAccountKey,
};
pub use wire::{Ancestor, RawPolicy};

use std::path::Path;

use async_trait::async_trait;

use crate::errors::{ApiError, CredentialError};
use crate::models::{Resource, Role};

/// Organization, folder and project listings. Every call drains all pages.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn list_organizations(&self) -> Result<Vec<wire::Organization>, ApiError>;

    async fn list_projects(&self, filter: &str) -> Result<Vec<wire::Project>, ApiError>;

    /// Direct children of `parent`, e.g. `organizations/1234`.
    async fn list_folders(&self, parent: &str) -> Result<Vec<wire::Folder>, ApiError>;

    /// Ancestry chain of a project, outermost ancestor last.
    async fn get_ancestry(&self, project_id: &str) -> Result<Vec<Ancestor>, ApiError>;
}

/// IAM policy retrieval. The returned variant depends on the resource kind.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn get_policy(&self, resource: &Resource) -> Result<RawPolicy, ApiError>;
}

/// Role lookup by fully-qualified name.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn get_role(&self, uri: &str) -> Result<Role, ApiError>;
}

#[async_trait]
pub trait CredentialDiscovery: Send + Sync {
    /// Application default credentials.
    async fn default_credentials(&self) -> Result<DiscoveredCredentials, CredentialError>;

    async fn credentials_from_file(&self, path: &Path) -> Result<DiscoveredCredentials, CredentialError>;
}
