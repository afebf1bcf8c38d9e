use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{ConfigurationError, CredentialError, InventoryError, InventoryResult};
use crate::gcp::{CredentialDiscovery, ResourceDirectory};
use crate::models::{OrganizationContext, Resource};

/// What the caller supplied to locate the organization.
#[derive(Debug, Clone, Default)]
pub struct OrganizationLookup {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl OrganizationLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }
}

/// How the organization id was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationSource {
    Explicit,
    Project(String),
    DefaultCredentials(String),
    CredentialsFile(String),
}

impl fmt::Display for OrganizationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationSource::Explicit => f.write_str("explicit organization id"),
            OrganizationSource::Project(p) => write!(f, "project {p}"),
            OrganizationSource::DefaultCredentials(p) => write!(f, "project {p} from default credentials"),
            OrganizationSource::CredentialsFile(p) => write!(f, "project {p} from credentials file"),
        }
    }
}

/// Enumerates the hierarchy below an organization and locates the
/// organization itself when it is not given.
pub struct HierarchyWalker {
    directory: Arc<dyn ResourceDirectory>,
}

impl HierarchyWalker {
    pub fn new(directory: Arc<dyn ResourceDirectory>) -> Self {
        Self { directory }
    }

    /// Direct child folders of the organization.
    pub async fn list_folders(&self, ctx: &OrganizationContext) -> InventoryResult<Vec<Resource>> {
        let parent = ctx.resource_name();
        let folders = self
            .directory
            .list_folders(&parent)
            .await
            .map_err(|err| InventoryError::collaborator(format!("listing folders of {parent}"), err))?;

        Ok(folders.into_iter().map(|f| Resource::folder(f.name)).collect())
    }

    /// Every project whose parent is the organization.
    pub async fn list_projects(&self, ctx: &OrganizationContext) -> InventoryResult<Vec<Resource>> {
        let filter = ctx.project_filter();
        let projects = self
            .directory
            .list_projects(&filter)
            .await
            .map_err(|err| InventoryError::collaborator(format!("listing projects ({filter})"), err))?;

        Ok(projects.into_iter().map(|p| Resource::project(p.project_id)).collect())
    }

    /// Derives the organization: explicit id, else explicit project, else the
    /// project found in credentials, then that project's outermost ancestor.
    pub async fn resolve_organization(
        &self,
        lookup: &OrganizationLookup,
        credentials: &dyn CredentialDiscovery,
    ) -> Result<(OrganizationContext, OrganizationSource), ConfigurationError> {
        if let Some(org) = lookup.organization_id.as_deref().filter(|o| !o.is_empty()) {
            return Ok((OrganizationContext::new(org), OrganizationSource::Explicit));
        }

        let (project, source) = match lookup.project_id.as_deref().filter(|p| !p.is_empty()) {
            Some(project) => (project.to_string(), OrganizationSource::Project(project.to_string())),
            None => {
                tracing::info!("organization id not specified, looking for a project in credentials");
                discover_project(credentials, lookup.credentials_path.as_ref()).await?
            }
        };

        let organization_id = self.organization_of_project(&project).await?;
        Ok((OrganizationContext::new(organization_id), source))
    }

    async fn organization_of_project(&self, project: &str) -> Result<String, ConfigurationError> {
        let ancestry = self
            .directory
            .get_ancestry(project)
            .await
            .map_err(|source| ConfigurationError::Ancestry {
                project: project.to_string(),
                source,
            })?;

        match ancestry.last() {
            Some(outermost) if outermost.resource_id.kind == "organization" => {
                Ok(outermost.resource_id.id.clone())
            }
            _ => Err(ConfigurationError::NotInOrganization {
                project: project.to_string(),
            }),
        }
    }
}

async fn discover_project(
    credentials: &dyn CredentialDiscovery,
    credentials_path: Option<&PathBuf>,
) -> Result<(String, OrganizationSource), ConfigurationError> {
    let default_failure = match credentials.default_credentials().await {
        Ok(creds) => match creds.project_id() {
            Some(project) => {
                tracing::info!(project = %project, origin = %creds.origin, "project id found in default credentials");
                return Ok((project.to_string(), OrganizationSource::DefaultCredentials(project.to_string())));
            }
            None => {
                tracing::debug!(origin = %creds.origin, "default credentials carry no project");
                None
            }
        },
        Err(err) => {
            tracing::debug!(error = %err, "default credentials unavailable");
            Some(err)
        }
    };

    let Some(path) = credentials_path else {
        return Err(match default_failure {
            Some(CredentialError::NotFound(message)) => ConfigurationError::no_credentials(format!(
                "{message}; specify --org, --project or a credentials file"
            )),
            Some(err) => err.into(),
            None => ConfigurationError::NoProjectInCredentials { path: None },
        });
    };

    let creds = credentials.credentials_from_file(path).await?;
    match creds.project_id() {
        Some(project) => {
            tracing::info!(project = %project, path = %path.display(), "project id found in credentials file");
            Ok((project.to_string(), OrganizationSource::CredentialsFile(project.to_string())))
        }
        None => Err(ConfigurationError::NoProjectInCredentials {
            path: Some(path.clone()),
        }),
    }
}
