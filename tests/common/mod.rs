#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use iam_inventory::gcp::wire::{self, v1, v2, Ancestor, RawPolicy, ResourceId};
use iam_inventory::gcp::{
    CredentialDiscovery, CredentialsKind, DiscoveredCredentials, PolicySource, ResourceDirectory, RoleLookup,
};
use iam_inventory::models::{Binding, Resource, ResourceKind, Role};
use iam_inventory::{ApiError, CredentialError};

/// In-memory organization that records every call made against it.
#[derive(Default)]
pub struct FakeCloud {
    folders: Vec<String>,
    projects: Vec<String>,
    policies: HashMap<String, Vec<Binding>>,
    failing_policies: HashSet<String>,
    failing_listings: bool,
    roles: HashMap<String, Vec<String>>,
    ancestry: HashMap<String, Vec<Ancestor>>,
    calls: Mutex<Vec<String>>,
}

fn key(resource: &Resource) -> String {
    format!("{}:{}", resource.kind, resource.id)
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, name: &str) -> Self {
        self.folders.push(name.to_string());
        self
    }

    pub fn with_project(mut self, project_id: &str) -> Self {
        self.projects.push(project_id.to_string());
        self
    }

    pub fn with_policy(mut self, resource: Resource, bindings: Vec<Binding>) -> Self {
        self.policies.insert(key(&resource), bindings);
        self
    }

    pub fn with_failing_policy(mut self, resource: Resource) -> Self {
        self.failing_policies.insert(key(&resource));
        self
    }

    pub fn with_failing_listings(mut self) -> Self {
        self.failing_listings = true;
        self
    }

    pub fn with_role(mut self, uri: &str, permissions: &[&str]) -> Self {
        self.roles
            .insert(uri.to_string(), permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Ancestry chain of `project`, given innermost first as (type, id) pairs.
    pub fn with_ancestry(mut self, project: &str, chain: &[(&str, &str)]) -> Self {
        let ancestors = chain
            .iter()
            .map(|(kind, id)| Ancestor {
                resource_id: ResourceId {
                    id: id.to_string(),
                    kind: kind.to_string(),
                },
            })
            .collect();
        self.ancestry.insert(project.to_string(), ancestors);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    pub fn role_lookups(&self) -> Vec<String> {
        self.calls_with_prefix("get_role:")
            .into_iter()
            .map(|c| c.trim_start_matches("get_role:").to_string())
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl ResourceDirectory for FakeCloud {
    async fn list_organizations(&self) -> Result<Vec<wire::Organization>, ApiError> {
        self.record("list_organizations".to_string());
        Ok(Vec::new())
    }

    async fn list_projects(&self, filter: &str) -> Result<Vec<wire::Project>, ApiError> {
        self.record(format!("list_projects:{filter}"));
        if self.failing_listings {
            return Err(ApiError::status(503, "projects", "unavailable"));
        }
        Ok(self
            .projects
            .iter()
            .map(|id| wire::Project {
                project_id: id.clone(),
                name: format!("{id} display"),
                ..Default::default()
            })
            .collect())
    }

    async fn list_folders(&self, parent: &str) -> Result<Vec<wire::Folder>, ApiError> {
        self.record(format!("list_folders:{parent}"));
        if self.failing_listings {
            return Err(ApiError::status(503, "folders", "unavailable"));
        }
        Ok(self
            .folders
            .iter()
            .map(|name| wire::Folder {
                name: name.clone(),
                parent: parent.to_string(),
                ..Default::default()
            })
            .collect())
    }

    async fn get_ancestry(&self, project_id: &str) -> Result<Vec<Ancestor>, ApiError> {
        self.record(format!("get_ancestry:{project_id}"));
        self.ancestry
            .get(project_id)
            .cloned()
            .ok_or_else(|| ApiError::status(403, project_id, "permission denied"))
    }
}

#[async_trait]
impl PolicySource for FakeCloud {
    async fn get_policy(&self, resource: &Resource) -> Result<RawPolicy, ApiError> {
        let key = key(resource);
        self.record(format!("get_policy:{key}"));
        if self.failing_policies.contains(&key) {
            return Err(ApiError::status(403, key, "permission denied"));
        }

        let bindings = self.policies.get(&key).cloned().unwrap_or_default();
        Ok(match resource.kind {
            ResourceKind::Folder => RawPolicy::V2(v2::Policy {
                bindings: bindings
                    .into_iter()
                    .map(|b| v2::Binding {
                        role: b.role,
                        members: b.members,
                        condition: None,
                    })
                    .collect(),
                etag: "etag-v2".to_string(),
                version: 1,
            }),
            ResourceKind::Organization | ResourceKind::Project => RawPolicy::V1(v1::Policy {
                bindings: bindings
                    .into_iter()
                    .map(|b| v1::Binding {
                        role: b.role,
                        members: b.members,
                        condition: None,
                    })
                    .collect(),
                etag: "etag-v1".to_string(),
                version: 1,
            }),
        })
    }
}

#[async_trait]
impl RoleLookup for FakeCloud {
    async fn get_role(&self, uri: &str) -> Result<Role, ApiError> {
        self.record(format!("get_role:{uri}"));
        self.roles
            .get(uri)
            .map(|perms| Role::new(uri, perms.clone()))
            .ok_or_else(|| ApiError::not_found(uri))
    }
}

/// Application default credentials outcome of [`FakeCredentials`].
#[derive(Debug, Clone)]
pub enum DefaultCredentials {
    Missing,
    WithoutProject,
    WithProject(String),
}

/// Credential discovery with canned answers. Unregistered files are unreadable.
pub struct FakeCredentials {
    default: DefaultCredentials,
    files: HashMap<PathBuf, Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCredentials {
    pub fn new(default: DefaultCredentials) -> Self {
        Self {
            default,
            files: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, path: &str, project: Option<&str>) -> Self {
        self.files.insert(PathBuf::from(path), project.map(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

fn discovered(project: Option<String>, origin: &str) -> DiscoveredCredentials {
    DiscoveredCredentials {
        kind: CredentialsKind::ComputeMetadata {
            endpoint: "http://metadata.invalid".to_string(),
        },
        project_id: project,
        origin: origin.to_string(),
    }
}

#[async_trait]
impl CredentialDiscovery for FakeCredentials {
    async fn default_credentials(&self) -> Result<DiscoveredCredentials, CredentialError> {
        self.record("default_credentials".to_string());
        match &self.default {
            DefaultCredentials::Missing => Err(CredentialError::not_found("nothing configured")),
            DefaultCredentials::WithoutProject => Ok(discovered(None, "default")),
            DefaultCredentials::WithProject(p) => Ok(discovered(Some(p.clone()), "default")),
        }
    }

    async fn credentials_from_file(&self, path: &Path) -> Result<DiscoveredCredentials, CredentialError> {
        self.record(format!("credentials_from_file:{}", path.display()));
        match self.files.get(path) {
            Some(project) => Ok(discovered(project.clone(), &path.display().to_string())),
            None => Err(CredentialError::Unreadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}
