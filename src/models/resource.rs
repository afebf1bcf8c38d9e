use std::fmt;

use serde::{Deserialize, Serialize};

/// The three tiers of the resource hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Organization,
    Folder,
    Project,
}

/// Policy wire schema generation served for a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1,
    V2,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Organization => "organization",
            ResourceKind::Folder => "folder",
            ResourceKind::Project => "project",
        }
    }

    /// Collection segment used in resource names, e.g. `projects`.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Organization => "organizations",
            ResourceKind::Folder => "folders",
            ResourceKind::Project => "projects",
        }
    }

    /// Folders are served by the v2 API, everything else by v1.
    pub fn policy_schema(&self) -> SchemaVersion {
        match self {
            ResourceKind::Folder => SchemaVersion::V2,
            ResourceKind::Organization | ResourceKind::Project => SchemaVersion::V1,
        }
    }

    /// Whether custom roles can be defined on this kind of resource.
    pub fn hosts_custom_roles(&self) -> bool {
        matches!(self, ResourceKind::Organization | ResourceKind::Project)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the hierarchy.
///
/// `id` is what the policy and role APIs expect: the numeric organization
/// id, the `folders/{n}` name, or the project id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Organization)
    }

    pub fn folder(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Folder)
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Project)
    }
}

/// Root of a traversal. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationContext {
    organization_id: String,
}

impl OrganizationContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// `organizations/{id}`, the parent used to list folders.
    pub fn resource_name(&self) -> String {
        format!("organizations/{}", self.organization_id)
    }

    pub fn project_filter(&self) -> String {
        format!("parent.type:organization parent.id:{}", self.organization_id)
    }

    pub fn resource(&self) -> Resource {
        Resource::organization(self.organization_id.clone())
    }
}
