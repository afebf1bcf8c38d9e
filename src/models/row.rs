use std::sync::Arc;

use serde::Serialize;

use super::resource::{Resource, ResourceKind};

/// Marker written in place of permissions when a role cannot be resolved.
pub const UNKNOWN_PERMISSION: &str = "UNKNOWN";

/// One (resource, role, member) fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub resource: String,
    pub kind: ResourceKind,
    pub role: String,
    pub member: String,
}

impl Row {
    pub fn new(resource: &Resource, role: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            resource: resource.id.clone(),
            kind: resource.kind,
            role: role.into(),
            member: member.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// Shared with the resolver cache, one allocation per resolved role.
    Granted(Arc<[String]>),
    /// The role could not be resolved by any candidate URI.
    Unknown,
}

impl Permissions {
    pub fn granted(perms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Permissions::Granted(perms.into_iter().map(Into::into).collect())
    }

    /// Permission values as they are exported, `UNKNOWN` for unresolved roles.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Permissions::Granted(perms) => perms.iter().map(String::as_str).collect(),
            Permissions::Unknown => vec![UNKNOWN_PERMISSION],
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Permissions::Unknown)
    }
}

/// A row with its role's permissions attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    pub row: Row,
    pub permissions: Permissions,
}

impl ResolvedRow {
    pub fn new(row: Row, permissions: Permissions) -> Self {
        Self { row, permissions }
    }
}
