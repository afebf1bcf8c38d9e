use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ApiError, InventoryError, InventoryResult};
use crate::gcp::RoleLookup;
use crate::models::ResourceKind;

/// Resolves role references to permission sets for one run.
///
/// Resolution order:
/// 1. resource-scoped custom role (`projects/{id}/roles/{name}` or
///    `organizations/{id}/roles/{name}`), for projects and organizations only
/// 2. the reference verbatim (predefined or already-qualified roles)
///
/// Successful lookups are memoized under the URI that was actually fetched.
pub struct RoleResolver {
    lookup: Arc<dyn RoleLookup>,
    cache: HashMap<String, Arc<[String]>>,
}

impl RoleResolver {
    pub fn new(lookup: Arc<dyn RoleLookup>) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(
        &mut self,
        kind: ResourceKind,
        resource_id: &str,
        role: &str,
    ) -> InventoryResult<Arc<[String]>> {
        let mut attempts = Vec::with_capacity(2);

        if let Some(scoped) = scoped_role_uri(kind, resource_id, role) {
            match self.lookup_uri(&scoped).await {
                Ok(permissions) => return Ok(permissions),
                Err(err) => {
                    tracing::debug!(uri = %scoped, error = %err, "no custom role at scoped uri");
                    attempts.push(scoped);
                }
            }
        }

        attempts.push(role.to_string());
        self.lookup_uri(role)
            .await
            .map_err(|source| InventoryError::Resolution {
                role: role.to_string(),
                attempts,
                source,
            })
    }

    /// Number of memoized URIs.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn lookup_uri(&mut self, uri: &str) -> Result<Arc<[String]>, ApiError> {
        if let Some(permissions) = self.cache.get(uri) {
            tracing::debug!(uri = %uri, "role cache hit");
            return Ok(Arc::clone(permissions));
        }

        let role = self.lookup.get_role(uri).await?;
        let permissions: Arc<[String]> = role.permissions.into();
        self.cache.insert(uri.to_string(), Arc::clone(&permissions));
        Ok(permissions)
    }
}

/// Candidate custom-role URI for a reference bound on `resource_id`.
///
/// `None` for folders, and for references that already name their parent.
pub fn scoped_role_uri(kind: ResourceKind, resource_id: &str, role: &str) -> Option<String> {
    if !kind.hosts_custom_roles() {
        return None;
    }
    if role.starts_with("projects/") || role.starts_with("organizations/") {
        return None;
    }

    let name = role.strip_prefix("roles/").unwrap_or(role);
    Some(format!("{}/{}/roles/{}", kind.collection(), resource_id, name))
}
