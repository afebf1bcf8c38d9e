use std::sync::Arc;
use std::time::Instant;

use crate::errors::{InventoryError, InventoryResult};
use crate::gcp::{PolicySource, ResourceDirectory, RoleLookup};
use crate::models::{OrganizationContext, ResolvedRow, Resource};

use super::flattener::{attach_permissions, flatten};
use super::normalizer::normalize;
use super::resolver::RoleResolver;
use super::walker::HierarchyWalker;

/// Collects every row of an organization: the organization itself, then its
/// folders, then its projects.
///
/// A listing or policy failure aborts the whole collection and nothing is
/// returned. Role resolution failures only degrade the affected rows.
pub struct Aggregator {
    context: OrganizationContext,
    walker: HierarchyWalker,
    policies: Arc<dyn PolicySource>,
    resolver: RoleResolver,
}

impl Aggregator {
    pub fn new(
        context: OrganizationContext,
        directory: Arc<dyn ResourceDirectory>,
        policies: Arc<dyn PolicySource>,
        roles: Arc<dyn RoleLookup>,
    ) -> Self {
        Self {
            context,
            walker: HierarchyWalker::new(directory),
            policies,
            resolver: RoleResolver::new(roles),
        }
    }

    pub async fn collect_all(&mut self) -> InventoryResult<Vec<ResolvedRow>> {
        let started = Instant::now();
        let mut rows = Vec::new();

        let organization = self.context.resource();
        self.collect_resource(&organization, &mut rows).await?;
        tracing::info!(organization = %organization.id, count = rows.len(), "organization rows collected");

        let folders = self.walker.list_folders(&self.context).await?;
        let before = rows.len();
        for folder in &folders {
            self.collect_resource(folder, &mut rows).await?;
        }
        tracing::info!(folders = folders.len(), count = rows.len() - before, "folder rows collected");

        let projects = self.walker.list_projects(&self.context).await?;
        let before = rows.len();
        for project in &projects {
            self.collect_resource(project, &mut rows).await?;
        }
        tracing::info!(projects = projects.len(), count = rows.len() - before, "project rows collected");

        tracing::info!(
            count = rows.len(),
            cached_roles = self.resolver.cached(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection finished"
        );
        Ok(rows)
    }

    async fn collect_resource(&mut self, resource: &Resource, rows: &mut Vec<ResolvedRow>) -> InventoryResult<()> {
        tracing::debug!(resource = %resource.id, kind = %resource.kind, "fetching policy");

        let policy = self
            .policies
            .get_policy(resource)
            .await
            .and_then(|raw| normalize(raw, resource.kind.policy_schema()))
            .map_err(|err| {
                tracing::error!(resource = %resource.id, kind = %resource.kind, error = %err, "unable to get policy");
                InventoryError::collaborator(format!("getting IAM policy of {} {}", resource.kind, resource.id), err)
            })?;

        let flat = flatten(&policy, resource);
        rows.extend(attach_permissions(flat, &mut self.resolver).await);
        Ok(())
    }
}
