use crate::models::{Permissions, Policy, ResolvedRow, Resource, Row};

use super::resolver::RoleResolver;

/// One row per (binding, member), in binding then member order.
pub fn flatten(policy: &Policy, resource: &Resource) -> Vec<Row> {
    let mut rows = Vec::with_capacity(policy.member_count());
    for binding in &policy.bindings {
        for member in &binding.members {
            rows.push(Row::new(resource, binding.role.clone(), member.clone()));
        }
    }
    rows
}

/// Looks up every row's role. Unresolvable roles degrade to `UNKNOWN`.
pub async fn attach_permissions(rows: Vec<Row>, resolver: &mut RoleResolver) -> Vec<ResolvedRow> {
    let mut resolved = Vec::with_capacity(rows.len());

    for row in rows {
        let permissions = match resolver.resolve(row.kind, &row.resource, &row.role).await {
            Ok(permissions) => Permissions::Granted(permissions),
            Err(err) => {
                tracing::warn!(
                    resource = %row.resource,
                    kind = %row.kind,
                    role = %row.role,
                    error = %err,
                    "unable to resolve role permissions"
                );
                Permissions::Unknown
            }
        };
        resolved.push(ResolvedRow::new(row, permissions));
    }

    resolved
}
