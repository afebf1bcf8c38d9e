//! Inventory pipeline
//!
//! Walks an organization's hierarchy, normalizes each resource's IAM policy,
//! flattens bindings into rows and attaches each row's permissions:
//! - `walker`: folder and project enumeration, organization id discovery
//! - `normalizer`: v1/v2 policy schemas onto one canonical policy
//! - `flattener`: one row per binding member
//! - `resolver`: role reference to permissions, memoized per run
//! - `aggregator`: fixed tier order, fail-fast on policy errors

mod aggregator;
mod flattener;
mod normalizer;
mod resolver;
mod walker;

pub use aggregator::Aggregator;
pub use flattener::{attach_permissions, flatten};
pub use normalizer::normalize;
pub use resolver::{scoped_role_uri, RoleResolver};
pub use walker::{HierarchyWalker, OrganizationLookup, OrganizationSource};
