pub mod policy;
pub mod resource;
pub mod role;
pub mod row;

pub use policy::{Binding, Condition, Policy};
pub use resource::{OrganizationContext, Resource, ResourceKind, SchemaVersion};
pub use role::Role;
pub use row::{Permissions, ResolvedRow, Row, UNKNOWN_PERMISSION};
