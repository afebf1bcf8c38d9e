use crate::errors::ApiError;
use crate::gcp::wire::{v1, v2, RawPolicy};
use crate::models::{Binding, Condition, Policy, SchemaVersion};

/// Projects a wire policy onto the canonical shape.
///
/// Fails when the variant does not match the schema the resource kind is
/// served with.
pub fn normalize(raw: RawPolicy, expected: SchemaVersion) -> Result<Policy, ApiError> {
    if raw.schema() != expected {
        return Err(ApiError::unexpected_shape(format!(
            "expected a {expected:?} policy, got {:?}",
            raw.schema()
        )));
    }

    Ok(match raw {
        RawPolicy::V1(policy) => policy.into(),
        RawPolicy::V2(policy) => policy.into(),
    })
}

impl From<v1::Policy> for Policy {
    fn from(value: v1::Policy) -> Self {
        Policy {
            bindings: value.bindings.into_iter().map(Binding::from).collect(),
            etag: value.etag,
        }
    }
}

impl From<v1::Binding> for Binding {
    fn from(value: v1::Binding) -> Self {
        Binding {
            role: value.role,
            members: value.members,
            condition: value.condition.map(Condition::from),
        }
    }
}

impl From<v1::Expr> for Condition {
    fn from(value: v1::Expr) -> Self {
        Condition {
            title: value.title,
            description: value.description,
            expression: value.expression,
            location: value.location,
        }
    }
}

impl From<v2::Policy> for Policy {
    fn from(value: v2::Policy) -> Self {
        Policy {
            bindings: value.bindings.into_iter().map(Binding::from).collect(),
            etag: value.etag,
        }
    }
}

impl From<v2::Binding> for Binding {
    fn from(value: v2::Binding) -> Self {
        Binding {
            role: value.role,
            members: value.members,
            condition: value.condition.map(Condition::from),
        }
    }
}

impl From<v2::Expr> for Condition {
    fn from(value: v2::Expr) -> Self {
        Condition {
            title: value.title,
            description: value.description,
            expression: value.expression,
            location: value.location,
        }
    }
}
