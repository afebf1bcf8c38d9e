use serde::{Deserialize, Serialize};

/// A resolved role and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Fully-qualified name the role was fetched by.
    pub uri: String,
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(uri: impl Into<String>, permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            uri: uri.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}
