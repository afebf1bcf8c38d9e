use serde::{Deserialize, Serialize};

/// Canonical IAM policy, independent of the API generation it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub bindings: Vec<Binding>,
    /// Passthrough only, policies are never written back.
    pub etag: String,
}

impl Policy {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            etag: String::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.bindings.iter().map(|b| b.members.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Binding {
    pub fn new(role: impl Into<String>, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            role: role.into(),
            members: members.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }
}

/// Condition attached to a binding. Carried verbatim, never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub title: String,
    pub description: String,
    pub expression: String,
    pub location: String,
}
