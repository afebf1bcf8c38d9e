//! Response shapes of the Cloud Resource Manager and IAM APIs.
//!
//! The v1beta1 (organizations, projects) and v2beta1 (folders) generations
//! describe policies with the same fields but are kept as distinct types so
//! that every conversion into the canonical model is explicit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;
use crate::models::SchemaVersion;

pub mod v1 {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Policy {
        #[serde(default)]
        pub bindings: Vec<Binding>,
        #[serde(default)]
        pub etag: String,
        #[serde(default)]
        pub version: i64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Binding {
        #[serde(default)]
        pub role: String,
        #[serde(default)]
        pub members: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub condition: Option<Expr>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Expr {
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub expression: String,
        #[serde(default)]
        pub location: String,
        #[serde(default)]
        pub title: String,
    }
}

pub mod v2 {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Policy {
        #[serde(default)]
        pub bindings: Vec<Binding>,
        #[serde(default)]
        pub etag: String,
        #[serde(default)]
        pub version: i64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Binding {
        #[serde(default)]
        pub role: String,
        #[serde(default)]
        pub members: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub condition: Option<Expr>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Expr {
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub expression: String,
        #[serde(default)]
        pub location: String,
        #[serde(default)]
        pub title: String,
    }
}

/// A policy as returned by the API, tagged with its schema generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPolicy {
    V1(v1::Policy),
    V2(v2::Policy),
}

impl RawPolicy {
    pub fn schema(&self) -> SchemaVersion {
        match self {
            RawPolicy::V1(_) => SchemaVersion::V1,
            RawPolicy::V2(_) => SchemaVersion::V2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// `organizations/{id}`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub display_name: String,
}

impl Organization {
    pub fn id(&self) -> &str {
        if !self.organization_id.is_empty() {
            return &self.organization_id;
        }
        self.name.strip_prefix("organizations/").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub project_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_number: String,
    #[serde(default)]
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// `folders/{id}`
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub parent: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrganizationsResponse {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsResponse {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFoldersResponse {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRole {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub included_permissions: Vec<String>,
    #[serde(default)]
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of a project's ancestry chain, project first, organization last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ancestor {
    pub resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct AncestryResponse {
    ancestor: Vec<Ancestor>,
}

/// Converts a `getAncestry` response body into the typed chain.
///
/// Anything other than a non-empty `ancestor` array of `resourceId` objects
/// is rejected.
pub fn convert_ancestors(body: Value) -> Result<Vec<Ancestor>, ApiError> {
    let response: AncestryResponse = serde_path_to_error::deserialize(body).map_err(|err| {
        ApiError::unexpected_shape(format!("ancestry at {}: {}", err.path(), err.inner()))
    })?;

    if response.ancestor.is_empty() {
        return Err(ApiError::unexpected_shape("ancestry contains no ancestors"));
    }

    Ok(response.ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_ancestry_chain_in_order() {
        let body = json!({
            "ancestor": [
                {"resourceId": {"type": "project", "id": "my-project"}},
                {"resourceId": {"type": "folder", "id": "42"}},
                {"resourceId": {"type": "organization", "id": "1234"}}
            ]
        });

        let chain = convert_ancestors(body).expect("convert");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].resource_id.id, "my-project");
        assert_eq!(chain[2].resource_id.kind, "organization");
    }

    #[test]
    fn rejects_unexpected_ancestry_shapes() {
        let not_a_list = json!({"ancestor": {"resourceId": {"type": "project", "id": "p"}}});
        assert!(matches!(convert_ancestors(not_a_list), Err(ApiError::UnexpectedShape(_))));

        let missing = json!({"ancestors": []});
        assert!(matches!(convert_ancestors(missing), Err(ApiError::UnexpectedShape(_))));

        let empty = json!({"ancestor": []});
        assert!(matches!(convert_ancestors(empty), Err(ApiError::UnexpectedShape(_))));

        let bad_entry = json!({"ancestor": [{"resourceId": {"id": "p"}}]});
        let err = convert_ancestors(bad_entry).expect_err("missing type");
        assert!(err.to_string().contains("ancestor[0].resourceId"), "{err}");
    }

    #[test]
    fn organization_id_falls_back_to_name() {
        let org = Organization {
            name: "organizations/987".to_string(),
            ..Default::default()
        };
        assert_eq!(org.id(), "987");
    }
}
