use std::path::PathBuf;

use crate::errors::ConfigurationError;
use crate::gcp::{GcpEndpoints, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT};
use crate::inventory::OrganizationLookup;

pub const DEFAULT_OUTPUT_FILE: &str = "member_role_permissions.csv";

/// Settings of one export run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub output_path: PathBuf,
    /// Bypasses credential based token exchange when set.
    pub access_token: Option<String>,
    pub resource_manager_endpoint: String,
    pub iam_endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            organization_id: None,
            project_id: None,
            credentials_path: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            access_token: None,
            resource_manager_endpoint: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
            iam_endpoint: DEFAULT_IAM_ENDPOINT.to_string(),
        }
    }
}

impl Settings {
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigurationError::invalid_setting("output file must not be empty"));
        }
        for (name, endpoint) in [
            ("resource manager endpoint", &self.resource_manager_endpoint),
            ("iam endpoint", &self.iam_endpoint),
        ] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigurationError::invalid_setting(format!(
                    "{name} must be an http(s) url, got {endpoint:?}"
                )));
            }
        }
        Ok(self)
    }

    pub fn endpoints(&self) -> GcpEndpoints {
        GcpEndpoints {
            resource_manager: self.resource_manager_endpoint.clone(),
            iam: self.iam_endpoint.clone(),
        }
    }

    pub fn organization_lookup(&self) -> OrganizationLookup {
        OrganizationLookup {
            organization_id: non_empty(&self.organization_id),
            project_id: non_empty(&self.project_id),
            credentials_path: self.credentials_path.clone().filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
