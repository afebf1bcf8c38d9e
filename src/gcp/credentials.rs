use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::CredentialDiscovery;
use crate::errors::CredentialError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsKind {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    /// Running on compute, tokens come from the metadata server.
    ComputeMetadata { endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCredentials {
    pub kind: CredentialsKind,
    pub project_id: Option<String>,
    /// Where the credentials were found, for log and error messages.
    pub origin: String,
}

impl DiscoveredCredentials {
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref().filter(|p| !p.is_empty())
    }
}

/// Parses a service account key or an authorized user file.
pub fn parse_credentials(origin: &str, data: &str) -> Result<DiscoveredCredentials, CredentialError> {
    let file: CredentialsFile = serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(data))
        .map_err(|err| CredentialError::invalid(origin, err.to_string()))?;

    let (kind, project_id) = match file {
        CredentialsFile::ServiceAccount(key) => {
            let project = key.project_id.clone();
            (CredentialsKind::ServiceAccount(key), project)
        }
        CredentialsFile::AuthorizedUser(user) => {
            let project = user.quota_project_id.clone();
            (CredentialsKind::AuthorizedUser(user), project)
        }
    };

    Ok(DiscoveredCredentials {
        kind,
        project_id,
        origin: origin.to_string(),
    })
}

/// Application default credentials lookup the way gcloud tooling does it.
///
/// Order: `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud well-known file, the
/// compute metadata server.
#[derive(Debug, Clone)]
pub struct AmbientCredentials {
    pub application_credentials: Option<PathBuf>,
    pub well_known_file: Option<PathBuf>,
    pub project_override: Option<String>,
    /// `None` disables the metadata server probe.
    pub metadata_endpoint: Option<String>,
    http: reqwest::Client,
}

impl AmbientCredentials {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            application_credentials: None,
            well_known_file: None,
            project_override: None,
            metadata_endpoint: None,
            http,
        }
    }

    pub fn from_env(http: reqwest::Client) -> Self {
        let application_credentials = non_empty_env("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        let config_dir = non_empty_env("CLOUDSDK_CONFIG")
            .map(PathBuf::from)
            .or_else(|| non_empty_env("HOME").map(|home| Path::new(&home).join(".config").join("gcloud")));
        let metadata_endpoint = non_empty_env("GCE_METADATA_HOST")
            .map(|host| format!("http://{host}"))
            .unwrap_or_else(|| DEFAULT_METADATA_ENDPOINT.to_string());

        Self {
            application_credentials,
            well_known_file: config_dir.map(|dir| dir.join(WELL_KNOWN_FILE)),
            project_override: non_empty_env("GOOGLE_CLOUD_PROJECT"),
            metadata_endpoint: Some(metadata_endpoint),
            http,
        }
    }

    pub fn with_application_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.application_credentials = Some(path.into());
        self
    }

    pub fn with_well_known_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.well_known_file = Some(path.into());
        self
    }

    pub fn with_project_override(mut self, project: impl Into<String>) -> Self {
        self.project_override = Some(project.into());
        self
    }

    pub fn with_metadata_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata_endpoint = Some(endpoint.into());
        self
    }

    async fn from_metadata(&self, endpoint: &str) -> Result<DiscoveredCredentials, CredentialError> {
        let url = format!("{endpoint}/computeMetadata/v1/project/project-id");
        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map_err(|err| CredentialError::Metadata(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CredentialError::Metadata(format!("{url} returned {}", response.status())));
        }

        let project = response
            .text()
            .await
            .map_err(|err| CredentialError::Metadata(err.to_string()))?;

        Ok(DiscoveredCredentials {
            kind: CredentialsKind::ComputeMetadata {
                endpoint: endpoint.to_string(),
            },
            project_id: Some(project.trim().to_string()),
            origin: "compute metadata".to_string(),
        })
    }

    fn apply_project_override(&self, mut creds: DiscoveredCredentials) -> DiscoveredCredentials {
        if creds.project_id().is_none() {
            creds.project_id = self.project_override.clone();
        }
        creds
    }
}

#[async_trait]
impl CredentialDiscovery for AmbientCredentials {
    async fn default_credentials(&self) -> Result<DiscoveredCredentials, CredentialError> {
        if let Some(path) = &self.application_credentials {
            tracing::debug!(path = %path.display(), "using GOOGLE_APPLICATION_CREDENTIALS");
            let creds = self.credentials_from_file(path).await?;
            return Ok(self.apply_project_override(creds));
        }

        if let Some(path) = self.well_known_file.as_ref().filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "using gcloud application default credentials");
            let creds = self.credentials_from_file(path).await?;
            return Ok(self.apply_project_override(creds));
        }

        if let Some(endpoint) = &self.metadata_endpoint {
            match self.from_metadata(endpoint).await {
                Ok(creds) => return Ok(self.apply_project_override(creds)),
                Err(err) => tracing::debug!(error = %err, "metadata server unavailable"),
            }
        }

        Err(CredentialError::not_found(
            "set GOOGLE_APPLICATION_CREDENTIALS, run `gcloud auth application-default login` or supply a credentials file",
        ))
    }

    async fn credentials_from_file(&self, path: &Path) -> Result<DiscoveredCredentials, CredentialError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        parse_credentials(&path.display().to_string(), &data)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
