use std::path::PathBuf;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Terminal and row-level failures of an inventory run.
///
/// `Configuration`, `Collaborator` and `Output` abort the run. `Resolution`
/// is only ever raised per row and degraded to the `UNKNOWN` marker by the
/// flattener.
#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: String,
        #[source]
        source: ApiError,
    },
    #[error("unable to resolve role {role} (tried {})", .attempts.join(", "))]
    Resolution {
        role: String,
        attempts: Vec<String>,
        #[source]
        source: ApiError,
    },
    #[error("output error: {0}")]
    Output(String),
}

impl InventoryError {
    pub fn collaborator(operation: impl Into<String>, source: ApiError) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            source,
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }
}

/// Why an organization id could not be derived, or why the settings are unusable.
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("no credentials found: {0}")]
    NoCredentials(String),
    #[error("no project found in either application default credentials or {}", describe_path(.path))]
    NoProjectInCredentials { path: Option<PathBuf> },
    #[error("unable to read credentials file {}: {source}", .path.display())]
    CredentialsFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid credentials in {origin}: {message}")]
    InvalidCredentials { origin: String, message: String },
    #[error("unable to get ancestry for project {project}: {source}")]
    Ancestry {
        project: String,
        #[source]
        source: ApiError,
    },
    #[error("project {project} does not belong to an organization")]
    NotInOrganization { project: String },
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "a credentials file".to_string())
}

impl ConfigurationError {
    pub fn no_credentials(message: impl Into<String>) -> Self {
        Self::NoCredentials(message.into())
    }

    pub fn invalid_setting(message: impl Into<String>) -> Self {
        Self::InvalidSetting(message.into())
    }
}

/// Failure of a single call to one of the cloud APIs.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} returned {status}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },
    #[error("unable to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn status(status: u16, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn not_found(url: impl Into<String>) -> Self {
        Self::status(404, url, "not found")
    }

    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::UnexpectedShape(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Failure of one credential discovery sub-path.
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("no application default credentials: {0}")]
    NotFound(String),
    #[error("unable to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid credentials in {origin}: {message}")]
    Invalid { origin: String, message: String },
    #[error("metadata server: {0}")]
    Metadata(String),
}

impl CredentialError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

impl From<CredentialError> for ConfigurationError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::NotFound(message) => ConfigurationError::NoCredentials(message),
            CredentialError::Metadata(message) => ConfigurationError::NoCredentials(message),
            CredentialError::Unreadable { path, source } => {
                ConfigurationError::CredentialsFileUnreadable { path, source }
            }
            CredentialError::Invalid { origin, message } => {
                ConfigurationError::InvalidCredentials { origin, message }
            }
        }
    }
}
