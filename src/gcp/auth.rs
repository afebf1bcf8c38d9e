use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::credentials::{AuthorizedUser, CredentialsKind, DiscoveredCredentials, ServiceAccountKey};
use crate::errors::ApiError;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const AUTHORIZED_USER_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_MINUTES: i64 = 60;
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Source of bearer tokens for API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// A token supplied by the caller, used as is.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges discovered credentials for access tokens and caches them until
/// shortly before they expire.
pub struct OAuthTokenProvider {
    credentials: CredentialsKind,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuthTokenProvider {
    pub fn new(credentials: DiscoveredCredentials, http: reqwest::Client) -> Self {
        Self {
            credentials: credentials.kind,
            http,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, ApiError> {
        let response = match &self.credentials {
            CredentialsKind::ServiceAccount(key) => self.service_account_token(key).await?,
            CredentialsKind::AuthorizedUser(user) => self.refresh_user_token(user).await?,
            CredentialsKind::ComputeMetadata { endpoint } => self.metadata_token(endpoint).await?,
        };

        let lifetime = response.expires_in.unwrap_or(3600);
        Ok(CachedToken {
            value: response.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }

    async fn service_account_token(&self, key: &ServiceAccountKey) -> Result<TokenResponse, ApiError> {
        let assertion = sign_assertion(key, Utc::now())?;
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        token_response(&key.token_uri, response).await
    }

    async fn refresh_user_token(&self, user: &AuthorizedUser) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(AUTHORIZED_USER_TOKEN_URI)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ])
            .send()
            .await?;
        token_response(AUTHORIZED_USER_TOKEN_URI, response).await
    }

    async fn metadata_token(&self, endpoint: &str) -> Result<TokenResponse, ApiError> {
        let url = format!("{endpoint}/computeMetadata/v1/instance/service-accounts/default/token");
        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        token_response(&url, response).await
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        tracing::debug!("refreshing access token");
        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Self-signed JWT assertion for the service account token grant.
fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, ApiError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| ApiError::auth(format!("invalid private key for {}: {err}", key.client_email)))?;

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|err| ApiError::auth(format!("unable to sign assertion: {err}")))
}

async fn token_response(url: &str, response: reqwest::Response) -> Result<TokenResponse, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::auth(format!("{url} returned {status}: {body}")));
    }

    let bytes = response.bytes().await?;
    serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&bytes)).map_err(|source| {
        ApiError::Decode {
            url: url.to_string(),
            source,
        }
    })
}
