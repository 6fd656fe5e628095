use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::AuthError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google service-account key file (the JSON downloaded from the cloud console)
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, AuthError> {
        let key: ServiceAccountKey =
            serde_json::from_str(content).map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        if let Some(key_type) = &key.key_type {
            if key_type != "service_account" {
                return Err(AuthError::InvalidKey(format!(
                    "expected a service_account key, got '{}'",
                    key_type
                )));
            }
        }
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(AuthError::InvalidKey(
                "client_email and private_key are required".to_string(),
            ));
        }

        Ok(key)
    }
}

/// Claims of the signed assertion exchanged for an access token
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Still usable for at least another five minutes
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::minutes(5)
    }
}

/// Anything that can hand out a bearer token for Google APIs
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Authenticated Google session shared by every Sheets call of a run
pub struct GoogleSession {
    client: Client,
    key: ServiceAccountKey,
    scopes: Vec<String>,
    current_token: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for GoogleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSession")
            .field("client_email", &self.key.client_email)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl GoogleSession {
    /// Exchange the service-account credentials for an access token. Fails if
    /// the key cannot be used or the token endpoint rejects it.
    pub async fn authenticate(key: ServiceAccountKey, scopes: &[String]) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(concat!("dividend-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = Self {
            client,
            key,
            scopes: scopes.to_vec(),
            current_token: Mutex::new(None),
        };

        let token = session.request_token().await?;
        info!(
            "Authenticated as {} (token valid until {})",
            session.key.client_email,
            token.expires_at.format("%H:%M:%S")
        );
        *session.current_token.lock().await = Some(token);

        Ok(session)
    }

    /// Load the key file and authenticate in one step
    pub async fn from_key_file(path: &Path, scopes: &[String]) -> Result<Self, AuthError> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::authenticate(key, scopes).await
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("private_key is not a valid RSA PEM: {}", e)))?;

        Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        debug!("Requesting access token from {}", self.key.token_uri);

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, body });
        }

        let body = response.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(200).collect();
            AuthError::MalformedResponse(format!("{} in '{}'", e, snippet))
        })?;

        Ok(AccessToken {
            token: token_response.access_token,
            expires_at: now + Duration::seconds(token_response.expires_in),
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for GoogleSession {
    /// Bearer token for the next request, re-exchanging it when close to expiry
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.current_token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.token.clone());
            }
            warn!("Access token expires soon, requesting a new one");
        }

        let token = self.request_token().await?;
        let value = token.token.clone();
        *guard = Some(token);
        Ok(value)
    }
}
