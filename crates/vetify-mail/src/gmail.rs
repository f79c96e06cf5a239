//! Gmail REST API transport.
//!
//! Authenticates as a service account with domain-wide delegation
//! (RFC 7523 JWT bearer grant, `sub` = the impersonated mailbox) and posts
//! the RFC 5322 message, base64url-encoded, to `users.messages.send`.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Mailer;
use crate::error::{MailError, Result};
use crate::message::OutgoingEmail;

/// Scope required to send mail.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the access token this long before it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account key file used here.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account identity.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Token endpoint.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Read a key file (the `GOOGLE_APPLICATION_CREDENTIALS` JSON).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MailError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            MailError::Credentials(format!("invalid key file {}: {e}", path.display()))
        })
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Sends mail as `sender` through the Gmail API.
pub struct GmailMailer {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    sender: String,
    token_url: String,
    api_base: String,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl GmailMailer {
    /// Create a mailer impersonating `sender`.
    ///
    /// Fails if the private key is not a valid RSA PEM.
    pub fn new(key: ServiceAccountKey, sender: impl Into<String>) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| MailError::Credentials(format!("invalid private key: {e}")))?;
        let token_url = key
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Ok(Self {
            key,
            encoding_key,
            sender: sender.into(),
            token_url,
            api_base: GMAIL_API_BASE.to_string(),
            http_client,
            cached: Mutex::new(None),
        })
    }

    /// Use other token and API endpoints.
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.api_base = api_base.into();
        self
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.cached.lock().await.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.token.clone());
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.cached.lock().await = Some(fresh);
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            sub: &self.sender,
            scope: GMAIL_SEND_SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| MailError::Credentials(format!("cannot sign assertion: {e}")))?;

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Service account token request rejected (HTTP {status})");
            return Err(MailError::Credentials(format!(
                "token endpoint returned HTTP {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailError::Credentials(format!("invalid token response: {e}")))?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));

        log::debug!("Obtained Gmail access token for {}", self.sender);
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let raw = URL_SAFE.encode(email.to_message()?.formatted());
        let token = self.access_token().await?;
        let url = format!(
            "{}/gmail/v1/users/{}/messages/send",
            self.api_base, self.sender
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
