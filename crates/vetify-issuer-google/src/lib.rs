//! Google OAuth2 provider for the Vetify issuer.
//!
//! Implements [`vetify_issuer::OAuthProvider`] for Google:
//! - authorization URL construction (`openid email profile` by default)
//! - authorization-code exchange against the token endpoint
//! - unverified `id_token` claim extraction ([`decode_id_token`])

mod id_token;

use std::time::Duration;

use async_trait::async_trait;
use vetify_issuer::{OAuthProvider, ProviderError, TokenSet};

pub use id_token::{IdTokenClaims, IdTokenError, decode_id_token};

/// Google's authorization endpoint.
pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Timeout for calls to the token endpoint.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Google OAuth2 authorization-code provider.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    authorize_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl GoogleProvider {
    /// Create a provider for the given OAuth client.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            http_client,
        }
    }

    /// Replace the requested scopes.
    pub fn with_scopes<I, T>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Point the provider at other endpoints (for tests).
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        let scope = self.scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        match reqwest::Url::parse_with_params(&self.authorize_url, &params) {
            Ok(url) => url.into(),
            Err(e) => {
                log::error!("Invalid Google authorization endpoint: {e}");
                self.authorize_url.clone()
            }
        }
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, ProviderError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Google token endpoint rejected code exchange (HTTP {status})");
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
            });
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        log::debug!("Google code exchange succeeded");
        TokenSet::from_raw(raw)
    }
}
