//! Provider capability interfaces.
//!
//! The engine knows two provider classes:
//! - OAuth-class providers redirect to an upstream authorization server and
//!   come back with a [`TokenSet`].
//! - Code-class providers collect an email, deliver a one-time code through a
//!   [`CodeSender`], and come back with verified [`CodeClaims`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderError, SendCodeError};
use crate::ui::CodeCopy;

/// Number of digits in a generated verification code.
pub const CODE_LENGTH: u32 = 6;

/// How long a sent code can be redeemed.
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(10 * 60);

/// Wrong guesses allowed before a sent code is discarded.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;

/// Result of an OAuth 2.0 authorization-code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Upstream access token.
    pub access: String,
    /// Upstream refresh token, if granted.
    pub refresh: Option<String>,
    /// Lifetime of the access token in seconds, if reported.
    pub expires_in: Option<u64>,
    /// The full token response (e.g. carries `id_token`).
    pub raw: Value,
}

impl TokenSet {
    /// Build a token set from a raw token-endpoint response.
    pub fn from_raw(raw: Value) -> Result<Self, ProviderError> {
        let access = raw
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::InvalidResponse("missing access_token".to_string()))?
            .to_string();
        let refresh = raw
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string);
        let expires_in = raw.get("expires_in").and_then(Value::as_u64);

        Ok(Self {
            access,
            refresh,
            expires_in,
            raw,
        })
    }

    /// A string field of the raw response.
    pub fn raw_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }
}

/// An upstream OAuth 2.0 authorization server.
#[async_trait]
pub trait OAuthProvider: Send + Sync + 'static {
    /// URL the user is redirected to, carrying our callback and state nonce.
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, ProviderError>;
}

/// Claims collected by the code flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeClaims {
    /// The address the code is sent to.
    pub email: String,
}

/// Delivers a one-time code for the given claims.
#[async_trait]
pub trait CodeSender: Send + Sync + 'static {
    /// Send `code` out-of-band.
    ///
    /// Return [`SendCodeError::InvalidClaim`] to reject the claims through
    /// the code UI instead of failing the attempt.
    async fn send_code(&self, claims: &CodeClaims, code: &str) -> Result<(), SendCodeError>;
}

/// A code-class provider: a sender, the UI copy, and the redemption limits.
#[derive(Clone)]
pub struct CodeProvider {
    pub(crate) sender: Arc<dyn CodeSender>,
    pub(crate) copy: CodeCopy,
    pub(crate) code_ttl: Duration,
    pub(crate) max_attempts: u32,
}

impl CodeProvider {
    /// Create a provider delivering codes through `sender`.
    pub fn new(sender: Arc<dyn CodeSender>) -> Self {
        Self {
            sender,
            copy: CodeCopy::default(),
            code_ttl: DEFAULT_CODE_TTL,
            max_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }

    /// Override the UI copy.
    pub fn with_copy(mut self, copy: CodeCopy) -> Self {
        self.copy = copy;
        self
    }

    /// How long a sent code stays valid.
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    /// Wrong guesses allowed per sent code (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

/// A registered provider.
#[derive(Clone)]
pub enum Provider {
    /// Redirect-based OAuth 2.0 provider.
    OAuth(Arc<dyn OAuthProvider>),
    /// Email one-time-code provider.
    Code(CodeProvider),
}

impl Provider {
    /// Wrap an OAuth provider.
    pub fn oauth(provider: impl OAuthProvider) -> Self {
        Provider::OAuth(Arc::new(provider))
    }

    /// Wrap a code provider.
    pub fn code(provider: CodeProvider) -> Self {
        Provider::Code(provider)
    }
}

/// What a completed provider flow hands to the success handler.
#[derive(Debug, Clone)]
pub enum ProviderOutput {
    /// Tokens from an OAuth exchange.
    OAuth(TokenSet),
    /// Claims verified by the code flow.
    Code(CodeClaims),
}

/// Generate a random numeric verification code from the OS generator.
pub fn generate_code() -> String {
    let n = OsRng.gen_range(0..10u32.pow(CODE_LENGTH));
    format!("{n:0width$}", width = CODE_LENGTH as usize)
}
