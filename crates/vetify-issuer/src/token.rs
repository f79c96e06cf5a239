//! Subject token signing.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IssuerError;

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl {
    /// Access-token validity.
    pub access: Duration,
    /// Refresh-token validity.
    pub refresh: Duration,
}

impl Default for Ttl {
    /// 30 days / 365 days.
    fn default() -> Self {
        Self {
            access: Duration::from_secs(60 * 60 * 24 * 30),
            refresh: Duration::from_secs(60 * 60 * 24 * 365),
        }
    }
}

/// A subject as stored alongside codes and refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredSubject {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Value,
    pub id: String,
}

/// Claims of an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AccessClaims {
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Value,
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access-token `mode` claim.
pub(crate) const ACCESS_MODE: &str = "access";

/// Signs HS256 access tokens for subjects.
pub(crate) struct TokenService {
    issuer: String,
    encoding_key: EncodingKey,
    ttl: Ttl,
}

impl TokenService {
    pub fn new(issuer: impl Into<String>, secret: &[u8], ttl: Ttl) -> Self {
        Self {
            issuer: issuer.into(),
            encoding_key: EncodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Sign an access token for `subject` on behalf of `client_id`.
    pub fn sign_access(
        &self,
        subject: &StoredSubject,
        client_id: &str,
    ) -> Result<String, IssuerError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            mode: ACCESS_MODE.to_string(),
            kind: subject.kind.clone(),
            properties: subject.properties.clone(),
            sub: subject.id.clone(),
            iss: self.issuer.clone(),
            aud: client_id.to_string(),
            iat: now,
            exp: now + self.ttl.access.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IssuerError::Server(format!("failed to sign access token: {e}")))
    }
}
