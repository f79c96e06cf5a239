//! Engine, provider, storage, and verification error types.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

/// Boxed error returned by application callbacks (success handlers, code senders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Render an error with its chain of sources, for logging.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors raised while serving the authorization endpoints.
///
/// Rendered as an OAuth 2.0 error body (`{error, error_description}`).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IssuerError {
    /// Malformed request or missing parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The access policy rejected the client.
    #[error("client '{0}' is not allowed")]
    UnauthorizedClient(String),

    /// Authorization code or refresh token is unknown, expired, or mismatched.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// Token endpoint called with an unsupported `grant_type`.
    #[error("unsupported grant type '{0}'")]
    UnsupportedGrantType(String),

    /// No provider is registered under this identifier.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The provider flow was used out of order (no attempt, wrong state nonce).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Upstream provider failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The success handler could not produce a subject.
    #[error("failed to complete authentication")]
    Success(#[source] BoxError),

    /// Builder misconfiguration.
    #[error("issuer configuration error: {0}")]
    Config(String),

    /// Anything else that should surface as a 500.
    #[error("server error: {0}")]
    Server(String),
}

impl IssuerError {
    /// OAuth 2.0 error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            IssuerError::InvalidRequest(_) | IssuerError::InvalidState(_) => "invalid_request",
            IssuerError::UnauthorizedClient(_) => "unauthorized_client",
            IssuerError::InvalidGrant(_) => "invalid_grant",
            IssuerError::UnsupportedGrantType(_) => "unsupported_grant_type",
            IssuerError::UnknownProvider(_) => "not_found",
            IssuerError::Provider(_)
            | IssuerError::Storage(_)
            | IssuerError::Success(_)
            | IssuerError::Config(_)
            | IssuerError::Server(_) => "server_error",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IssuerError::InvalidRequest(_)
            | IssuerError::InvalidState(_)
            | IssuerError::InvalidGrant(_)
            | IssuerError::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
            IssuerError::UnauthorizedClient(_) => StatusCode::FORBIDDEN,
            IssuerError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            IssuerError::Provider(_)
            | IssuerError::Storage(_)
            | IssuerError::Success(_)
            | IssuerError::Config(_)
            | IssuerError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    error_description: String,
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Issuer error: {self}");
        }
        let body = ErrorBody {
            error: self.error_code(),
            error_description: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors from an upstream OAuth provider.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The provider redirected back with an error.
    #[error("provider returned error '{error}'")]
    Denied {
        /// OAuth error code from the callback.
        error: String,
    },

    /// Transport failure talking to the provider.
    #[error("provider request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider rejected token exchange (HTTP {status})")]
    Rejected {
        /// HTTP status returned by the token endpoint.
        status: u16,
    },

    /// The token response could not be parsed.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

/// Outcome of a failed code dispatch.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SendCodeError {
    /// The claim is not acceptable; shown to the user as a validation failure.
    #[error("invalid claim '{key}'")]
    InvalidClaim {
        /// Name of the rejected claim (e.g. `email`).
        key: String,
        /// The rejected value.
        value: String,
    },

    /// The code could not be delivered.
    #[error("code delivery failed")]
    Delivery(#[source] BoxError),
}

impl SendCodeError {
    /// Creates an invalid-claim signal for `key`.
    pub fn invalid_claim(key: impl Into<String>, value: impl Into<String>) -> Self {
        SendCodeError::InvalidClaim {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Wraps a transport error.
    pub fn delivery<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SendCodeError::Delivery(Box::new(source))
    }
}

/// Errors from the key-value storage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Reading or writing the persistence file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that can occur while verifying an issued subject token.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token format is invalid (not a valid JWT).
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// JWT signature verification failed.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token was issued by another issuer.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// Token is not an access token.
    #[error("unexpected token mode '{0}'")]
    WrongMode(String),

    /// Subject claims do not match the schema.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidFormat(_)
                | AuthError::InvalidSignature(_)
                | AuthError::Expired
                | AuthError::InvalidIssuer
                | AuthError::WrongMode(_)
        )
    }
}
