//! Error types for vetify-auth

use thiserror::Error;
use vetify_issuer::{IssuerError, StorageError};
use vetify_mail::MailError;

/// Result type alias for subject mapping.
pub type Result<T> = std::result::Result<T, MapError>;

/// Errors mapping a completed provider flow to a subject.
///
/// Both variants fail the attempt; no subject is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
    /// The provider output did not yield the claims a subject needs.
    #[error("failed to extract {kind} subject: {reason}")]
    ClaimExtraction {
        /// Subject kind being built.
        kind: &'static str,
        /// What was missing or unusable.
        reason: String,
    },

    /// No mapper is registered for the provider.
    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),
}

impl MapError {
    /// Creates a claim-extraction error.
    pub fn claim_extraction(kind: &'static str, reason: impl Into<String>) -> Self {
        MapError::ClaimExtraction {
            kind,
            reason: reason.into(),
        }
    }
}

/// Startup configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// One or more required variables are unset or empty.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is set to an unusable value.
    #[error("invalid {var}: {message}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Why it was rejected.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            message: message.into(),
        }
    }
}

/// Failures assembling the service from validated settings.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StartupError {
    /// Configuration did not validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The mail transport could not be built.
    #[error("mail transport: {0}")]
    Mail(#[from] MailError),

    /// The persisted storage file could not be loaded.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The issuer rejected its configuration.
    #[error(transparent)]
    Issuer(#[from] IssuerError),
}
