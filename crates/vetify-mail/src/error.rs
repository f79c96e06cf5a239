//! Mail errors.

/// Result type alias for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors building or delivering an email.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MailError {
    /// Transport configuration is missing or invalid.
    #[error("mail configuration error: {0}")]
    Config(String),

    /// A mailbox could not be parsed.
    #[error("invalid address '{address}': {message}")]
    Address {
        /// The rejected mailbox.
        address: String,
        /// Parser message.
        message: String,
    },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Message(String),

    /// The transport failed to deliver.
    #[error("mail delivery failed: {0}")]
    Transport(String),

    /// Service-account credentials could not be used.
    #[error("service account error: {0}")]
    Credentials(String),

    /// The Gmail API refused the request.
    #[error("Gmail API rejected request (HTTP {status})")]
    Rejected {
        /// HTTP status returned.
        status: u16,
    },
}

impl MailError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MailError::Config(message.into())
    }
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        MailError::Transport(e.to_string())
    }
}
