//! Registry lookup errors.

/// Result type alias for registry lookups.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Why a lookup did not resolve to exactly one client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LookupError {
    /// No client matched.
    #[error("no client matched")]
    NotFound,

    /// More than one client matched.
    #[error("{count} clients matched")]
    Ambiguous {
        /// Number of matching records.
        count: usize,
    },

    /// The registry answered with an `errors` object.
    #[error("registry reported errors: {0}")]
    Upstream(String),

    /// The registry answered with an unexpected body.
    #[error("unexpected registry response: {0}")]
    InvalidResponse(String),

    /// The request could not be completed.
    #[error("registry request failed: {0}")]
    Transport(String),
}

impl LookupError {
    /// Whether the lookup may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        // Request URLs carry the API key
        LookupError::Transport(e.without_url().to_string())
    }
}
