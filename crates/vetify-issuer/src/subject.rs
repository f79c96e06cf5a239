//! Subject schema and request-extension helpers.

use serde_json::Value;

use crate::verify::VerifiedSubject;

/// Error raised when claims do not match a subject schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    /// The `type` tag names no known subject kind.
    #[error("unknown subject type '{0}'")]
    UnknownType(String),

    /// The properties do not fit the schema of the named kind.
    #[error("invalid properties for subject '{kind}': {message}")]
    InvalidProperties {
        /// Subject kind being decoded.
        kind: String,
        /// What did not match.
        message: String,
    },
}

/// A typed, claims-bearing identity embedded in issued tokens.
///
/// Each implementation declares the set of subject kinds the issuer may emit.
/// The engine stores and signs subjects as a `(type, properties)` pair and
/// calls [`Subject::from_parts`] to validate them on the way back in.
pub trait Subject: Clone + Send + Sync + 'static {
    /// The subject kind (the token's `type` claim).
    fn kind(&self) -> &'static str;

    /// The subject properties (the token's `properties` claim).
    fn properties(&self) -> Value;

    /// Rebuild a subject from its kind and properties.
    fn from_parts(kind: &str, properties: Value) -> Result<Self, SubjectError>;

    /// The identifying part of the subject, hashed by [`subject_id`].
    ///
    /// Defaults to every property. Override it when some properties, such as
    /// a display name, may change for the same person.
    fn identity(&self) -> String {
        self.properties().to_string()
    }
}

/// Stable identifier for a subject: `<type>:<hash of identity>`.
///
/// The same [`Subject::identity`] always yields the same identifier, so a
/// returning employee or customer keeps their `sub` across logins.
pub fn subject_id<S: Subject>(subject: &S) -> String {
    let hash = blake3::hash(subject.identity().as_bytes()).to_hex();
    format!("{}:{}", subject.kind(), &hash[..16])
}

/// Extract the verified subject from HTTP request `Parts`, if present.
pub fn subject_from_parts<S: Subject>(parts: &http::request::Parts) -> Option<&VerifiedSubject<S>> {
    parts.extensions.get::<VerifiedSubject<S>>()
}
