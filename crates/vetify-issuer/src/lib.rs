//! Issuer engine for Vetify.
//!
//! Authenticates a principal through a registered provider and emits signed
//! subject tokens:
//! - [`Issuer`]: builder and axum router for the authorization endpoints
//! - [`Provider`]: OAuth-class ([`OAuthProvider`]) or code-class ([`CodeProvider`])
//! - [`SuccessHandler`]: maps a completed provider flow to a typed [`Subject`]
//! - [`Storage`] / [`MemoryStorage`]: key-value persistence for in-flight state
//! - [`SubjectVerifier`] / [`SubjectLayer`]: token verification for downstream services
//! - [`IssuerError`], [`AuthError`]: engine and verification error types

mod error;
mod handlers;
mod issuer;
mod middleware;
mod provider;
mod storage;
mod subject;
mod token;
mod ui;
mod verify;

#[cfg(test)]
mod testing;

pub use error::{AuthError, BoxError, IssuerError, ProviderError, SendCodeError, StorageError};
pub use issuer::{AccessPolicy, AccessRequest, Issuer, IssuerBuilder, SuccessHandler, SuccessInput};
pub use middleware::{SubjectLayer, SubjectService};
pub use provider::{
    CODE_LENGTH, CodeClaims, CodeProvider, CodeSender, DEFAULT_CODE_TTL,
    DEFAULT_MAX_CODE_ATTEMPTS, OAuthProvider, Provider, ProviderOutput, TokenSet, generate_code,
};
pub use storage::{MemoryStorage, Storage};
pub use subject::{Subject, SubjectError, subject_from_parts, subject_id};
pub use token::Ttl;
pub use ui::{CodeCopy, Theme};
pub use verify::{SubjectVerifier, VerifiedSubject};
