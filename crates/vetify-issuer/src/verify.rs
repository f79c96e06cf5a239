//! Access-token verification for downstream services.

use std::marker::PhantomData;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::error::AuthError;
use crate::subject::Subject;
use crate::token::{ACCESS_MODE, AccessClaims};

/// A subject recovered from a valid access token.
#[derive(Debug, Clone)]
pub struct VerifiedSubject<S> {
    /// The token's `sub` claim.
    pub id: String,
    /// The client the token was issued to (`aud`).
    pub client_id: String,
    /// The typed subject.
    pub subject: S,
}

/// Verifies access tokens signed by the issuer.
pub struct SubjectVerifier<S> {
    decoding_key: DecodingKey,
    validation: Validation,
    _subject: PhantomData<fn() -> S>,
}

impl<S: Subject> SubjectVerifier<S> {
    /// Create a verifier for tokens from `issuer` signed with `secret`.
    pub fn new(issuer: &str, secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            _subject: PhantomData,
        }
    }

    /// Only accept tokens issued to one of `client_ids`.
    pub fn with_audience(mut self, client_ids: &[&str]) -> Self {
        self.validation.set_audience(client_ids);
        self.validation.validate_aud = true;
        self
    }

    /// Verify `token` and decode its subject.
    pub fn verify(&self, token: &str) -> Result<VerifiedSubject<S>, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidSignature(e.to_string())
                }
                _ => AuthError::InvalidFormat(e.to_string()),
            },
        )?;

        let claims = data.claims;
        if claims.mode != ACCESS_MODE {
            return Err(AuthError::WrongMode(claims.mode));
        }

        let subject = S::from_parts(&claims.kind, claims.properties)
            .map_err(|e| AuthError::InvalidSubject(e.to_string()))?;

        Ok(VerifiedSubject {
            id: claims.sub,
            client_id: claims.aud,
            subject,
        })
    }
}
