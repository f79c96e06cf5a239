//! Tower middleware verifying issued subject tokens.
//!
//! `SubjectLayer` and `SubjectService` wrap any inner service with access
//! token verification. Downstream applications mount the layer and read the
//! [`VerifiedSubject`] from request extensions.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use tower::{Layer, Service};

use crate::subject::Subject;
use crate::verify::{SubjectVerifier, VerifiedSubject};

/// Tower `Layer` that wraps services with subject-token verification.
pub struct SubjectLayer<S> {
    verifier: Arc<SubjectVerifier<S>>,
}

impl<S> Clone for SubjectLayer<S> {
    fn clone(&self) -> Self {
        Self {
            verifier: self.verifier.clone(),
        }
    }
}

impl<S: Subject> SubjectLayer<S> {
    /// Create a new layer with the given verifier.
    pub fn new(verifier: Arc<SubjectVerifier<S>>) -> Self {
        Self { verifier }
    }
}

impl<S: Subject, Inner> Layer<Inner> for SubjectLayer<S> {
    type Service = SubjectService<S, Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        SubjectService {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

/// Tower `Service` that verifies bearer tokens before forwarding requests.
///
/// On success, inserts [`VerifiedSubject`] into request extensions.
pub struct SubjectService<S, Inner> {
    inner: Inner,
    verifier: Arc<SubjectVerifier<S>>,
}

impl<S, Inner: Clone> Clone for SubjectService<S, Inner> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

impl<S, Inner> Service<Request<Body>> for SubjectService<S, Inner>
where
    S: Subject,
    Inner: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    Inner::Response: IntoResponse,
    Inner::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let verified = match extract_bearer_token(&req) {
            Some(token) => self.verifier.verify(token).map_err(|e| e.to_string()),
            None => Err("missing or invalid bearer token".to_string()),
        };

        Box::pin(async move {
            match verified {
                Ok(subject) => {
                    req.extensions_mut().insert::<VerifiedSubject<S>>(subject);
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Err(message) => {
                    log::warn!("Subject verification failed: {message}");
                    Ok(unauthorized_response(&message))
                }
            }
        })
    }
}

/// Extract bearer token from the Authorization header.
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Build a 401 Unauthorized response.
fn unauthorized_response(message: &str) -> axum::response::Response {
    let body = serde_json::json!({
        "error": "invalid_token",
        "error_description": message,
    });

    (
        StatusCode::UNAUTHORIZED,
        [
            (http::header::CONTENT_TYPE, "application/json"),
            (http::header::WWW_AUTHENTICATE, r#"Bearer error="invalid_token""#),
        ],
        body.to_string(),
    )
        .into_response()
}
