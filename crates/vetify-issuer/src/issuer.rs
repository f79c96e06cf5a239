//! Issuer assembly: providers, policy, success routing, lifetimes, storage.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::routing::{get, post};

use crate::error::{BoxError, IssuerError};
use crate::handlers;
use crate::provider::{Provider, ProviderOutput};
use crate::storage::{MemoryStorage, Storage};
use crate::subject::Subject;
use crate::token::{TokenService, Ttl};
use crate::ui::Theme;

/// The client-facing part of an authorization request, seen by the access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Requesting client identifier.
    pub client_id: String,
    /// Where the client wants the authorization code delivered.
    pub redirect_uri: String,
}

/// Decides whether a client may start an authorization.
pub trait AccessPolicy: Send + Sync + 'static {
    /// Return `true` to accept the request.
    fn allow(&self, request: &AccessRequest) -> bool;
}

impl<F> AccessPolicy for F
where
    F: Fn(&AccessRequest) -> bool + Send + Sync + 'static,
{
    fn allow(&self, request: &AccessRequest) -> bool {
        self(request)
    }
}

/// Input handed to the success handler once a provider flow completes.
#[derive(Debug, Clone)]
pub struct SuccessInput {
    /// Identifier of the provider that completed.
    pub provider: String,
    /// Client the authorization was started for.
    pub client_id: String,
    /// Provider-specific result.
    pub output: ProviderOutput,
}

/// Maps a completed provider flow to a subject.
#[async_trait]
pub trait SuccessHandler<S: Subject>: Send + Sync + 'static {
    /// Produce the subject to issue, or fail the attempt.
    async fn success(&self, input: SuccessInput) -> Result<S, BoxError>;
}

pub(crate) struct ProviderEntry {
    pub id: String,
    pub display: String,
    pub provider: Provider,
}

/// Shared state behind the issuer routes.
pub(crate) struct IssuerState<S: Subject> {
    pub issuer_url: String,
    pub providers: Vec<ProviderEntry>,
    pub policy: Box<dyn AccessPolicy>,
    pub success: Box<dyn SuccessHandler<S>>,
    pub storage: Arc<dyn Storage>,
    pub tokens: TokenService,
    pub theme: Theme,
}

impl<S: Subject> IssuerState<S> {
    pub fn provider(&self, id: &str) -> Result<&ProviderEntry, IssuerError> {
        self.providers
            .iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| IssuerError::UnknownProvider(id.to_string()))
    }

    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/{provider}/callback", self.issuer_url)
    }

    pub fn secure_cookies(&self) -> bool {
        self.issuer_url.starts_with("https://")
    }
}

/// An assembled issuer.
pub struct Issuer<S: Subject> {
    state: Arc<IssuerState<S>>,
}

impl<S: Subject> Issuer<S> {
    /// Start building an issuer.
    pub fn builder() -> IssuerBuilder<S> {
        IssuerBuilder::new()
    }

    /// Public base URL.
    pub fn issuer_url(&self) -> &str {
        &self.state.issuer_url
    }

    /// Registered providers as `(id, display)` pairs, in registration order.
    pub fn providers(&self) -> Vec<(&str, &str)> {
        self.state
            .providers
            .iter()
            .map(|entry| (entry.id.as_str(), entry.display.as_str()))
            .collect()
    }

    /// Token lifetimes.
    pub fn ttl(&self) -> Ttl {
        self.state.tokens.ttl()
    }

    /// Build the axum router serving the issuer endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/authorize", get(handlers::authorize::<S>))
            .route(
                "/{provider}/authorize",
                get(handlers::provider_authorize::<S>).post(handlers::provider_form::<S>),
            )
            .route("/{provider}/callback", get(handlers::provider_callback::<S>))
            .route("/token", post(handlers::token::<S>))
            .route(
                "/.well-known/oauth-authorization-server",
                get(handlers::discovery::<S>),
            )
            .with_state(self.state.clone())
    }
}

/// Builder for [`Issuer`].
pub struct IssuerBuilder<S: Subject> {
    issuer_url: String,
    providers: Vec<ProviderEntry>,
    policy: Option<Box<dyn AccessPolicy>>,
    success: Option<Box<dyn SuccessHandler<S>>>,
    storage: Option<Arc<dyn Storage>>,
    signing_secret: Option<Vec<u8>>,
    ttl: Ttl,
    theme: Theme,
}

impl<S: Subject> IssuerBuilder<S> {
    fn new() -> Self {
        Self {
            issuer_url: "http://localhost:3000".to_string(),
            providers: Vec::new(),
            policy: None,
            success: None,
            storage: None,
            signing_secret: None,
            ttl: Ttl::default(),
            theme: Theme::default(),
        }
    }

    /// Public base URL (the `iss` claim and the callback prefix).
    pub fn issuer_url(mut self, url: impl Into<String>) -> Self {
        self.issuer_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Register a provider under `id` with a display label for the select page.
    pub fn provider(
        mut self,
        id: impl Into<String>,
        display: impl Into<String>,
        provider: Provider,
    ) -> Self {
        self.providers.push(ProviderEntry {
            id: id.into(),
            display: display.into(),
            provider,
        });
        self
    }

    /// Access policy (required).
    pub fn allow(mut self, policy: impl AccessPolicy) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Success handler (required).
    pub fn success(mut self, handler: impl SuccessHandler<S>) -> Self {
        self.success = Some(Box::new(handler));
        self
    }

    /// Storage; defaults to a non-persisted [`MemoryStorage`].
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// HS256 secret for access tokens (required).
    pub fn signing_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Token lifetimes.
    pub fn ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Theme for hosted pages.
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Validate and assemble the issuer.
    pub fn build(self) -> Result<Issuer<S>, IssuerError> {
        if self.providers.is_empty() {
            return Err(IssuerError::Config("at least one provider is required".into()));
        }
        for (i, entry) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|other| other.id == entry.id) {
                return Err(IssuerError::Config(format!(
                    "provider '{}' registered twice",
                    entry.id
                )));
            }
        }

        let policy = self
            .policy
            .ok_or_else(|| IssuerError::Config("an access policy is required".into()))?;
        let success = self
            .success
            .ok_or_else(|| IssuerError::Config("a success handler is required".into()))?;
        let secret = self
            .signing_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| IssuerError::Config("a signing secret is required".into()))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        log::info!(
            "Issuer assembled at {} with providers [{}]",
            self.issuer_url,
            self.providers
                .iter()
                .map(|entry| entry.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Issuer {
            state: Arc::new(IssuerState {
                tokens: TokenService::new(self.issuer_url.clone(), &secret, self.ttl),
                issuer_url: self.issuer_url,
                providers: self.providers,
                policy,
                success,
                storage,
                theme: self.theme,
            }),
        })
    }
}
