use std::sync::Arc;
use std::time::Duration;

use axum::Form;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{IssuerError, ProviderError, error_chain};
use crate::issuer::{AccessRequest, IssuerState, SuccessInput};
use crate::provider::{CodeClaims, CodeProvider, Provider, ProviderOutput, generate_code};
use crate::storage;
use crate::subject::{Subject, subject_id};
use crate::token::StoredSubject;
use crate::ui::{self, CodeNotice};

const ATTEMPT_COOKIE: &str = "vetify_attempt";
const ATTEMPT_TTL: Duration = Duration::from_secs(60 * 60 * 24);
const AUTHORIZATION_CODE_TTL: Duration = Duration::from_secs(60);

/// RFC 6749 §5.1 required headers for token responses.
const TOKEN_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

fn attempt_key(id: &str) -> String {
    format!("attempt:{id}")
}

fn code_key(code: &str) -> String {
    format!("oauth:code:{code}")
}

fn refresh_key(token: &str) -> String {
    format!("oauth:refresh:{token}")
}

/// The client's original request, kept for the whole attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizationRequest {
    client_id: String,
    redirect_uri: String,
    state: Option<String>,
}

/// Per-provider progress within an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProviderState {
    OAuth {
        provider: String,
        state: String,
    },
    Code {
        provider: String,
        claims: CodeClaims,
        code: String,
        /// Unix timestamp (seconds) when the code was sent.
        issued_at: i64,
        /// Wrong guesses so far.
        #[serde(default)]
        failures: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Attempt {
    request: AuthorizationRequest,
    #[serde(default)]
    provider_state: Option<ProviderState>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CodeRecord {
    subject: StoredSubject,
    client_id: String,
    redirect_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshRecord {
    subject: StoredSubject,
    client_id: String,
}

// ============================================================================
// Cookies
// ============================================================================

fn attempt_cookie<S: Subject>(
    issuer: &IssuerState<S>,
    id: String,
) -> Result<Cookie<'static>, IssuerError> {
    let max_age = ATTEMPT_TTL
        .try_into()
        .map_err(|_| IssuerError::Server("attempt lifetime out of range".into()))?;
    Ok(Cookie::build((ATTEMPT_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(issuer.secure_cookies())
        .max_age(max_age)
        .build())
}

fn clear_attempt_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ATTEMPT_COOKIE).path("/"))
}

async fn load_attempt<S: Subject>(
    issuer: &IssuerState<S>,
    jar: &CookieJar,
) -> Result<(String, Attempt), IssuerError> {
    let id = jar
        .get(ATTEMPT_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| IssuerError::InvalidState("no authorization in progress".into()))?;
    let attempt: Attempt = storage::load(issuer.storage.as_ref(), &attempt_key(&id))
        .await?
        .ok_or_else(|| IssuerError::InvalidState("authorization expired".into()))?;
    Ok((id, attempt))
}

async fn save_attempt<S: Subject>(
    issuer: &IssuerState<S>,
    id: &str,
    attempt: &Attempt,
) -> Result<(), IssuerError> {
    storage::save(
        issuer.storage.as_ref(),
        &attempt_key(id),
        attempt,
        Some(ATTEMPT_TTL),
    )
    .await?;
    Ok(())
}

// ============================================================================
// Authorization
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeParams {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    response_type: Option<String>,
    state: Option<String>,
    provider: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, IssuerError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IssuerError::InvalidRequest(format!("missing '{name}' parameter")))
}

/// GET /authorize
pub(crate) async fn authorize<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
    jar: CookieJar,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, IssuerError> {
    let client_id = required(params.client_id, "client_id")?;
    let redirect_uri = required(params.redirect_uri, "redirect_uri")?;

    let response_type = params.response_type.unwrap_or_else(|| "code".to_string());
    if response_type != "code" {
        return Err(IssuerError::InvalidRequest(format!(
            "unsupported response_type '{response_type}'"
        )));
    }
    reqwest::Url::parse(&redirect_uri).map_err(|_| {
        IssuerError::InvalidRequest("redirect_uri must be an absolute URL".into())
    })?;

    let access = AccessRequest {
        client_id,
        redirect_uri,
    };
    if !issuer.policy.allow(&access) {
        log::warn!("Rejected authorization for client '{}'", access.client_id);
        return Err(IssuerError::UnauthorizedClient(access.client_id));
    }

    if let Some(provider) = &params.provider {
        issuer.provider(provider)?;
    }

    let attempt_id = Uuid::new_v4().to_string();
    let attempt = Attempt {
        request: AuthorizationRequest {
            client_id: access.client_id,
            redirect_uri: access.redirect_uri,
            state: params.state,
        },
        provider_state: None,
    };
    save_attempt(&issuer, &attempt_id, &attempt).await?;

    let target = params.provider.or_else(|| match issuer.providers.as_slice() {
        [only] => Some(only.id.clone()),
        _ => None,
    });

    let response = match target {
        Some(provider) => Redirect::to(&format!("/{provider}/authorize")).into_response(),
        None => {
            let entries: Vec<(String, String)> = issuer
                .providers
                .iter()
                .map(|entry| (entry.id.clone(), entry.display.clone()))
                .collect();
            ui::select_page(&issuer.theme, &entries).into_response()
        }
    };
    let jar = jar.add(attempt_cookie(&issuer, attempt_id)?);
    Ok((jar, response).into_response())
}

/// GET /{provider}/authorize
pub(crate) async fn provider_authorize<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Response, IssuerError> {
    let entry = issuer.provider(&provider)?;
    let (attempt_id, mut attempt) = load_attempt(&issuer, &jar).await?;

    match &entry.provider {
        Provider::OAuth(oauth) => {
            let nonce = Uuid::new_v4().to_string();
            attempt.provider_state = Some(ProviderState::OAuth {
                provider: provider.clone(),
                state: nonce.clone(),
            });
            save_attempt(&issuer, &attempt_id, &attempt).await?;

            let url = oauth.authorization_url(&issuer.callback_url(&provider), &nonce);
            Ok(Redirect::to(&url).into_response())
        }
        Provider::Code(code) => {
            Ok(ui::code_start_page(&issuer.theme, &code.copy, &provider, None).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /{provider}/callback
pub(crate) async fn provider_callback<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<Response, IssuerError> {
    let entry = issuer.provider(&provider)?;
    let Provider::OAuth(oauth) = &entry.provider else {
        return Err(IssuerError::InvalidRequest(format!(
            "provider '{provider}' has no callback"
        )));
    };
    let (attempt_id, attempt) = load_attempt(&issuer, &jar).await?;

    if let Some(error) = params.error {
        return Err(ProviderError::Denied { error }.into());
    }

    let state_matches = matches!(
        &attempt.provider_state,
        Some(ProviderState::OAuth { provider: p, state })
            if *p == provider && params.state.as_deref() == Some(state.as_str())
    );
    if !state_matches {
        return Err(IssuerError::InvalidState("state mismatch".into()));
    }

    let code = required(params.code, "code")?;
    let tokens = oauth
        .exchange(&code, &issuer.callback_url(&provider))
        .await?;

    complete(
        &issuer,
        jar,
        &attempt_id,
        attempt,
        &provider,
        ProviderOutput::OAuth(tokens),
    )
    .await
}

#[derive(Debug, Deserialize)]
pub(crate) struct CodeForm {
    action: Option<String>,
    email: Option<String>,
    code: Option<String>,
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// POST /{provider}/authorize
pub(crate) async fn provider_form<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
    Path(provider): Path<String>,
    jar: CookieJar,
    Form(form): Form<CodeForm>,
) -> Result<Response, IssuerError> {
    let entry = issuer.provider(&provider)?;
    let Provider::Code(code_provider) = &entry.provider else {
        return Err(IssuerError::InvalidRequest(format!(
            "provider '{provider}' does not accept form posts"
        )));
    };
    let (attempt_id, mut attempt) = load_attempt(&issuer, &jar).await?;

    let pending = match &attempt.provider_state {
        Some(ProviderState::Code {
            provider: p,
            claims,
            code,
            issued_at,
            failures,
        }) if *p == provider => Some(PendingCode {
            claims: claims.clone(),
            code: code.clone(),
            issued_at: *issued_at,
            failures: *failures,
        }),
        _ => None,
    };
    let flow = CodeFlow {
        issuer: &issuer,
        provider: code_provider,
        provider_id: &provider,
        attempt_id: &attempt_id,
    };

    match form.action.as_deref() {
        Some("request") => {
            let email = form.email.unwrap_or_default().trim().to_string();
            if !looks_like_email(&email) {
                let copy = &code_provider.copy;
                return Ok(ui::code_start_page(
                    &issuer.theme,
                    copy,
                    &provider,
                    Some(&copy.email_invalid),
                )
                .into_response());
            }
            flow.send(attempt, CodeClaims { email }, false).await
        }
        Some("resend") => {
            let pending = pending
                .ok_or_else(|| IssuerError::InvalidState("no code was requested".into()))?;
            flow.send(attempt, pending.claims, true).await
        }
        Some("verify") => {
            let pending = pending
                .ok_or_else(|| IssuerError::InvalidState("no code was requested".into()))?;

            if flow.is_expired(&pending) {
                log::info!("Code for attempt expired before verification");
                return flow.discard(attempt).await;
            }

            let submitted = form.code.unwrap_or_default();
            if submitted.trim() != pending.code {
                let failures = pending.failures + 1;
                if failures >= code_provider.max_attempts {
                    log::warn!("Code discarded after {failures} wrong guesses");
                    return flow.discard(attempt).await;
                }
                attempt.provider_state = Some(ProviderState::Code {
                    provider: provider.clone(),
                    claims: pending.claims,
                    code: pending.code,
                    issued_at: pending.issued_at,
                    failures,
                });
                save_attempt(&issuer, &attempt_id, &attempt).await?;
                return Ok(ui::code_verify_page(
                    &issuer.theme,
                    &code_provider.copy,
                    &provider,
                    CodeNotice::Invalid,
                )
                .into_response());
            }
            complete(
                &issuer,
                jar,
                &attempt_id,
                attempt,
                &provider,
                ProviderOutput::Code(pending.claims),
            )
            .await
        }
        Some(other) => Err(IssuerError::InvalidRequest(format!(
            "unknown action '{other}'"
        ))),
        None => Err(IssuerError::InvalidRequest("missing 'action' field".into())),
    }
}

/// A sent code awaiting verification.
struct PendingCode {
    claims: CodeClaims,
    code: String,
    issued_at: i64,
    failures: u32,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// One step of the code flow for a given attempt.
struct CodeFlow<'a, S: Subject> {
    issuer: &'a IssuerState<S>,
    provider: &'a CodeProvider,
    provider_id: &'a str,
    attempt_id: &'a str,
}

impl<S: Subject> CodeFlow<'_, S> {
    fn is_expired(&self, pending: &PendingCode) -> bool {
        let ttl = i64::try_from(self.provider.code_ttl.as_secs()).unwrap_or(i64::MAX);
        now() >= pending.issued_at.saturating_add(ttl)
    }

    /// Drop the pending code; the user has to request a new one.
    async fn discard(&self, mut attempt: Attempt) -> Result<Response, IssuerError> {
        attempt.provider_state = None;
        save_attempt(self.issuer, self.attempt_id, &attempt).await?;
        let copy = &self.provider.copy;
        Ok(ui::code_start_page(
            &self.issuer.theme,
            copy,
            self.provider_id,
            Some(&copy.code_expired),
        )
        .into_response())
    }

    async fn send(
        &self,
        mut attempt: Attempt,
        claims: CodeClaims,
        resend: bool,
    ) -> Result<Response, IssuerError> {
        let copy = &self.provider.copy;
        let code = generate_code();

        match self.provider.sender.send_code(&claims, &code).await {
            Ok(()) => {
                let page = ui::code_verify_page(
                    &self.issuer.theme,
                    copy,
                    self.provider_id,
                    if resend {
                        CodeNotice::Resent(&claims.email)
                    } else {
                        CodeNotice::Sent(&claims.email)
                    },
                );
                attempt.provider_state = Some(ProviderState::Code {
                    provider: self.provider_id.to_string(),
                    claims,
                    code,
                    issued_at: now(),
                    failures: 0,
                });
                save_attempt(self.issuer, self.attempt_id, &attempt).await?;
                Ok(page.into_response())
            }
            Err(crate::error::SendCodeError::InvalidClaim { key, .. }) => {
                log::info!("Code request rejected: invalid claim '{key}'");
                Ok(ui::code_start_page(
                    &self.issuer.theme,
                    copy,
                    self.provider_id,
                    Some(&copy.email_invalid),
                )
                .into_response())
            }
            Err(e) => {
                log::error!("Code delivery failed: {}", error_chain(&e));
                Err(IssuerError::Server("failed to send verification code".into()))
            }
        }
    }
}

/// Run the success handler and hand an authorization code back to the client.
async fn complete<S: Subject>(
    issuer: &IssuerState<S>,
    jar: CookieJar,
    attempt_id: &str,
    attempt: Attempt,
    provider: &str,
    output: ProviderOutput,
) -> Result<Response, IssuerError> {
    // Claim the attempt before issuing anything; a concurrent completion loses.
    if issuer.storage.take(&attempt_key(attempt_id)).await?.is_none() {
        return Err(IssuerError::InvalidState("authorization already completed".into()));
    }

    let request = attempt.request;
    let input = SuccessInput {
        provider: provider.to_string(),
        client_id: request.client_id.clone(),
        output,
    };

    let subject = issuer.success.success(input).await.map_err(|e| {
        log::error!(
            "Success handler failed for provider '{provider}': {}",
            error_chain(e.as_ref())
        );
        IssuerError::Success(e)
    })?;

    let stored = StoredSubject {
        kind: subject.kind().to_string(),
        properties: subject.properties(),
        id: subject_id(&subject),
    };
    log::info!(
        "Authenticated {} subject {} via '{provider}'",
        stored.kind,
        stored.id
    );

    let mut url = reqwest::Url::parse(&request.redirect_uri)
        .map_err(|_| IssuerError::InvalidRequest("redirect_uri must be an absolute URL".into()))?;
    let code = Uuid::new_v4().to_string();
    url.query_pairs_mut().append_pair("code", &code);
    if let Some(state) = &request.state {
        url.query_pairs_mut().append_pair("state", state);
    }

    let record = CodeRecord {
        subject: stored,
        client_id: request.client_id,
        redirect_uri: request.redirect_uri,
    };
    storage::save(
        issuer.storage.as_ref(),
        &code_key(&code),
        &record,
        Some(AUTHORIZATION_CODE_TTL),
    )
    .await?;

    let response = Redirect::to(url.as_str());
    Ok((clear_attempt_cookie(jar), response).into_response())
}

// ============================================================================
// Token endpoint
// ============================================================================

/// Token request parameters (form-urlencoded).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenRequest {
    grant_type: Option<String>,
    code: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    refresh_token: Option<String>,
}

/// Token response.
#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in: u64,
}

fn check_client(requested: Option<&str>, recorded: &str) -> Result<(), IssuerError> {
    match requested {
        Some(client_id) if client_id != recorded => {
            Err(IssuerError::InvalidGrant("client_id mismatch".into()))
        }
        _ => Ok(()),
    }
}

/// POST /token
pub(crate) async fn token<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
    Form(req): Form<TokenRequest>,
) -> Result<impl IntoResponse, IssuerError> {
    let json = match req.grant_type.as_deref() {
        Some("authorization_code") => {
            let code = required(req.code, "code")?;
            let key = code_key(&code);
            let record: CodeRecord = storage::load(issuer.storage.as_ref(), &key)
                .await?
                .ok_or_else(|| {
                    IssuerError::InvalidGrant("authorization code is invalid or expired".into())
                })?;

            check_client(req.client_id.as_deref(), &record.client_id)?;
            if req.redirect_uri.as_deref() != Some(record.redirect_uri.as_str()) {
                return Err(IssuerError::InvalidGrant("redirect_uri mismatch".into()));
            }
            let record: CodeRecord = consume(&issuer, &key, "authorization code").await?;
            issue_tokens(&issuer, record.subject, record.client_id).await?
        }
        Some("refresh_token") => {
            let token = required(req.refresh_token, "refresh_token")?;
            let key = refresh_key(&token);
            let record: RefreshRecord = storage::load(issuer.storage.as_ref(), &key)
                .await?
                .ok_or_else(|| {
                    IssuerError::InvalidGrant("refresh token is invalid or expired".into())
                })?;

            check_client(req.client_id.as_deref(), &record.client_id)?;
            let record: RefreshRecord = consume(&issuer, &key, "refresh token").await?;
            issue_tokens(&issuer, record.subject, record.client_id).await?
        }
        Some(other) => {
            return Err(IssuerError::UnsupportedGrantType(other.to_string()));
        }
        None => {
            return Err(IssuerError::InvalidRequest(
                "missing 'grant_type' parameter".into(),
            ));
        }
    };
    Ok((TOKEN_HEADERS, json))
}

/// Take a checked grant out of storage; only one request may redeem it.
async fn consume<S: Subject, T: serde::de::DeserializeOwned>(
    issuer: &IssuerState<S>,
    key: &str,
    what: &str,
) -> Result<T, IssuerError> {
    storage::take(issuer.storage.as_ref(), key)
        .await?
        .ok_or_else(|| IssuerError::InvalidGrant(format!("{what} was already used")))
}

async fn issue_tokens<S: Subject>(
    issuer: &IssuerState<S>,
    subject: StoredSubject,
    client_id: String,
) -> Result<Json<TokenResponse>, IssuerError> {
    let ttl = issuer.tokens.ttl();
    let access_token = issuer.tokens.sign_access(&subject, &client_id)?;
    let refresh_token = Uuid::new_v4().to_string();

    storage::save(
        issuer.storage.as_ref(),
        &refresh_key(&refresh_token),
        &RefreshRecord { subject, client_id },
        Some(ttl.refresh),
    )
    .await?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: ttl.access.as_secs(),
    }))
}

/// GET /.well-known/oauth-authorization-server
pub(crate) async fn discovery<S: Subject>(
    State(issuer): State<Arc<IssuerState<S>>>,
) -> Json<Value> {
    let base = &issuer.issuer_url;
    Json(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["none"],
    }))
}
