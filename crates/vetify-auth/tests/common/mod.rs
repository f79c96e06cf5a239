//! Common fixtures and request helpers for Vetify integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tower::ServiceExt;
use vetify_auth::{IssuerParts, VetifySubject, build_issuer};
use vetify_issuer::{
    MemoryStorage, OAuthProvider, Provider, ProviderError, Storage, SubjectVerifier, TokenSet,
    VerifiedSubject,
};
use vetify_mail::{MailError, Mailer, OutgoingEmail};
use vetify_registry::{ClientLookup, ClientRecord};

pub const ISSUER_URL: &str = "https://auth.vetify.co.ao";
pub const SECRET: &str = "integration-secret";
pub const CLIENT_ID: &str = "vetify-portal";
pub const REDIRECT_URI: &str = "https://portal.vetify.co.ao/auth/callback";
pub const FROM_EMAIL: &str = "no-reply@vetify.co.ao";

/// Registry backed by a map; counts lookups.
#[derive(Default)]
pub struct StaticRegistry {
    clients: Mutex<HashMap<String, ClientRecord>>,
    pub lookups: AtomicUsize,
}

impl StaticRegistry {
    pub fn with_client(self, email: &str, name: Option<&str>, fiscal_id: &str) -> Self {
        self.clients.lock().unwrap().insert(
            email.to_string(),
            ClientRecord {
                email: email.to_string(),
                name: name.map(str::to_string),
                fiscal_id: fiscal_id.to_string(),
            },
        );
        self
    }

    /// Drop a client, as if it was deleted from the registry mid-attempt.
    pub fn remove(&self, email: &str) {
        self.clients.lock().unwrap().remove(email);
    }
}

#[async_trait]
impl ClientLookup for StaticRegistry {
    async fn fetch_client(&self, email: &str) -> Option<ClientRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.clients.lock().unwrap().get(email).cloned()
    }
}

/// Mail transport that keeps every message; can be switched to fail.
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl Outbox {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> OutgoingEmail {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }

    /// The six-digit code in the last message.
    pub fn last_code(&self) -> String {
        let html = self.last().html;
        let (_, rest) = html.split_once("Código de verificação: ").unwrap();
        rest.chars().take_while(char::is_ascii_digit).collect()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, email: &OutgoingEmail) -> vetify_mail::Result<()> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Google stand-in: the upstream code names the id_token payload.
///
/// - `"joao"` → email and name
/// - `"ana"` → email only
/// - `"anonymous"` → no email
pub struct ScriptedGoogle;

fn id_token(payload: Value) -> String {
    format!(
        "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

#[async_trait]
impl OAuthProvider for ScriptedGoogle {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        reqwest::Url::parse_with_params(
            "https://accounts.google.com/o/oauth2/v2/auth",
            &[("redirect_uri", redirect_uri), ("state", state)],
        )
        .unwrap()
        .to_string()
    }

    async fn exchange(&self, code: &str, _redirect_uri: &str) -> Result<TokenSet, ProviderError> {
        let payload = match code {
            "joao" => json!({
                "sub": "1001",
                "email": "joao@vetify.co.ao",
                "email_verified": true,
                "name": "João Silva",
                "hd": "vetify.co.ao",
            }),
            "ana" => json!({"sub": "1002", "email": "ana@vetify.co.ao"}),
            "anonymous" => json!({"sub": "1003"}),
            _ => return Err(ProviderError::Rejected { status: 400 }),
        };
        TokenSet::from_raw(json!({
            "access_token": "ya29.upstream",
            "id_token": id_token(payload),
            "expires_in": 3599,
        }))
    }
}

/// The assembled Vetify issuer plus handles on its fakes.
pub struct TestHarness {
    pub router: Router,
    pub registry: Arc<StaticRegistry>,
    pub outbox: Arc<Outbox>,
}

impl TestHarness {
    /// Issuer with one registered client, `a@x.com`.
    pub fn new() -> Self {
        Self::with(
            StaticRegistry::default().with_client("a@x.com", Some("Ana Lda"), "5417000001"),
            Outbox::default(),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Issuer whose mail transport fails every send.
    pub fn failing_mail() -> Self {
        Self::with(
            StaticRegistry::default().with_client("a@x.com", None, "5417000001"),
            Outbox {
                fail: true,
                ..Outbox::default()
            },
            Arc::new(MemoryStorage::new()),
        )
    }

    pub fn with(registry: StaticRegistry, outbox: Outbox, storage: Arc<dyn Storage>) -> Self {
        let registry = Arc::new(registry);
        let outbox = Arc::new(outbox);
        let issuer = build_issuer(IssuerParts {
            issuer_url: ISSUER_URL.to_string(),
            signing_secret: SECRET.to_string(),
            client_id_prefix: "vetify-".to_string(),
            registry: registry.clone(),
            mailer: outbox.clone(),
            from_email: FROM_EMAIL.to_string(),
            google: Provider::oauth(ScriptedGoogle),
            storage,
        })
        .unwrap();

        Self {
            router: issuer.router(),
            registry,
            outbox,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, form: &str) -> Response<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(req.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Start an authorization for `provider` and return the attempt cookie.
    pub async fn start(&self, provider: &str) -> String {
        let uri = format!(
            "/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=code&state=st4te&provider={provider}",
            encode(REDIRECT_URI)
        );
        let resp = self.get(&uri, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        attempt_cookie(&resp).expect("authorize should set the attempt cookie")
    }

    /// Request a code for `email`; returns the cookie and the response.
    pub async fn request_code(&self, email: &str) -> (String, Response<Body>) {
        let cookie = self.start("code").await;
        let resp = self
            .post_form(
                "/code/authorize",
                Some(&cookie),
                &format!("action=request&email={}", encode(email)),
            )
            .await;
        (cookie, resp)
    }

    /// Submit `code` for the attempt behind `cookie`.
    pub async fn verify_code(&self, cookie: &str, code: &str) -> Response<Body> {
        self.post_form(
            "/code/authorize",
            Some(cookie),
            &format!("action=verify&code={code}"),
        )
        .await
    }

    /// Run Google login with the scripted upstream `code`.
    pub async fn google_login(&self, upstream_code: &str) -> Response<Body> {
        let cookie = self.start("google").await;
        let resp = self.get("/google/authorize", Some(&cookie)).await;
        let state = query_param(&location(&resp), "state").unwrap();
        self.get(
            &format!("/google/callback?code={upstream_code}&state={state}"),
            Some(&cookie),
        )
        .await
    }

    /// Exchange an authorization code and return the token response body.
    pub async fn exchange(&self, code: &str) -> Response<Body> {
        self.post_form(
            "/token",
            None,
            &format!(
                "grant_type=authorization_code&code={code}&client_id={CLIENT_ID}&redirect_uri={}",
                encode(REDIRECT_URI)
            ),
        )
        .await
    }

    /// Exchange the code carried by a completed login redirect and verify the access token.
    pub async fn redeem(&self, login: Response<Body>) -> VerifiedSubject<VetifySubject> {
        assert_eq!(login.status(), StatusCode::SEE_OTHER);
        let code = query_param(&location(&login), "code").unwrap();
        let resp = self.exchange(&code).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens = body_json(resp).await;
        verifier()
            .verify(tokens["access_token"].as_str().unwrap())
            .unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifier matching the harness issuer.
pub fn verifier() -> SubjectVerifier<VetifySubject> {
    SubjectVerifier::new(ISSUER_URL, SECRET.as_bytes()).with_audience(&[CLIENT_ID])
}

/// Percent-encode a query value.
pub fn encode(value: &str) -> String {
    reqwest::Url::parse_with_params("http://x/", &[("v", value)])
        .unwrap()
        .query()
        .unwrap()
        .trim_start_matches("v=")
        .to_string()
}

/// `name=value` of the attempt cookie set by a response, if any.
pub fn attempt_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("vetify_attempt="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("response should redirect")
        .to_str()
        .unwrap()
        .to_string()
}

/// Value of a query parameter in a redirect location.
pub fn query_param(location: &str, name: &str) -> Option<String> {
    reqwest::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
