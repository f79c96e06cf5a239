//! Vendus `GET /ws/clients/?api_key=…&q=…` client.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use serde_json::Value;

use crate::ClientLookup;
use crate::error::{LookupError, Result};
use crate::record::ClientRecord;

/// Production registry endpoint.
pub const DEFAULT_VENDUS_URL: &str = "https://www.vendus.co.ao/ws/clients/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Registry client for the Vendus clients endpoint.
///
/// Each lookup is one GET with a per-call timeout; a transport failure is
/// retried at most once when configured. The API key never appears in logs
/// or errors.
pub struct VendusClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    retries: usize,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for VendusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendusClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

impl VendusClient {
    /// Create a client for the production endpoint with a 10s timeout and one retry.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_VENDUS_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            retries: 1,
            http_client: http_client(DEFAULT_TIMEOUT),
        }
    }

    /// Use another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.http_client = http_client(timeout);
        self
    }

    /// Retries after a transport failure; capped at one.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries.min(1);
        self
    }

    /// Resolve `email` to exactly one registry record.
    pub async fn lookup(&self, email: &str) -> Result<ClientRecord> {
        let backoff = ConstantBuilder::default()
            .with_delay(RETRY_DELAY)
            .with_max_times(self.retries);

        (|| self.request(email))
            .retry(backoff)
            .when(LookupError::is_retryable)
            .notify(|err: &LookupError, delay: Duration| {
                log::warn!("Registry lookup failed ({err}), retrying in {delay:?}");
            })
            .await
    }

    async fn request(&self, email: &str) -> Result<ClientRecord> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("api_key", self.api_key.as_str()), ("q", email)])
            .send()
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.without_url().to_string()))?;
        parse_clients(body)
    }
}

/// Interpret a clients response: an `errors` object, or an array of records.
fn parse_clients(body: Value) -> Result<ClientRecord> {
    if let Some(errors) = body.get("errors") {
        return Err(LookupError::Upstream(errors.to_string()));
    }

    let Value::Array(records) = body else {
        return Err(LookupError::InvalidResponse(
            "expected an array of clients".to_string(),
        ));
    };

    match records.len() {
        0 => Err(LookupError::NotFound),
        1 => records
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound)
            .and_then(|record| {
                serde_json::from_value(record)
                    .map_err(|e| LookupError::InvalidResponse(e.to_string()))
            }),
        count => Err(LookupError::Ambiguous { count }),
    }
}

#[async_trait]
impl ClientLookup for VendusClient {
    async fn fetch_client(&self, email: &str) -> Option<ClientRecord> {
        match self.lookup(email).await {
            Ok(record) => Some(record),
            Err(LookupError::NotFound) => {
                log::info!("Registry lookup matched no client");
                None
            }
            Err(e) => {
                log::error!("Registry lookup failed: {e}");
                None
            }
        }
    }
}
