//! Wiring the issuer: providers, access policy, success routing, theme.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vetify_issuer::{
    AccessPolicy, AccessRequest, BoxError, CodeProvider, Issuer, MemoryStorage, Provider,
    ProviderOutput, Storage, SuccessHandler, SuccessInput, Theme, Ttl,
};
use vetify_issuer_google::GoogleProvider;
use vetify_mail::{CodeMailer, GmailMailer, Mailer, ServiceAccountKey, SmtpMailer};
use vetify_registry::{ClientLookup, VendusClient};

use crate::config::{MailSettings, Settings};
use crate::customers::{CustomerClaims, CustomerCodeSender, customer_copy, map_customer};
use crate::employees::map_employee;
use crate::error::{MapError, StartupError};
use crate::subjects::VetifySubject;

/// Provider id of the customer code flow.
pub const CODE_PROVIDER: &str = "code";
/// Provider id of the employee Google flow.
pub const GOOGLE_PROVIDER: &str = "google";

const CODE_LABEL: &str = "Revendedores";
const GOOGLE_LABEL: &str = "Funcionários";

const DAY: u64 = 60 * 60 * 24;

/// Access 30 days, refresh 365 days.
pub fn vetify_ttl() -> Ttl {
    Ttl {
        access: Duration::from_secs(30 * DAY),
        refresh: Duration::from_secs(365 * DAY),
    }
}

/// Look of the hosted login pages.
pub fn vetify_theme() -> Theme {
    Theme {
        title: "Vetify".to_string(),
        radius: "full".to_string(),
        background: "#F3F5F7".to_string(),
        primary: "#207697".to_string(),
        logo: Some("https://www.vetify.co.ao/images/vetify/vetify_logo.svg".to_string()),
        favicon: Some("https://www.vetify.co.ao/images/vetify/vetify_icone.svg".to_string()),
    }
}

/// Accepts clients whose id starts with a fixed prefix.
#[derive(Debug, Clone)]
pub struct ClientIdPrefix(pub String);

impl AccessPolicy for ClientIdPrefix {
    fn allow(&self, request: &AccessRequest) -> bool {
        request.client_id.starts_with(&self.0)
    }
}

/// Routes a completed provider flow to the mapper for its subject kind.
pub struct SuccessRouter {
    registry: Arc<dyn ClientLookup>,
}

impl SuccessRouter {
    /// Create a router that re-checks customers against `registry`.
    pub fn new(registry: Arc<dyn ClientLookup>) -> Self {
        Self { registry }
    }

    /// Map a provider result to a subject.
    pub async fn route(
        &self,
        provider: &str,
        output: ProviderOutput,
    ) -> Result<VetifySubject, MapError> {
        match (provider, output) {
            (GOOGLE_PROVIDER, ProviderOutput::OAuth(tokens)) => map_employee(&tokens),
            (CODE_PROVIDER, ProviderOutput::Code(claims)) => {
                map_customer(self.registry.as_ref(), &CustomerClaims::from(claims)).await
            }
            (GOOGLE_PROVIDER, _) => Err(MapError::claim_extraction(
                "employee",
                "expected an OAuth token set",
            )),
            (CODE_PROVIDER, _) => Err(MapError::claim_extraction(
                "customer",
                "expected code claims",
            )),
            (other, _) => Err(MapError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[async_trait]
impl SuccessHandler<VetifySubject> for SuccessRouter {
    async fn success(&self, input: SuccessInput) -> Result<VetifySubject, BoxError> {
        let subject = self.route(&input.provider, input.output).await?;
        log::info!(
            "Issuing {} subject for client {}",
            vetify_issuer::Subject::kind(&subject),
            input.client_id
        );
        Ok(subject)
    }
}

/// Everything the issuer is built from, with external services injectable.
pub struct IssuerParts {
    /// Public base URL.
    pub issuer_url: String,
    /// Access-token signing secret.
    pub signing_secret: String,
    /// Access policy prefix.
    pub client_id_prefix: String,
    /// Client registry.
    pub registry: Arc<dyn ClientLookup>,
    /// Mail transport.
    pub mailer: Arc<dyn Mailer>,
    /// Sender address for verification emails.
    pub from_email: String,
    /// Employee OAuth provider.
    pub google: Provider,
    /// Key-value storage.
    pub storage: Arc<dyn Storage>,
}

/// Assemble the Vetify issuer.
pub fn build_issuer(parts: IssuerParts) -> Result<Issuer<VetifySubject>, StartupError> {
    let sender = CustomerCodeSender::new(
        parts.registry.clone(),
        CodeMailer::new(parts.mailer, &parts.from_email),
    );
    let code = CodeProvider::new(Arc::new(sender)).with_copy(customer_copy());

    let issuer = Issuer::builder()
        .issuer_url(parts.issuer_url)
        .provider(CODE_PROVIDER, CODE_LABEL, Provider::code(code))
        .provider(GOOGLE_PROVIDER, GOOGLE_LABEL, parts.google)
        .allow(ClientIdPrefix(parts.client_id_prefix))
        .success(SuccessRouter::new(parts.registry))
        .storage(parts.storage)
        .signing_secret(parts.signing_secret)
        .ttl(vetify_ttl())
        .theme(vetify_theme())
        .build()?;
    Ok(issuer)
}

fn mailer_from(settings: &MailSettings) -> Result<Arc<dyn Mailer>, StartupError> {
    let mailer: Arc<dyn Mailer> = match settings {
        MailSettings::Smtp(config) => {
            log::info!("Sending codes through SMTP relay {}:{}", config.host, config.port);
            Arc::new(SmtpMailer::new(config)?)
        }
        MailSettings::Gmail {
            credentials,
            sender,
        } => {
            log::info!("Sending codes through the Gmail API as {sender}");
            let key = ServiceAccountKey::from_file(credentials)?;
            Arc::new(GmailMailer::new(key, sender.clone())?)
        }
    };
    Ok(mailer)
}

/// Build the production issuer from validated settings.
pub fn from_settings(settings: Settings) -> Result<Issuer<VetifySubject>, StartupError> {
    let storage = MemoryStorage::persisted(&settings.storage_path)?;
    log::info!("Storage persisted at {}", settings.storage_path.display());

    let registry = VendusClient::new(settings.vendus_api_key)
        .with_base_url(settings.vendus_url)
        .with_timeout(settings.registry_timeout)
        .with_retries(settings.registry_retries);

    let google = GoogleProvider::new(settings.google_client_id, settings.google_secret);

    build_issuer(IssuerParts {
        issuer_url: settings.issuer_url,
        signing_secret: settings.signing_secret,
        client_id_prefix: settings.client_id_prefix,
        registry: Arc::new(registry),
        mailer: mailer_from(&settings.mail)?,
        from_email: settings.from_email,
        google: Provider::oauth(google),
        storage: Arc::new(storage),
    })
}
