//! Service configuration from the environment.
//!
//! Every setting is read from its environment variable and may also be given
//! as a flag. [`Config::validate`] checks the whole set eagerly so a missing
//! credential fails startup rather than the first login.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use vetify_mail::SmtpConfig;
use vetify_registry::DEFAULT_VENDUS_URL;

use crate::error::ConfigError;

/// How verification emails leave the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmailTransport {
    /// Authenticated SMTP relay.
    Smtp,
    /// Gmail REST API with a delegated service account.
    Gmail,
}

/// Raw configuration as read from flags and environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "vetify-auth", version, about = "Vetify identity issuer")]
pub struct Config {
    /// Public base URL of the issuer.
    #[arg(long, env = "ISSUER_URL", default_value = "http://localhost:3000")]
    pub issuer_url: String,

    /// Listen address.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// HS256 secret for access tokens.
    #[arg(long, env = "ISSUER_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// Client ids must start with this prefix.
    #[arg(long, env = "CLIENT_ID_PREFIX", default_value = "vetify-")]
    pub client_id_prefix: String,

    /// Persisted storage file.
    #[arg(long, env = "STORAGE_PATH", default_value = "/tmp/persist.json")]
    pub storage_path: PathBuf,

    /// Google OAuth client id.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret.
    #[arg(long, env = "GOOGLE_SECRET", hide_env_values = true)]
    pub google_secret: Option<String>,

    /// Vendus API key.
    #[arg(long, env = "VENDUS_API_KEY", hide_env_values = true)]
    pub vendus_api_key: Option<String>,

    /// Vendus clients endpoint.
    #[arg(long, env = "VENDUS_URL", default_value = DEFAULT_VENDUS_URL)]
    pub vendus_url: String,

    /// Registry call timeout in seconds.
    #[arg(long, env = "REGISTRY_TIMEOUT_SECS", default_value_t = 10)]
    pub registry_timeout_secs: u64,

    /// Retries after a registry transport failure (0 or 1).
    #[arg(
        long,
        env = "REGISTRY_RETRIES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=1)
    )]
    pub registry_retries: u8,

    /// Email transport.
    #[arg(long, env = "EMAIL_TRANSPORT", value_enum, default_value_t = EmailTransport::Smtp)]
    pub email_transport: EmailTransport,

    /// Sender address for verification emails.
    #[arg(long, env = "FROM_EMAIL", default_value = "no-reply@vetify.co.ao")]
    pub from_email: String,

    /// SMTP relay host.
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP relay port.
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,

    /// Implicit TLS (otherwise STARTTLS).
    #[arg(
        long,
        env = "SMTP_SECURE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub smtp_secure: bool,

    /// SMTP user.
    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    /// SMTP password.
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// SMTP timeout in seconds.
    #[arg(long, env = "SMTP_TIMEOUT_SECS", default_value_t = 30)]
    pub smtp_timeout_secs: u64,

    /// Service-account key file for the Gmail transport.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub google_application_credentials: Option<PathBuf>,

    /// Mailbox the Gmail transport sends as.
    #[arg(long, env = "GMAIL_SENDER")]
    pub gmail_sender: Option<String>,

    /// Raise the default log level to debug.
    #[arg(long, env = "DEBUG", default_value_t = false, action = clap::ArgAction::Set)]
    pub debug: bool,
}

/// Validated mail transport settings.
#[derive(Debug, Clone)]
pub enum MailSettings {
    /// SMTP relay.
    Smtp(SmtpConfig),
    /// Gmail API.
    Gmail {
        /// Service-account key file.
        credentials: PathBuf,
        /// Impersonated mailbox.
        sender: String,
    },
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Public base URL.
    pub issuer_url: String,
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// Access-token signing secret.
    pub signing_secret: String,
    /// Access policy prefix.
    pub client_id_prefix: String,
    /// Storage file.
    pub storage_path: PathBuf,
    /// Google OAuth client id.
    pub google_client_id: String,
    /// Google OAuth client secret.
    pub google_secret: String,
    /// Vendus API key.
    pub vendus_api_key: String,
    /// Vendus endpoint.
    pub vendus_url: String,
    /// Registry call timeout.
    pub registry_timeout: Duration,
    /// Registry retries.
    pub registry_retries: usize,
    /// Sender address.
    pub from_email: String,
    /// Mail transport.
    pub mail: MailSettings,
}

fn require(
    value: &Option<String>,
    var: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(var);
            String::new()
        }
    }
}

impl Config {
    /// Check the configuration and resolve transport settings.
    ///
    /// All missing variables are reported together.
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let mut missing = Vec::new();

        let signing_secret = require(&self.signing_secret, "ISSUER_SIGNING_SECRET", &mut missing);
        let google_client_id = require(&self.google_client_id, "GOOGLE_CLIENT_ID", &mut missing);
        let google_secret = require(&self.google_secret, "GOOGLE_SECRET", &mut missing);
        let vendus_api_key = require(&self.vendus_api_key, "VENDUS_API_KEY", &mut missing);

        let mail = match self.email_transport {
            EmailTransport::Smtp => {
                let username = require(&self.smtp_username, "SMTP_USERNAME", &mut missing);
                let password = require(&self.smtp_password, "SMTP_PASSWORD", &mut missing);
                MailSettings::Smtp(SmtpConfig {
                    host: self.smtp_host.clone(),
                    port: self.smtp_port,
                    secure: self.smtp_secure,
                    username,
                    password,
                    timeout: Duration::from_secs(self.smtp_timeout_secs),
                })
            }
            EmailTransport::Gmail => {
                let credentials = self
                    .google_application_credentials
                    .clone()
                    .filter(|path| !path.as_os_str().is_empty());
                if credentials.is_none() {
                    missing.push("GOOGLE_APPLICATION_CREDENTIALS");
                }
                let sender = require(&self.gmail_sender, "GMAIL_SENDER", &mut missing);
                MailSettings::Gmail {
                    credentials: credentials.unwrap_or_default(),
                    sender,
                }
            }
        };

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let issuer_url = self.issuer_url.trim_end_matches('/').to_string();
        if !(issuer_url.starts_with("http://") || issuer_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "ISSUER_URL",
                format!("'{issuer_url}' is not an http(s) URL"),
            ));
        }
        if self.client_id_prefix.is_empty() {
            return Err(ConfigError::invalid("CLIENT_ID_PREFIX", "must not be empty"));
        }
        if !self.from_email.contains('@') {
            return Err(ConfigError::invalid(
                "FROM_EMAIL",
                format!("'{}' is not an email address", self.from_email),
            ));
        }

        Ok(Settings {
            issuer_url,
            bind_addr: self.bind_addr,
            signing_secret,
            client_id_prefix: self.client_id_prefix,
            storage_path: self.storage_path,
            google_client_id,
            google_secret,
            vendus_api_key,
            vendus_url: self.vendus_url,
            registry_timeout: Duration::from_secs(self.registry_timeout_secs),
            registry_retries: usize::from(self.registry_retries),
            from_email: self.from_email,
            mail,
        })
    }
}
