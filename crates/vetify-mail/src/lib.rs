//! Verification-code email for Vetify.
//!
//! [`CodeMailer`] renders the code template and hands one [`OutgoingEmail`]
//! to a [`Mailer`] transport: [`SmtpMailer`] (lettre) or [`GmailMailer`]
//! (Gmail REST API with a delegated service account).

mod error;
mod gmail;
mod message;
mod smtp;
mod template;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{MailError, Result};
pub use gmail::{GMAIL_SEND_SCOPE, GmailMailer, ServiceAccountKey};
pub use message::OutgoingEmail;
pub use smtp::{SmtpConfig, SmtpMailer};
pub use template::code_email;

/// Subject line of verification-code emails.
pub const CODE_SUBJECT: &str = "O seu código de verificação do Portal Vetify";

/// Delivers one message.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `email`, failing with the transport's error.
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Sends verification codes through a [`Mailer`].
#[derive(Clone)]
pub struct CodeMailer {
    mailer: Arc<dyn Mailer>,
    sender: String,
}

impl CodeMailer {
    /// Send from `"Vetify" <from_email>`.
    pub fn new(mailer: Arc<dyn Mailer>, from_email: &str) -> Self {
        Self {
            mailer,
            sender: format!("\"Vetify\" <{from_email}>"),
        }
    }

    /// Email `code` to `to`.
    pub async fn send_email(&self, to: &str, code: &str) -> Result<()> {
        let email = OutgoingEmail {
            from: self.sender.clone(),
            reply_to: Some(self.sender.clone()),
            to: to.to_string(),
            subject: CODE_SUBJECT.to_string(),
            html: code_email(to, code),
        };
        self.mailer.send(&email).await?;
        log::info!("Verification code email dispatched");
        Ok(())
    }
}
