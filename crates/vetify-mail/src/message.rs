//! Transport-neutral message and its RFC 5322 rendering.

use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;

use crate::error::{MailError, Result};

/// An HTML email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender mailbox, e.g. `"Vetify" <no-reply@vetify.co.ao>`.
    pub from: String,
    /// Reply-To mailbox.
    pub reply_to: Option<String>,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

impl OutgoingEmail {
    /// Build the lettre message.
    pub fn to_message(&self) -> Result<Message> {
        let mut builder = Message::builder()
            .from(mailbox(&self.from)?)
            .to(mailbox(&self.to)?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(mailbox(reply_to)?);
        }
        builder
            .body(self.html.clone())
            .map_err(|e| MailError::Message(e.to_string()))
    }
}
