//! Customer login through an emailed one-time code.
//!
//! The claimed email must resolve to exactly one client in the registry,
//! once when the code is requested and again when the subject is built.

use std::sync::Arc;

use async_trait::async_trait;
use vetify_issuer::{CodeClaims, CodeCopy, CodeSender, SendCodeError};
use vetify_mail::CodeMailer;
use vetify_registry::ClientLookup;

use crate::error::{MapError, Result};
use crate::subjects::{CustomerSubject, VetifySubject};

const KIND: &str = "customer";

/// Claims collected by the code flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerClaims {
    /// The email the customer typed and proved access to.
    pub email: String,
}

impl From<CodeClaims> for CustomerClaims {
    fn from(claims: CodeClaims) -> Self {
        Self {
            email: claims.email,
        }
    }
}

/// Delivers codes to registered customers only.
pub struct CustomerCodeSender {
    registry: Arc<dyn ClientLookup>,
    mailer: CodeMailer,
}

impl CustomerCodeSender {
    /// Create a sender checking `registry` and mailing through `mailer`.
    pub fn new(registry: Arc<dyn ClientLookup>, mailer: CodeMailer) -> Self {
        Self { registry, mailer }
    }
}

#[async_trait]
impl CodeSender for CustomerCodeSender {
    async fn send_code(
        &self,
        claims: &CodeClaims,
        code: &str,
    ) -> std::result::Result<(), SendCodeError> {
        let Some(client) = self.registry.fetch_client(&claims.email).await else {
            return Err(SendCodeError::invalid_claim("email", &claims.email));
        };

        self.mailer
            .send_email(&client.email, code)
            .await
            .map_err(SendCodeError::delivery)
    }
}

/// Map verified code claims to a customer subject from the registry record.
pub async fn map_customer(
    registry: &dyn ClientLookup,
    claims: &CustomerClaims,
) -> Result<VetifySubject> {
    let client = registry
        .fetch_client(&claims.email)
        .await
        .ok_or_else(|| MapError::claim_extraction(KIND, "no unique registry client"))?;

    Ok(VetifySubject::Customer(CustomerSubject {
        email: client.email,
        name: client.name,
        fiscal_id: client.fiscal_id,
    }))
}

/// Portuguese copy for the code pages.
pub fn customer_copy() -> CodeCopy {
    CodeCopy {
        code_info: "Caso o email seja válido, você receberá um código de verificação."
            .to_string(),
        code_invalid: "Código inválido".to_string(),
        code_expired: "Código expirado. Peça um novo código.".to_string(),
        code_resend: "Reenviar código".to_string(),
        code_sent: "Código enviado para: ".to_string(),
        code_resent: "Código reenviado para: ".to_string(),
        email_invalid: "Email inválido".to_string(),
        email_placeholder: "Email".to_string(),
        code_placeholder: "Código".to_string(),
        button_continue: "Continuar".to_string(),
    }
}
