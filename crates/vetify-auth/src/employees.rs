//! Employee login through Google.

use vetify_issuer::TokenSet;
use vetify_issuer_google::decode_id_token;

use crate::error::{MapError, Result};
use crate::subjects::{EmployeeSubject, VetifySubject};

const KIND: &str = "employee";

/// Claims read from the Google id_token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeClaims {
    /// Account email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
}

/// Extract employee claims from the token set's `id_token`.
pub fn employee_claims(tokens: &TokenSet) -> Result<EmployeeClaims> {
    let id_token = tokens
        .raw_str("id_token")
        .ok_or_else(|| MapError::claim_extraction(KIND, "token response has no id_token"))?;
    let claims =
        decode_id_token(id_token).map_err(|e| MapError::claim_extraction(KIND, e.to_string()))?;
    let email = claims
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| MapError::claim_extraction(KIND, "id_token has no email"))?;

    Ok(EmployeeClaims {
        email,
        name: claims.name,
    })
}

/// Map a completed Google exchange to an employee subject.
pub fn map_employee(tokens: &TokenSet) -> Result<VetifySubject> {
    let claims = employee_claims(tokens)?;
    Ok(VetifySubject::Employee(EmployeeSubject {
        email: claims.email,
        name: claims.name,
    }))
}
