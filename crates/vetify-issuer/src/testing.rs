//! Shared fixtures for unit tests.

use serde_json::{Value, json};

use crate::subject::{Subject, SubjectError};

/// Minimal single-kind subject.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct User {
    pub email: String,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }
}

impl Subject for User {
    fn kind(&self) -> &'static str {
        "user"
    }

    fn properties(&self) -> Value {
        json!({ "email": self.email })
    }

    fn from_parts(kind: &str, properties: Value) -> Result<Self, SubjectError> {
        if kind != "user" {
            return Err(SubjectError::UnknownType(kind.to_string()));
        }
        let email = properties["email"]
            .as_str()
            .ok_or_else(|| SubjectError::InvalidProperties {
                kind: kind.to_string(),
                message: "missing email".to_string(),
            })?;
        Ok(User::new(email))
    }
}
