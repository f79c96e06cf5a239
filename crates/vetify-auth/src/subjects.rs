//! Subject kinds issued by Vetify.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vetify_issuer::{Subject, SubjectError};

/// An authenticated employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeeSubject {
    /// Work email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An authenticated customer, as found in the client registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerSubject {
    /// Registry email.
    pub email: String,
    /// Registry name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fiscal identifier.
    #[serde(rename = "fiscalID")]
    pub fiscal_id: String,
}

/// Every subject the issuer may emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VetifySubject {
    /// `type: "employee"`
    Employee(EmployeeSubject),
    /// `type: "customer"`
    Customer(CustomerSubject),
}

impl VetifySubject {
    /// Subject email, whatever the kind.
    pub fn email(&self) -> &str {
        match self {
            VetifySubject::Employee(employee) => &employee.email,
            VetifySubject::Customer(customer) => &customer.email,
        }
    }
}

fn to_properties<T: Serialize>(properties: &T) -> Value {
    serde_json::to_value(properties).unwrap_or(Value::Null)
}

fn invalid(kind: &str, e: serde_json::Error) -> SubjectError {
    SubjectError::InvalidProperties {
        kind: kind.to_string(),
        message: e.to_string(),
    }
}

impl Subject for VetifySubject {
    fn kind(&self) -> &'static str {
        match self {
            VetifySubject::Employee(_) => "employee",
            VetifySubject::Customer(_) => "customer",
        }
    }

    fn properties(&self) -> Value {
        match self {
            VetifySubject::Employee(employee) => to_properties(employee),
            VetifySubject::Customer(customer) => to_properties(customer),
        }
    }

    fn from_parts(kind: &str, properties: Value) -> Result<Self, SubjectError> {
        match kind {
            "employee" => serde_json::from_value(properties)
                .map(VetifySubject::Employee)
                .map_err(|e| invalid(kind, e)),
            "customer" => serde_json::from_value(properties)
                .map(VetifySubject::Customer)
                .map_err(|e| invalid(kind, e)),
            other => Err(SubjectError::UnknownType(other.to_string())),
        }
    }

    fn identity(&self) -> String {
        self.email().to_ascii_lowercase()
    }
}
