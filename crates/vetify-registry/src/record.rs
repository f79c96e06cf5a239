//! Registry record types.

use serde::{Deserialize, Serialize};

/// A client as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Contact email on file.
    pub email: String,
    /// Client name, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fiscal identifier (NIF).
    pub fiscal_id: String,
}
