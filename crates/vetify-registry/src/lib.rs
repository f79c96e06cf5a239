//! Client registry lookup against the Vendus API.
//!
//! - [`ClientLookup`]: the lookup capability used by customer login
//! - [`VendusClient`]: HTTP implementation with explicit timeout and retry
//! - [`ClientRecord`]: the registry record for one customer

mod error;
mod record;
mod vendus;

use async_trait::async_trait;

pub use error::{LookupError, Result};
pub use record::ClientRecord;
pub use vendus::{DEFAULT_VENDUS_URL, VendusClient};

/// Looks up a registered client by email.
#[async_trait]
pub trait ClientLookup: Send + Sync {
    /// Resolve `email` to exactly one client.
    ///
    /// Returns `None` unless the registry reports exactly one match.
    async fn fetch_client(&self, email: &str) -> Option<ClientRecord>;
}
