//! Key-value storage for issuer-internal state.
//!
//! Holds attempts in flight, authorization codes, and refresh tokens. The
//! engine only talks to the [`Storage`] trait; [`MemoryStorage`] keeps
//! everything in a map and optionally mirrors it to a single JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// Key-value persistence used by the issuer.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Read a value; expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Write a value with an optional time-to-live.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>)
    -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read and delete a value in one step.
    ///
    /// Implementations must guarantee that at most one caller observes the
    /// value; single-use authorization codes rely on it.
    async fn take(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

/// Read a typed value.
pub(crate) async fn load<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Write a typed value.
pub(crate) async fn save<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StorageError> {
    storage.set(key, serde_json::to_value(value)?, ttl).await
}

/// Read and delete a typed value.
pub(crate) async fn take<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.take(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: Value,
    /// Unix timestamp (seconds) after which the entry is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory storage, optionally persisted to a JSON file.
///
/// Every write rewrites the file (through a temporary file and a rename), so
/// the state survives restarts. The lock is held for the file write to keep
/// writes ordered.
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Entry>>,
    persist: Option<PathBuf>,
}

impl MemoryStorage {
    /// Create a purely in-memory store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            persist: None,
        }
    }

    /// Create a store backed by `path`, loading existing entries if the file exists.
    pub fn persisted(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };

        log::info!(
            "Storage loaded {} entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            entries: Mutex::new(entries),
            persist: Some(path),
        })
    }

    /// The persistence file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.persist.as_deref()
    }

    async fn flush(&self, entries: &HashMap<String, Entry>) -> Result<(), StorageError> {
        let Some(path) = &self.persist else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec(entries)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        let now = now();
        entries.retain(|_, entry| !entry.is_expired(now));

        let expires_at = ttl.map(|ttl| now + ttl.as_secs() as i64);
        entries.insert(key.to_string(), Entry { value, expires_at });
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.remove(key) else {
            return Ok(None);
        };
        self.flush(&entries).await?;

        if entry.is_expired(now()) {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }
}
