//! Pluggable key/value backends for share records.
//!
//! The share service only sees [`StorageProvider`]; which implementation backs
//! it is decided once at startup from [`StorageConfig`].

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{StorageConfig, StorageMode};
use crate::data::{Database, DatabaseError};

pub use local::{LocalStorage, LOCAL_KEY_PREFIX};
pub use remote::RemoteStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{operation} failed: HTTP {status}")]
    Http {
        operation: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(DatabaseError::Sqlite(err))
    }
}

/// Capability set every share backend provides
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persist `data` under `key`, returning the identifier to share
    async fn save(&self, key: &str, data: &Value) -> Result<String, StorageError>;

    /// Fetch the value stored under `key`, `None` when absent
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Produce a fresh key for [`save`](Self::save)
    fn generate_id(&self) -> String {
        crate::util::generate_share_id()
    }

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Build the provider selected by configuration
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn StorageProvider>, StorageError> {
    let provider: Arc<dyn StorageProvider> = match config.mode {
        StorageMode::Remote => Arc::new(RemoteStorage::from_config(config)?),
        StorageMode::Local => {
            let db = Database::open(crate::util::local_store_path())?;
            Arc::new(LocalStorage::new(db))
        }
    };
    tracing::debug!(provider = provider.name(), "Storage provider selected");
    Ok(provider)
}
