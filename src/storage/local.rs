//! Local fallback storage (no remote backend configured).

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StorageError, StorageProvider};
use crate::data::{Database, KvStore};

/// Namespace for share entries in the local key/value area
pub const LOCAL_KEY_PREFIX: &str = "ggbpuppy-share-";

#[derive(Serialize, Deserialize)]
struct Envelope {
    data: Value,
    /// Capture time in milliseconds since the epoch
    timestamp: i64,
}

/// Storage provider backed by a local SQLite key/value table.
///
/// Writes are immediately visible, so reads never retry.
#[derive(Clone)]
pub struct LocalStorage {
    store: KvStore,
    _db: Database,
}

impl LocalStorage {
    pub fn new(db: Database) -> Self {
        Self {
            store: KvStore::new(db.connection()),
            _db: db,
        }
    }

    /// Ephemeral storage that lives as long as the provider
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn storage_key(key: &str) -> String {
        format!("{LOCAL_KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn save(&self, key: &str, data: &Value) -> Result<String, StorageError> {
        let envelope = Envelope {
            data: data.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let value = serde_json::to_string(&envelope)?;
        if let Err(e) = self.store.put(&Self::storage_key(key), &value) {
            tracing::error!(key = %key, error = %e, "Local share save failed");
            return Err(e.into());
        }
        Ok(key.to_string())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let Some(raw) = self.store.get(&Self::storage_key(key))? else {
            return Ok(None);
        };

        match serde_json::from_str::<Envelope>(&raw) {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable local share entry");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
