use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::{Database, DatabaseError, KvStore};

/// Shared state of the share backend
#[derive(Clone)]
pub struct WebAppState {
    shares: KvStore,
    assets_dir: Option<Arc<PathBuf>>,
}

impl WebAppState {
    pub fn new(db: &Database, assets_dir: Option<PathBuf>) -> Self {
        Self {
            shares: KvStore::new(db.connection()),
            assets_dir: assets_dir.map(Arc::new),
        }
    }

    /// Backend over the database file at `path`
    pub fn open(path: PathBuf, assets_dir: Option<PathBuf>) -> Result<Self, DatabaseError> {
        Ok(Self::new(&Database::open(path)?, assets_dir))
    }

    /// Backend with a throwaway in-memory store
    pub fn in_memory(assets_dir: Option<PathBuf>) -> Result<Self, DatabaseError> {
        Ok(Self::new(&Database::open_in_memory()?, assets_dir))
    }

    pub fn shares(&self) -> &KvStore {
        &self.shares
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref().map(PathBuf::as_path)
    }
}
