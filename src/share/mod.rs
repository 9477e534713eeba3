//! Share records: creation, lookup, scene capture/restore and replay.

pub mod links;
mod service;
mod viewer;

use thiserror::Error;

use crate::storage::StorageError;

pub use links::{ShareLinkParams, ShareLinks};
pub use service::{CreatedShare, GetShareOptions, RestoreOptions, ShareService};
pub use viewer::{ShareViewer, ViewerState};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode share record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Stored share '{id}' is not a valid record: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}
