use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::ShareError;
use crate::code::parse_commands;
use crate::data::{SceneFormat, SceneSnapshot, ShareOptions, ShareRecord, SCENE_FORMAT_VERSION};
use crate::renderer::callback::{load_base64, resolve_base64};
use crate::renderer::{Capability, Renderer, RendererError};
use crate::storage::StorageProvider;
use crate::util::{with_timeout, Retry, RetryPolicy};

/// Identifier of a freshly stored share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedShare {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetShareOptions {
    /// Propagate failures instead of reporting the share as absent
    pub throw_on_error: bool,
}

impl GetShareOptions {
    pub fn throwing() -> Self {
        Self {
            throw_on_error: true,
        }
    }
}

/// Budget for handing a scene snapshot to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(8000),
            retries: 2,
            retry_delay: Duration::from_millis(400),
        }
    }
}

/// Creates and reads share records and replays them into a renderer
#[derive(Clone)]
pub struct ShareService {
    storage: Arc<dyn StorageProvider>,
}

impl ShareService {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Persist a new record for `code`. Every call yields a new identifier.
    pub async fn create_share(
        &self,
        code: &str,
        options: ShareOptions,
    ) -> Result<CreatedShare, ShareError> {
        let key = self.storage.generate_id();
        let record = ShareRecord::new(code, options);
        let data = serde_json::to_value(&record).map_err(ShareError::Encode)?;

        match self.storage.save(&key, &data).await {
            Ok(id) => {
                tracing::info!(
                    share_id = %id,
                    enable_3d = record.enable_3d,
                    has_scene = record.scene.is_some(),
                    "Share created"
                );
                Ok(CreatedShare { id })
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create share");
                Err(e.into())
            }
        }
    }

    /// Fetch a record. Failures read as `None` unless `throw_on_error`.
    pub async fn get_share(
        &self,
        id: &str,
        options: GetShareOptions,
    ) -> Result<Option<ShareRecord>, ShareError> {
        match self.fetch(id).await {
            Ok(record) => Ok(record),
            Err(e) if options.throw_on_error => Err(e),
            Err(e) => {
                tracing::error!(share_id = %id, error = %e, "Failed to get share");
                Ok(None)
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<ShareRecord>, ShareError> {
        let Some(value) = self.storage.load(id).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ShareError::Decode {
                id: id.to_string(),
                source,
            })
    }

    /// Export the renderer state as base64. Never fails.
    pub async fn capture_scene_data(renderer: &dyn Renderer) -> Option<String> {
        if !renderer.supports(Capability::GetBase64) {
            return None;
        }

        let exported = match renderer.get_base64() {
            Ok(export) => resolve_base64(export).await,
            Err(e) => Err(e),
        };
        match exported {
            Ok(data) if !data.trim().is_empty() => Some(data),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to capture scene");
                None
            }
        }
    }

    /// Wrap a base64 export into the current snapshot format
    pub fn build_scene_payload(base64: Option<&str>) -> Option<SceneSnapshot> {
        let data = base64?.trim();
        if data.is_empty() {
            return None;
        }
        Some(SceneSnapshot {
            version: SCENE_FORMAT_VERSION,
            format: SceneFormat::BinaryBlob,
            data: data.to_string(),
        })
    }

    /// Load `scene` into the renderer.
    ///
    /// Returns false without touching the renderer when the snapshot is not
    /// in the current format or the renderer cannot restore scenes. Restore
    /// failures after the retry budget are reported as false as well.
    pub async fn restore_scene_data(
        renderer: &dyn Renderer,
        scene: &SceneSnapshot,
        options: &RestoreOptions,
    ) -> bool {
        if !scene.is_supported() {
            tracing::warn!(
                version = scene.version,
                format = scene.format.as_str(),
                "Skipping unsupported scene snapshot"
            );
            return false;
        }
        if !renderer.supports(Capability::SetBase64) {
            tracing::warn!("Renderer cannot restore scenes");
            return false;
        }

        let result = Retry::new(RetryPolicy::new(options.retries, options.retry_delay))
            .on_retry(|e: &RendererError, attempt| {
                tracing::warn!(attempt, error = %e, "Retrying scene restore");
            })
            .run(|_| {
                with_timeout(
                    load_base64(renderer, &scene.data),
                    options.timeout,
                    "Scene restore timeout",
                )
            })
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Scene restore failed");
                false
            }
        }
    }

    /// Reset the renderer and evaluate every statement of `code`.
    ///
    /// Returns false, leaving the renderer alone, when `code` has no
    /// statements. A failing statement is logged and the rest still run.
    pub fn execute_share_code(renderer: &dyn Renderer, code: &str) -> bool {
        let statements = parse_commands(code);
        if statements.is_empty() {
            return false;
        }

        if let Err(e) = renderer.reset() {
            tracing::warn!(error = %e, "Failed to reset canvas");
        }

        for (index, statement) in statements.iter().enumerate() {
            if let Err(e) = renderer.eval_command(statement) {
                tracing::warn!(index, statement = %statement, error = %e, "Statement failed");
            }
        }
        true
    }
}
