//! State machine for viewing one share link.
//!
//! ```text
//! Loading ─┬─> DataReady ─> SceneRestoring ─> SceneRestored ─┬─> CodeExecuting ─> CodeExecuted
//!          └─> DataError                                    └─> CodeSkipped
//! ViewerError pre-empts any state when the renderer fails to initialize.
//! ```
//!
//! The restore/execute pipeline needs both the record and a renderer whose
//! 2D/3D mode matches the record. It runs at most once per viewer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{GetShareOptions, RestoreOptions, ShareError, ShareService};
use crate::config::ViewerConfig;
use crate::data::ShareRecord;
use crate::renderer::{Renderer, SessionError, SessionObserver, SessionOptions};
use crate::util::{Retry, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Loading,
    DataReady,
    DataError(String),
    SceneRestoring,
    SceneRestored,
    CodeExecuting,
    CodeExecuted,
    CodeSkipped,
    ViewerError(String),
}

impl ViewerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ViewerState::DataError(_)
                | ViewerState::ViewerError(_)
                | ViewerState::CodeExecuted
                | ViewerState::CodeSkipped
        )
    }
}

struct ViewerInner {
    service: ShareService,
    share_id: String,
    data_load: RetryPolicy,
    restore: RestoreOptions,
    state: watch::Sender<ViewerState>,
    record: Mutex<Option<ShareRecord>>,
    renderer: Mutex<Option<(Arc<dyn Renderer>, bool)>>,
    has_run: AtomicBool,
    cancel: CancellationToken,
}

/// One share-viewing session
#[derive(Clone)]
pub struct ShareViewer {
    inner: Arc<ViewerInner>,
}

impl ShareViewer {
    pub fn new(service: ShareService, share_id: impl Into<String>, config: &ViewerConfig) -> Self {
        let (state, _) = watch::channel(ViewerState::Loading);
        Self {
            inner: Arc::new(ViewerInner {
                service,
                share_id: share_id.into(),
                data_load: config.data_load,
                restore: config.restore.clone(),
                state,
                record: Mutex::new(None),
                renderer: Mutex::new(None),
                has_run: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn share_id(&self) -> &str {
        &self.inner.share_id
    }

    pub fn state(&self) -> ViewerState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.inner.state.subscribe()
    }

    pub fn record(&self) -> Option<ShareRecord> {
        self.inner.record.lock().clone()
    }

    /// Renderer mode the loaded record asks for
    pub fn required_3d(&self) -> Option<bool> {
        self.inner.record.lock().as_ref().map(|r| r.enable_3d)
    }

    pub fn has_run(&self) -> bool {
        self.inner.has_run.load(Ordering::SeqCst)
    }

    /// Tear down; pending steps stop before their next state change
    pub fn dispose(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Fetch the record, then run the pipeline if a renderer is waiting
    pub async fn load(&self) {
        let inner = &self.inner;
        if inner.share_id.trim().is_empty() {
            self.transition(ViewerState::DataError("No share id provided".into()));
            return;
        }

        let retry = Retry::new(inner.data_load).on_retry(|e: &ShareError, attempt| {
            tracing::warn!(share_id = %inner.share_id, attempt, error = %e, "Retrying share load");
        });
        let fetch = retry.run(|_| {
            inner
                .service
                .get_share(&inner.share_id, GetShareOptions::throwing())
        });

        let result = tokio::select! {
            _ = inner.cancel.cancelled() => return,
            result = fetch => result,
        };
        if self.is_disposed() {
            return;
        }

        match result {
            Ok(Some(record)) => {
                tracing::info!(share_id = %inner.share_id, enable_3d = record.enable_3d, "Share loaded");
                *inner.record.lock() = Some(record);
                self.transition(ViewerState::DataReady);
                self.try_run().await;
            }
            Ok(None) => {
                tracing::warn!(share_id = %inner.share_id, "Share not found");
                self.transition(ViewerState::DataError("Share not found".into()));
            }
            Err(e) => {
                tracing::error!(share_id = %inner.share_id, error = %e, "Share load failed");
                self.transition(ViewerState::DataError(format!("Failed to load share: {}", e)));
            }
        }
    }

    /// Hand over a ready renderer and the mode it was built in
    pub async fn renderer_ready(&self, renderer: Arc<dyn Renderer>, renderer_3d: bool) {
        if self.is_disposed() {
            return;
        }
        *self.inner.renderer.lock() = Some((renderer, renderer_3d));
        self.try_run().await;
    }

    pub fn renderer_failed(&self, error: &SessionError) {
        if self.is_disposed() {
            return;
        }
        let message = error.to_string();
        self.inner.state.send_modify(|state| {
            *state = ViewerState::ViewerError(message);
        });
    }

    /// Apply a state unless the viewer is gone or already failed
    fn transition(&self, next: ViewerState) -> bool {
        let cancelled = self.is_disposed();
        self.inner.state.send_if_modified(|state| {
            if cancelled || matches!(state, ViewerState::ViewerError(_)) {
                return false;
            }
            tracing::debug!(from = ?state, to = ?next, "Viewer state");
            *state = next;
            true
        })
    }

    async fn try_run(&self) {
        let inner = &self.inner;
        let Some(record) = inner.record.lock().clone() else {
            return;
        };
        let Some((renderer, renderer_3d)) = inner.renderer.lock().clone() else {
            return;
        };

        if renderer_3d != record.enable_3d {
            tracing::debug!(
                renderer_3d,
                enable_3d = record.enable_3d,
                "Waiting for renderer in the recorded mode"
            );
            return;
        }
        if inner.has_run.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.transition(ViewerState::SceneRestoring) {
            return;
        }
        let restored = match &record.scene {
            Some(scene) => {
                let restore =
                    ShareService::restore_scene_data(renderer.as_ref(), scene, &inner.restore);
                tokio::select! {
                    _ = inner.cancel.cancelled() => {
                        tracing::debug!(share_id = %inner.share_id, "Scene restore abandoned");
                        return;
                    }
                    restored = restore => restored,
                }
            }
            None => false,
        };
        if !self.transition(ViewerState::SceneRestored) {
            return;
        }

        // Replaying the code would reset the restored construction.
        if restored {
            self.transition(ViewerState::CodeSkipped);
            return;
        }

        if !self.transition(ViewerState::CodeExecuting) {
            return;
        }
        let executed = ShareService::execute_share_code(renderer.as_ref(), &record.code);
        self.transition(if executed {
            ViewerState::CodeExecuted
        } else {
            ViewerState::CodeSkipped
        });
    }
}

impl SessionObserver for ShareViewer {
    fn on_ready(&self, renderer: Arc<dyn Renderer>, options: SessionOptions) {
        let viewer = self.clone();
        tokio::spawn(async move { viewer.renderer_ready(renderer, options.enable_3d).await });
    }

    fn on_error(&self, error: &SessionError) {
        self.renderer_failed(error);
    }
}
