//! Single-resolution adapters for the renderer's callback APIs.
//!
//! The renderer may invoke a completion callback zero, one or several
//! times. [`completion`] turns that into a future that resolves at most once:
//! later invocations are ignored, and a callback dropped without being
//! called resolves the future with an error.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{Base64Export, Renderer, RendererError};

/// Completion callback without a payload (`setBase64`)
pub type DoneCallback = Box<dyn Fn() + Send + Sync>;

/// Completion callback carrying the exported SVG markup
pub type SvgCallback = Box<dyn Fn(String) + Send + Sync>;

/// Sending half of a single-resolution callback
pub struct Completer<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Completer<T> {
    /// Resolve the paired receiver. Returns false when already resolved.
    pub fn complete(&self, value: T) -> bool {
        match self.slot.lock().take() {
            Some(sender) => {
                // The waiter may have given up (timeout); nothing to do then.
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// Create a completer and the receiver it resolves
pub fn completion<T>() -> (Completer<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completer {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

/// Load a base64 scene into the renderer and wait for its done callback
pub async fn load_base64(renderer: &dyn Renderer, data: &str) -> Result<(), RendererError> {
    let (done, rx) = completion();
    renderer.set_base64(
        data,
        Box::new(move || {
            done.complete(());
        }),
    )?;
    rx.await.map_err(|_| RendererError::CallbackDropped)
}

/// Export the canvas as SVG markup through the renderer's callback API
pub async fn export_svg(renderer: &dyn Renderer) -> Result<String, RendererError> {
    let (done, rx) = completion();
    renderer.export_svg(Box::new(move |svg| {
        done.complete(svg);
    }))?;
    rx.await.map_err(|_| RendererError::CallbackDropped)
}

/// Normalize the synchronous and deferred snapshot conventions
pub async fn resolve_base64(export: Base64Export) -> Result<String, RendererError> {
    match export {
        Base64Export::Ready(data) => Ok(data),
        Base64Export::Pending(future) => future.await,
    }
}
