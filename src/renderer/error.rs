use thiserror::Error;

use crate::util::TimedOut;

/// Failures raised by the external renderer or while waiting on it
#[derive(Debug, Clone, Error)]
pub enum RendererError {
    #[error("renderer does not support {0}")]
    Unsupported(&'static str),

    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("renderer call failed: {0}")]
    Failed(String),

    #[error("renderer dropped the completion callback")]
    CallbackDropped,

    #[error(transparent)]
    Timeout(#[from] TimedOut),
}

/// Failures of the renderer session controller
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The run was superseded or disposed. Never retried.
    #[error("GeoGebra init cancelled")]
    Cancelled,

    #[error("GeoGebra container unavailable")]
    ContainerUnavailable,

    #[error("GeoGebra applet loaded without instance")]
    MissingInstance,

    #[error("GeoGebra is not ready")]
    NotReady,

    #[error("unsupported file '{0}': only .ggb files can be imported")]
    UnsupportedFile(String),

    #[error(transparent)]
    Timeout(#[from] TimedOut),

    #[error(transparent)]
    Renderer(#[from] RendererError),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    /// Whether the failure came from a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout(_) | SessionError::Renderer(RendererError::Timeout(_))
        )
    }
}
