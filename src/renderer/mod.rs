//! Contract with the external GeoGebra renderer.
//!
//! The renderer only exposes an imperative, callback-based API. Everything
//! beyond `evalCommand` and `reset` is optional and must be feature-detected
//! through [`Renderer::supports`] before use.

pub mod callback;
pub mod error;
pub mod host;
pub mod mock;
pub mod params;
pub mod session;

use futures::future::BoxFuture;

pub use callback::{completion, Completer, DoneCallback, SvgCallback};
pub use error::{RendererError, SessionError};
pub use host::{loader_script_url, LoadCallback, RendererHost, DEPLOY_SCRIPT_URL};
pub use params::AppletParams;
pub use session::{InitPolicy, RendererSession, SessionObserver, SessionOptions};

/// Optional renderer capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GetBase64,
    SetBase64,
    SetSize,
    SetPerspective,
    ExecuteCommand,
    SetShowAlgebraInput,
    SetShowToolBar,
    /// `getAllObjectNames`, `getVisible` and `getCommandString`
    ObjectInspection,
    PngExport,
    SvgExport,
}

impl Capability {
    /// Name of the renderer method backing the capability
    pub fn method_name(&self) -> &'static str {
        match self {
            Capability::GetBase64 => "getBase64",
            Capability::SetBase64 => "setBase64",
            Capability::SetSize => "setSize",
            Capability::SetPerspective => "setPerspective",
            Capability::ExecuteCommand => "executeCommand",
            Capability::SetShowAlgebraInput => "setShowAlgebraInput",
            Capability::SetShowToolBar => "setShowToolBar",
            Capability::ObjectInspection => "getAllObjectNames",
            Capability::PngExport => "getPNGBase64",
            Capability::SvgExport => "exportSVG",
        }
    }
}

/// Result of `getBase64`, which some renderer builds return synchronously
/// and others through a promise.
pub enum Base64Export {
    Ready(String),
    Pending(BoxFuture<'static, Result<String, RendererError>>),
}

fn unsupported<T>(capability: Capability) -> Result<T, RendererError> {
    Err(RendererError::Unsupported(capability.method_name()))
}

/// Handle to a live renderer instance
pub trait Renderer: Send + Sync {
    /// Evaluate one statement
    fn eval_command(&self, statement: &str) -> Result<(), RendererError>;

    /// Clear the construction
    fn reset(&self) -> Result<(), RendererError>;

    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    fn get_base64(&self) -> Result<Base64Export, RendererError> {
        unsupported(Capability::GetBase64)
    }

    /// Replace the construction with a base64 scene; `on_done` fires once loaded
    fn set_base64(&self, _data: &str, _on_done: DoneCallback) -> Result<(), RendererError> {
        unsupported(Capability::SetBase64)
    }

    fn set_size(&self, _width: u32, _height: u32) -> Result<(), RendererError> {
        unsupported(Capability::SetSize)
    }

    fn set_perspective(&self, _perspective: &str) -> Result<(), RendererError> {
        unsupported(Capability::SetPerspective)
    }

    fn execute_command(&self, _command: &str) -> Result<bool, RendererError> {
        unsupported(Capability::ExecuteCommand)
    }

    fn set_show_algebra_input(&self, _show: bool) -> Result<(), RendererError> {
        unsupported(Capability::SetShowAlgebraInput)
    }

    fn set_show_tool_bar(&self, _show: bool) -> Result<(), RendererError> {
        unsupported(Capability::SetShowToolBar)
    }

    fn get_all_object_names(&self) -> Result<Vec<String>, RendererError> {
        unsupported(Capability::ObjectInspection)
    }

    fn get_visible(&self, _name: &str) -> Result<bool, RendererError> {
        unsupported(Capability::ObjectInspection)
    }

    fn get_command_string(&self, _name: &str) -> Result<String, RendererError> {
        unsupported(Capability::ObjectInspection)
    }

    fn get_png_base64(
        &self,
        _scale: f64,
        _transparent: bool,
        _dpi: u32,
    ) -> Result<String, RendererError> {
        unsupported(Capability::PngExport)
    }

    fn export_svg(&self, _on_done: SvgCallback) -> Result<(), RendererError> {
        unsupported(Capability::SvgExport)
    }
}
