use std::sync::Arc;

use chrono::Utc;

use super::{AppletParams, Renderer, RendererError};

/// GeoGebra deploy script
pub const DEPLOY_SCRIPT_URL: &str = "https://www.geogebra.org/apps/deployggb.js";

/// Fired by the applet once it has loaded; `None` when it came up without
/// a usable instance.
pub type LoadCallback = Box<dyn Fn(Option<Arc<dyn Renderer>>) + Send + Sync>;

/// Page-side environment the renderer lives in
pub trait RendererHost: Send + Sync {
    /// Whether the loader script has defined the applet constructor
    fn entry_point_available(&self) -> bool;

    /// Whether a loader script tag is already on the page
    fn loader_script_present(&self) -> bool;

    fn append_loader_script(&self, url: &str);

    /// Remove any previous applet from the container
    fn clear_container(&self);

    /// Container size in pixels, `None` when the container is gone
    fn container_size(&self) -> Option<(u32, u32)>;

    /// Construct and inject an applet; `on_load` is its loaded callback
    fn construct(&self, params: AppletParams, on_load: LoadCallback) -> Result<(), RendererError>;
}

/// Cache-busting loader script URL
pub fn loader_script_url() -> String {
    format!("{}?t={}", DEPLOY_SCRIPT_URL, Utc::now().timestamp_millis())
}
