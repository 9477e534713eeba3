use serde::Serialize;

use super::SessionOptions;

/// Applet construction parameters, serialized with the names the GeoGebra
/// deploy script expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppletParams {
    pub app_name: &'static str,
    pub width: u32,
    pub height: u32,
    pub show_tool_bar: bool,
    pub show_algebra_input: bool,
    pub show_menu_bar: bool,
    pub show_reset_icon: bool,
    #[serde(rename = "enable3D")]
    pub enable_3d: bool,
    pub enable_label_drags: bool,
    pub enable_shift_drag_zoom: bool,
    pub enable_right_click: bool,
    pub capturing_threshold: Option<u32>,
    pub show_tool_bar_help: bool,
    pub error_dialogs_active: bool,
    #[serde(rename = "useBrowserForJS")]
    pub use_browser_for_js: bool,
    pub language: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_algebra_view: Option<bool>,
}

impl AppletParams {
    pub fn new(options: &SessionOptions, (width, height): (u32, u32)) -> Self {
        Self {
            app_name: if options.enable_3d { "3d" } else { "classic" },
            width,
            height,
            show_tool_bar: false,
            show_algebra_input: !options.hide_sidebar,
            show_menu_bar: false,
            show_reset_icon: false,
            enable_3d: options.enable_3d,
            enable_label_drags: true,
            enable_shift_drag_zoom: true,
            enable_right_click: true,
            capturing_threshold: None,
            show_tool_bar_help: false,
            error_dialogs_active: false,
            use_browser_for_js: false,
            language: "zh",
            show_algebra_view: options.hide_sidebar.then_some(false),
        }
    }
}
