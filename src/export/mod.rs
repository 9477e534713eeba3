//! File exports of the construction.
//!
//! Renderer-backed exports (`.ggb`, `.png`, `.svg`) first replay the source
//! when there is any, give the renderer a moment to settle, then read the
//! result back. The `.html` export needs no renderer: it embeds the source
//! in a standalone page that replays it on load.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Local, NaiveDateTime};
use thiserror::Error;

use crate::renderer::callback::{self, resolve_base64};
use crate::renderer::{Capability, Renderer, RendererError};
use crate::share::ShareService;
use crate::util::sleep;

/// Pause after replaying the source, before reading the canvas back
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

const HTML_TEMPLATE: &str = include_str!("template.html");

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Renderer(#[from] RendererError),

    #[error("Export failed: the renderer returned no {0} data")]
    Empty(&'static str),

    #[error("Export failed: invalid base64 from renderer: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to encode source: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Ggb,
    Png,
    Svg,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Ggb => "ggb",
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Ggb => "application/vnd.geogebra.file",
            ExportFormat::Png => "image/png",
            ExportFormat::Svg => "image/svg+xml;charset=utf-8",
            ExportFormat::Html => "text/html;charset=utf-8",
        }
    }
}

/// A finished export, ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            filename: format!("{}.{}", generate_file_name(), format.extension()),
            format,
            bytes,
        }
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    /// Write into `dir`, returning the full path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        fs::write(&path, &self.bytes).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(path)
    }
}

/// `ggbpuppy_YYYY-MM-DD_HHMMSS` for the given local time
pub fn file_name_at(time: NaiveDateTime) -> String {
    format!("ggbpuppy_{}", time.format("%Y-%m-%d_%H%M%S"))
}

/// Export base name for the current local time
pub fn generate_file_name() -> String {
    file_name_at(Local::now().naive_local())
}

async fn replay(renderer: &dyn Renderer, code: Option<&str>) {
    let Some(code) = code.filter(|code| !code.trim().is_empty()) else {
        return;
    };
    ShareService::execute_share_code(renderer, code);
    sleep(SETTLE_DELAY).await;
}

fn decode(data: &str, what: &'static str) -> Result<Vec<u8>, ExportError> {
    if data.trim().is_empty() {
        return Err(ExportError::Empty(what));
    }
    Ok(STANDARD.decode(data.trim())?)
}

/// Native `.ggb` file of the current construction
pub async fn export_ggb(
    renderer: &dyn Renderer,
    code: Option<&str>,
) -> Result<ExportArtifact, ExportError> {
    replay(renderer, code).await;
    let data = resolve_base64(renderer.get_base64()?).await?;
    Ok(ExportArtifact::new(ExportFormat::Ggb, decode(&data, "scene")?))
}

/// PNG at scale 1, white background, 72 dpi
pub async fn export_png(
    renderer: &dyn Renderer,
    code: Option<&str>,
) -> Result<ExportArtifact, ExportError> {
    replay(renderer, code).await;
    let data = renderer.get_png_base64(1.0, false, 72)?;
    Ok(ExportArtifact::new(ExportFormat::Png, decode(&data, "image")?))
}

pub async fn export_svg(
    renderer: &dyn Renderer,
    code: Option<&str>,
) -> Result<ExportArtifact, ExportError> {
    replay(renderer, code).await;
    let svg = callback::export_svg(renderer).await?;
    if svg.trim().is_empty() {
        return Err(ExportError::Empty("SVG"));
    }
    Ok(ExportArtifact::new(ExportFormat::Svg, svg.into_bytes()))
}

/// Standalone page that loads GeoGebra and replays `code`
pub fn export_html(code: &str, enable_3d: bool) -> Result<ExportArtifact, ExportError> {
    Ok(ExportArtifact::new(
        ExportFormat::Html,
        render_html(code, enable_3d)?.into_bytes(),
    ))
}

pub fn render_html(code: &str, enable_3d: bool) -> Result<String, ExportError> {
    // A JSON string is a valid JS literal; `</` must not close the script tag.
    let literal = serde_json::to_string(code)?.replace("</", "<\\/");
    let app_name = if enable_3d { "3d" } else { "classic" };
    Ok(HTML_TEMPLATE
        .replace("{{APP_NAME}}", app_name)
        .replace("{{CODE}}", &literal))
}

/// `name = definition` lines for every visible object
pub fn construction_code(renderer: &dyn Renderer) -> Result<String, ExportError> {
    if !renderer.supports(Capability::ObjectInspection) {
        return Err(RendererError::Unsupported(Capability::ObjectInspection.method_name()).into());
    }

    let mut lines = Vec::new();
    for name in renderer.get_all_object_names()? {
        if !renderer.get_visible(&name)? {
            continue;
        }
        let definition = renderer.get_command_string(&name)?;
        if definition.trim().is_empty() {
            continue;
        }
        lines.push(format!("{} = {}", name, definition));
    }
    Ok(lines.join("\n"))
}
