//! Static hosting of the browser client.
//!
//! Client-side routes (`/share/{id}` and extension-less paths) fall back to
//! `index.html` so deep links load the app.

use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::web::state::WebAppState;

const INDEX: &str = "index.html";

pub async fn serve_asset(State(state): State<WebAppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }
    let Some(root) = state.assets_dir() else {
        return not_found();
    };

    let path = uri.path();
    if let Some(relative) = asset_path(path) {
        if let Some(response) = read_asset(&root.join(relative), &method).await {
            return response;
        }
    }

    if path.starts_with("/share/") || !path.contains('.') {
        if let Some(response) = read_asset(&root.join(INDEX), &method).await {
            return response;
        }
    }
    not_found()
}

/// Map a request path onto a relative file path, rejecting traversal
fn asset_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let relative = if trimmed.is_empty() || trimmed.ends_with('/') {
        PathBuf::from(trimmed).join(INDEX)
    } else {
        PathBuf::from(trimmed)
    };

    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}

async fn read_asset(path: &Path, method: &Method) -> Option<Response> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Asset not readable");
            }
            return None;
        }
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let len = bytes.len();
    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(bytes)
    };

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, len)
        .body(body)
        .ok()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
