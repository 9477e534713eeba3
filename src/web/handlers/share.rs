//! Share API handlers.
//!
//! The backend is a plain key/value store: the client picks the key, the
//! payload is stored as serialized JSON text and handed back verbatim.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::web::error::WebError;
use crate::web::state::WebAppState;

/// Body of `POST /api/share`
#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub id: String,
    pub data: Value,
}

fn missing_payload() -> WebError {
    WebError::BadRequest("Missing share payload.".to_string())
}

/// Store `data` under `key`.
pub async fn create_share(
    State(state): State<WebAppState>,
    body: Bytes,
) -> Result<Json<CreateShareResponse>, WebError> {
    let request: CreateShareRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected share payload");
        missing_payload()
    })?;

    let key = request.key.filter(|key| !key.is_empty());
    let data = request.data.filter(|data| !data.is_null());
    let (Some(key), Some(data)) = (key, data) else {
        return Err(missing_payload());
    };

    let text = serde_json::to_string(&data)
        .map_err(|e| WebError::internal("Share save failed.", e))?;
    state
        .shares()
        .put(&key, &text)
        .map_err(|e| WebError::internal("Share save failed.", e))?;

    tracing::info!(id = %key, bytes = text.len(), "Share stored");
    Ok(Json(CreateShareResponse { id: key }))
}

/// Fetch the stored payload for `id`.
pub async fn get_share(
    State(state): State<WebAppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareResponse>, WebError> {
    let text = state
        .shares()
        .get(&id)
        .map_err(|e| WebError::internal("Share fetch failed.", e))?
        .ok_or_else(|| WebError::NotFound("Share not found.".to_string()))?;

    let data: Value =
        serde_json::from_str(&text).map_err(|e| WebError::internal("Share fetch failed.", e))?;
    Ok(Json(ShareResponse { id, data }))
}

/// Unmatched API requests: `OPTIONS` gets an empty 200, anything else 404.
pub async fn api_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    WebError::NotFound("Not found.".to_string()).into_response()
}
