//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};

use crate::web::handlers::share;
use crate::web::state::WebAppState;

/// Create the share API router; mounted under `/api`.
pub fn api_routes() -> Router<WebAppState> {
    Router::new()
        .route("/share", post(share::create_share))
        .route("/share/{id}", get(share::get_share))
        .fallback(share::api_fallback)
        .method_not_allowed_fallback(share::api_fallback)
}
