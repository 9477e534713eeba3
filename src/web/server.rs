//! Axum server for the share backend.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes::api::api_routes;
use super::routes::static_files::serve_asset;
use super::state::WebAppState;

/// Server configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Built browser client to serve; API only when unset.
    pub assets_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            assets_dir: None,
        }
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint handler.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API responses are readable cross-origin, errors included.
async fn allow_any_origin(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Build the Axum router with all routes.
pub fn build_router(state: WebAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .layer(middleware::map_response(allow_any_origin))
        .layer(cors);

    Router::new()
        .nest("/api", api)
        // Everything else is the browser client
        .fallback(serve_asset)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: WebAppState) -> anyhow::Result<()> {
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// Run the web server.
///
/// This binds `host:port` and blocks until shutdown.
pub async fn run_server(state: WebAppState, config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        assets = ?config.assets_dir,
        "Starting share server at http://{}",
        addr
    );
    serve(listener, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> WebAppState {
        WebAppState::in_memory(None).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_of(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, headers, body) = send(build_router(test_state()), get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "ok");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_store_and_fetch_share() {
        let state = test_state();
        let payload = json!({
            "key": "abc1234",
            "data": { "code": "A=(1,2)", "createdAt": 1700000000000u64, "enable3D": false }
        });

        let (status, headers, body) =
            send(build_router(state.clone()), post_json("/api/share", &payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), json!({ "id": "abc1234" }));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let (status, _, body) = send(build_router(state), get_req("/api/share/abc1234")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["id"], "abc1234");
        assert_eq!(body["data"], payload["data"]);
    }

    #[tokio::test]
    async fn test_missing_payload_is_rejected() {
        for body in [
            r#"{"key":"abc"}"#,
            r#"{"data":{"code":"A=1"}}"#,
            r#"{"key":"","data":{"code":"A=1"}}"#,
            r#"{"key":"abc","data":null}"#,
            "not json",
        ] {
            let (status, headers, response) =
                send(build_router(test_state()), post_json("/api/share", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json_of(&response), json!({ "error": "Missing share payload." }));
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn test_unknown_share_is_not_found() {
        let (status, _, body) = send(build_router(test_state()), get_req("/api/share/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_of(&body), json!({ "error": "Share not found." }));
    }

    #[tokio::test]
    async fn test_unknown_api_route() {
        for request in [
            get_req("/api/other"),
            get_req("/api/share"),
            post_json("/api/share/abc", "{}"),
        ] {
            let (status, headers, body) = send(build_router(test_state()), request).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json_of(&body), json!({ "error": "Not found." }));
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn test_options_is_empty_ok() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/share")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(build_router(test_state()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_static_assets_and_spa_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let state = WebAppState::in_memory(Some(dir.path().to_path_buf())).unwrap();

        let (status, headers, body) = send(build_router(state.clone()), get_req("/app.js")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().contains("javascript"));
        assert_eq!(body, b"console.log(1)");

        for path in ["/", "/share/abc1234", "/share/x.y", "/editor"] {
            let (status, headers, body) = send(build_router(state.clone()), get_req(path)).await;
            assert_eq!(status, StatusCode::OK, "path: {path}");
            assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
            assert_eq!(body, b"<html>app</html>");
        }

        let (status, _, _) = send(build_router(state.clone()), get_req("/missing.css")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let head = Request::builder()
            .method(Method::HEAD)
            .uri("/app.js")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(build_router(state.clone()), head).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, _, body) = send(build_router(state), post_json("/index.html", "{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, b"Method Not Allowed");
    }
}
