//! Shared test utilities for GGBPuppy
//!
//! - Share backends bound to an ephemeral local port
//! - A backend that pretends freshly written shares are not visible yet

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ggbpuppy::web::{serve, WebAppState};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running server; aborted on drop
pub struct TestServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    (listener, format!("http://{addr}"))
}

/// Real share backend over an in-memory store
pub async fn spawn_backend() -> TestServer {
    let state = WebAppState::in_memory(None).expect("Failed to open in-memory store");
    let (listener, base_url) = bind().await;
    let handle = tokio::spawn(async move {
        let _ = serve(listener, state).await;
    });
    TestServer { base_url, handle }
}

#[derive(Clone)]
struct Lagging {
    misses: usize,
    reads: Arc<AtomicUsize>,
    data: Value,
}

async fn lagging_get(State(lag): State<Lagging>, Path(id): Path<String>) -> Response {
    let read = lag.reads.fetch_add(1, Ordering::SeqCst);
    if read < lag.misses {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Share not found." }))).into_response();
    }
    Json(json!({ "id": id, "data": lag.data })).into_response()
}

/// Backend answering 404 for the first `misses` reads, then `data`.
/// Returns the server and its read counter.
pub async fn spawn_lagging_backend(misses: usize, data: Value) -> (TestServer, Arc<AtomicUsize>) {
    let reads = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/share/{id}", get(lagging_get))
        .with_state(Lagging {
            misses,
            reads: reads.clone(),
            data,
        });

    let (listener, base_url) = bind().await;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (TestServer { base_url, handle }, reads)
}

/// A stored share payload as the browser client writes it
pub fn share_payload(code: &str, enable_3d: bool) -> Value {
    json!({
        "code": code,
        "createdAt": "2024-02-07T14:30:52Z",
        "enable3D": enable_3d,
    })
}
