//! Integration tests for the share round trip
//!
//! Covers creating a share, reading it back through each storage backend and
//! replaying it on a renderer.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::common::{share_payload, spawn_backend, spawn_lagging_backend};
use ggbpuppy::renderer::mock::{MockCall, MockRenderer};
use ggbpuppy::share::GetShareOptions;
use ggbpuppy::{
    LocalStorage, RemoteStorage, ShareOptions, ShareService, StorageError, StorageProvider,
};

const CODE: &str = "A = (1, 2)\nB = (3, 4)\n// connect them\nSegment(A, B)";

fn remote(base_url: &str, retries: u32) -> RemoteStorage {
    RemoteStorage::new(base_url, retries, Duration::from_millis(20))
        .expect("Failed to build remote storage")
}

/// Share, reload and replay against local storage
#[tokio::test]
async fn test_local_share_round_trip_replays_code() {
    let service = ShareService::new(Arc::new(LocalStorage::in_memory().unwrap()));

    let created = service
        .create_share(CODE, ShareOptions::default())
        .await
        .unwrap();
    assert_eq!(created.id.len(), 7);

    let record = service
        .get_share(&created.id, GetShareOptions::default())
        .await
        .unwrap()
        .expect("Share should exist");
    assert_eq!(record.code, CODE);
    assert!(!record.enable_3d);

    let renderer = MockRenderer::new();
    assert!(ShareService::execute_share_code(&renderer, &record.code));
    assert_eq!(
        renderer.calls(),
        vec![
            MockCall::Reset,
            MockCall::Eval("A = (1, 2)".into()),
            MockCall::Eval("B = (3, 4)".into()),
            MockCall::Eval("Segment(A, B)".into()),
        ]
    );
}

/// Each share gets its own identifier even for identical code
#[tokio::test]
async fn test_identical_code_gets_distinct_ids() {
    let service = ShareService::new(Arc::new(LocalStorage::in_memory().unwrap()));
    let first = service.create_share("A=1", ShareOptions::default()).await.unwrap();
    let second = service.create_share("A=1", ShareOptions::default()).await.unwrap();
    assert_ne!(first.id, second.id);
}

/// Remote storage against the real share backend
#[tokio::test]
async fn test_remote_share_round_trip() {
    let server = spawn_backend().await;
    let service = ShareService::new(Arc::new(remote(&server.base_url, 2)));

    let created = service
        .create_share(CODE, ShareOptions::default().with_3d(true))
        .await
        .unwrap();

    let record = service
        .get_share(&created.id, GetShareOptions::throwing())
        .await
        .unwrap()
        .expect("Share should exist");
    assert_eq!(record.code, CODE);
    assert!(record.enable_3d);
}

#[tokio::test]
async fn test_remote_missing_share_reads_as_none() {
    let server = spawn_backend().await;
    let storage = remote(&server.base_url, 1);
    assert!(storage.load("missing").await.unwrap().is_none());
}

/// A freshly written share that shows up on the fourth read
#[tokio::test]
async fn test_remote_read_waits_for_visibility() {
    let (server, reads) = spawn_lagging_backend(3, share_payload("A=(1,2)", false)).await;
    let service = ShareService::new(Arc::new(remote(&server.base_url, 4)));

    let record = service
        .get_share("abc1234", GetShareOptions::throwing())
        .await
        .unwrap()
        .expect("Share should become visible");

    assert_eq!(record.code, "A=(1,2)");
    assert_eq!(reads.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_remote_read_gives_up_after_retries() {
    let (server, reads) = spawn_lagging_backend(10, share_payload("A=1", false)).await;
    let storage = remote(&server.base_url, 2);

    assert!(storage.load("abc1234").await.unwrap().is_none());
    assert_eq!(reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let base_url = {
        let server = spawn_backend().await;
        server.base_url.clone()
    };
    // Give the aborted server a moment to release the port.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let storage = remote(&base_url, 0);
    let err = storage
        .save("abc1234", &share_payload("A=1", false))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Network(_)));

    let service = ShareService::new(Arc::new(storage));
    assert!(service
        .get_share("abc1234", GetShareOptions::default())
        .await
        .unwrap()
        .is_none());
    assert!(service
        .get_share("abc1234", GetShareOptions::throwing())
        .await
        .is_err());
}
