//! Integration tests for the share viewer driven by a renderer session
//!
//! The viewer is the session's observer, exactly as the embed page wires
//! them: the share loads, the renderer comes up in the share's mode and the
//! pipeline runs once.

use std::sync::Arc;
use std::time::Duration;

use ggbpuppy::config::ViewerConfig;
use ggbpuppy::renderer::mock::{ConstructBehavior, MockCall, MockRenderer, MockRendererHost};
use ggbpuppy::renderer::{InitPolicy, RendererSession, SessionOptions};
use ggbpuppy::{LocalStorage, ShareOptions, ShareService, ShareViewer, ViewerState};

async fn viewer_for(code: &str, options: ShareOptions) -> ShareViewer {
    let service = ShareService::new(Arc::new(LocalStorage::in_memory().unwrap()));
    let created = service.create_share(code, options).await.unwrap();
    ShareViewer::new(service, created.id, &ViewerConfig::default())
}

fn session_for(viewer: &ShareViewer, host: &Arc<MockRendererHost>) -> RendererSession {
    RendererSession::new(host.clone(), Arc::new(viewer.clone()), InitPolicy::default())
}

async fn settled(viewer: &ShareViewer) -> ViewerState {
    let mut states = viewer.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(120), states.wait_for(|s| s.is_terminal()))
        .await
        .expect("Viewer never settled")
        .expect("Viewer state channel closed");
    state.clone()
}

#[tokio::test(start_paused = true)]
async fn test_shared_code_runs_in_fresh_renderer() {
    let viewer = viewer_for("A=(1,2)\nB=(3,4)", ShareOptions::default()).await;
    let host = Arc::new(MockRendererHost::new(Arc::new(MockRenderer::new())));
    let session = session_for(&viewer, &host);

    viewer.load().await;
    assert_eq!(viewer.required_3d(), Some(false));
    session.start(SessionOptions::new(false)).await.unwrap();

    assert_eq!(settled(&viewer).await, ViewerState::CodeExecuted);
    assert_eq!(host.renderer().evaluated(), vec!["A=(1,2)", "B=(3,4)"]);
    assert_eq!(host.appended_scripts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_renderer_ready_before_data() {
    let viewer = viewer_for("A=1", ShareOptions::default()).await;
    let host = Arc::new(MockRendererHost::new(Arc::new(MockRenderer::new())));
    let session = session_for(&viewer, &host);

    session.start(SessionOptions::new(false)).await.unwrap();
    // Let the spawned ready notification land.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(viewer.state(), ViewerState::Loading);

    viewer.load().await;
    assert_eq!(settled(&viewer).await, ViewerState::CodeExecuted);
    assert_eq!(host.renderer().evaluated(), vec!["A=1"]);
}

#[tokio::test(start_paused = true)]
async fn test_3d_share_waits_for_3d_renderer() {
    let viewer = viewer_for("A=(1,2,3)", ShareOptions::default().with_3d(true)).await;
    let host = Arc::new(MockRendererHost::new(Arc::new(MockRenderer::new())));
    let session = session_for(&viewer, &host);

    viewer.load().await;
    session.start(SessionOptions::new(false)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(viewer.state(), ViewerState::DataReady);
    assert!(host.renderer().evaluated().is_empty());

    let required = viewer.required_3d().unwrap_or(false);
    session.start(SessionOptions::new(required)).await.unwrap();

    assert_eq!(settled(&viewer).await, ViewerState::CodeExecuted);
    assert_eq!(host.renderer().evaluated(), vec!["A=(1,2,3)"]);
    assert_eq!(host.constructed().last().unwrap().app_name, "3d");
    assert!(host
        .renderer()
        .calls()
        .contains(&MockCall::ExecuteCommand("ShowView(5, true)".into())));
}

#[tokio::test(start_paused = true)]
async fn test_saved_scene_is_restored_instead_of_replayed() {
    let scene = ShareService::build_scene_payload(Some("UEsDBBQAAAAI"));
    let viewer = viewer_for("A=1", ShareOptions::default().with_scene(scene)).await;
    let host = Arc::new(MockRendererHost::new(Arc::new(MockRenderer::new())));
    let session = session_for(&viewer, &host);

    viewer.load().await;
    session.start(SessionOptions::new(false)).await.unwrap();

    assert_eq!(settled(&viewer).await, ViewerState::CodeSkipped);
    assert_eq!(host.renderer().restore_count(), 1);
    assert!(host.renderer().evaluated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_renderer_failure_surfaces_as_viewer_error() {
    let viewer = viewer_for("A=1", ShareOptions::default()).await;
    let host = Arc::new(
        MockRendererHost::new(Arc::new(MockRenderer::new())).with_constructs(vec![
            ConstructBehavior::Fail,
            ConstructBehavior::Fail,
            ConstructBehavior::Fail,
        ]),
    );
    let session = session_for(&viewer, &host);

    viewer.load().await;
    session.start(SessionOptions::new(false)).await.unwrap();

    match settled(&viewer).await {
        ViewerState::ViewerError(message) => assert!(message.contains("applet construction failed")),
        other => panic!("unexpected state: {other:?}"),
    }
    assert_eq!(host.constructed().len(), 3);
    assert!(session.renderer().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_disposed_session_never_reaches_viewer() {
    let viewer = viewer_for("A=1", ShareOptions::default()).await;
    let host = Arc::new(
        MockRendererHost::new(Arc::new(MockRenderer::new()))
            .with_constructs(vec![ConstructBehavior::LoadAfter(Duration::from_secs(2))]),
    );
    let session = session_for(&viewer, &host);

    viewer.load().await;
    let init = session.start(SessionOptions::new(false));
    tokio::time::sleep(Duration::from_millis(500)).await;
    session.dispose();
    init.await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(viewer.state(), ViewerState::DataReady);
    assert!(host.renderer().evaluated().is_empty());
}
