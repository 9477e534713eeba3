//! Integration tests for components built from a parsed config file

use std::sync::Arc;
use std::time::Duration;

use ggbpuppy::config::Config;
use ggbpuppy::renderer::mock::{ConstructBehavior, MockRenderer, MockRendererHost};
use ggbpuppy::renderer::{RendererSession, SessionOptions};
use ggbpuppy::{LocalStorage, ShareOptions, ShareService, ShareViewer, StepwiseRunner, ViewerState};
use tokio::time::Instant;

const CONFIG: &str = r#"
[viewer]
init_retries = 0
applet_timeout_ms = 2000

[runner]
default_interval_secs = 0.5
min_interval_secs = 0.2
max_interval_secs = 1.0
"#;

#[tokio::test(start_paused = true)]
async fn test_session_uses_configured_init_policy() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let service = ShareService::new(Arc::new(LocalStorage::in_memory().unwrap()));
    let created = service.create_share("A=1", ShareOptions::default()).await.unwrap();
    let viewer = ShareViewer::new(service, created.id, &config.viewer);

    let host = Arc::new(
        MockRendererHost::new(Arc::new(MockRenderer::new()))
            .with_constructs(vec![ConstructBehavior::Hang]),
    );
    let session = RendererSession::new(host.clone(), Arc::new(viewer.clone()), config.viewer.init.clone());

    viewer.load().await;
    let start = Instant::now();
    session.start(SessionOptions::new(false)).await.unwrap();

    // No retries: the one hung construction times out after the configured 2s.
    assert_eq!(host.constructed().len(), 1);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(viewer.state(), ViewerState::ViewerError(_)));
}

#[tokio::test(start_paused = true)]
async fn test_runner_uses_configured_intervals() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let runner = StepwiseRunner::with_config(config.runner);
    let renderer = Arc::new(MockRenderer::new());
    runner.attach(renderer.clone());

    let start = Instant::now();
    runner.run_default("A=1\nB=2\nC=3").await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1010));

    let start = Instant::now();
    runner.run("A=1\nB=2", Duration::from_millis(10)).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(210));
    assert_eq!(renderer.evaluated().len(), 5);
}
