//! Lifecycle of the single renderer instance.
//!
//! [`RendererSession`] is the only owner allowed to construct, replace or
//! drop the renderer. Consumers receive it through [`SessionObserver`].
//!
//! Each initialization run carries a generation token. Restarting or
//! disposing the session bumps the generation, and a run holding an older
//! token aborts at its next checkpoint without reporting anything and
//! without touching the renderer slot.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::callback::{completion, load_base64};
use super::host::loader_script_url;
use super::{AppletParams, Capability, Renderer, RendererError, RendererHost, SessionError};
use crate::util::{sleep, with_timeout, Retry, RetryPolicy, TimedOut};

/// Display options the renderer is constructed with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub enable_3d: bool,
    pub hide_sidebar: bool,
}

impl SessionOptions {
    pub fn new(enable_3d: bool) -> Self {
        Self {
            enable_3d,
            hide_sidebar: false,
        }
    }

    pub fn with_hidden_sidebar(mut self, hide_sidebar: bool) -> Self {
        self.hide_sidebar = hide_sidebar;
        self
    }
}

/// Retry and timeout budget of one initialization
#[derive(Debug, Clone, PartialEq)]
pub struct InitPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub script_timeout: Duration,
    pub applet_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(600),
            script_timeout: Duration::from_millis(9000),
            applet_timeout: Duration::from_millis(10000),
            poll_interval: Duration::from_millis(120),
        }
    }
}

/// Receives the outcome of initialization
pub trait SessionObserver: Send + Sync {
    /// `options` are the ones the renderer was constructed with
    fn on_ready(&self, renderer: Arc<dyn Renderer>, options: SessionOptions);

    /// Called once per run, after the whole retry budget is spent
    fn on_error(&self, error: &SessionError);
}

struct Inner {
    host: Arc<dyn RendererHost>,
    observer: Arc<dyn SessionObserver>,
    policy: InitPolicy,
    generation: AtomicU64,
    renderer: Mutex<Option<Arc<dyn Renderer>>>,
    options: Mutex<SessionOptions>,
}

/// Owner of one renderer instance
#[derive(Clone)]
pub struct RendererSession {
    inner: Arc<Inner>,
}

impl RendererSession {
    pub fn new(
        host: Arc<dyn RendererHost>,
        observer: Arc<dyn SessionObserver>,
        policy: InitPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                observer,
                policy,
                generation: AtomicU64::new(0),
                renderer: Mutex::new(None),
                options: Mutex::new(SessionOptions::default()),
            }),
        }
    }

    /// Start (or restart) initialization with `options`.
    ///
    /// Any run still in flight becomes stale.
    pub fn start(&self, options: SessionOptions) -> JoinHandle<()> {
        let token = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.options.lock() = options;
        tracing::debug!(token, enable_3d = options.enable_3d, "Starting renderer session");

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.initialize(token, options).await })
    }

    /// Invalidate every pending run and drop the renderer
    pub fn dispose(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.reset_container();
    }

    /// Forward a viewport resize to the live renderer
    pub fn resize(&self, width: u32, height: u32) {
        let Some(renderer) = self.renderer() else {
            return;
        };
        if !renderer.supports(Capability::SetSize) {
            return;
        }
        if let Err(e) = renderer.set_size(width, height) {
            tracing::warn!(width, height, error = %e, "Failed to resize renderer");
        }
    }

    /// Load a dropped `.ggb` file into the live renderer, then announce it
    /// again through `on_ready`.
    pub async fn import_scene_file(&self, file_name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let is_ggb = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ggb"));
        if !is_ggb {
            return Err(SessionError::UnsupportedFile(file_name.to_string()));
        }

        let renderer = self.renderer().ok_or(SessionError::NotReady)?;
        let data = STANDARD.encode(bytes);

        with_timeout(
            async { load_base64(renderer.as_ref(), &data).await.map_err(SessionError::from) },
            self.inner.policy.applet_timeout,
            "GeoGebra file load timeout",
        )
        .await?;

        tracing::info!(file = file_name, size = bytes.len(), "Imported scene file");
        // The renderer may have been replaced while loading.
        if let Some(current) = self.renderer() {
            self.inner.observer.on_ready(current, self.options());
        }
        Ok(())
    }

    pub fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.inner.renderer.lock().clone()
    }

    pub fn options(&self) -> SessionOptions {
        *self.inner.options.lock()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }

    fn checkpoint(&self, token: u64) -> Result<(), SessionError> {
        if self.is_current(token) {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    fn reset_container(&self) {
        self.host.clear_container();
        *self.renderer.lock() = None;
    }

    async fn initialize(self: Arc<Self>, token: u64, options: SessionOptions) {
        let policy = RetryPolicy::fixed(self.policy.max_retries, self.policy.retry_delay);
        let result = Retry::new(policy)
            .should_retry(|e: &SessionError, _| !e.is_cancelled())
            .on_retry(|e, attempt| {
                tracing::warn!(attempt, error = %e, "Retrying GeoGebra init");
            })
            .run(|attempt| {
                let inner = self.clone();
                async move { inner.attempt(token, options, attempt).await }
            })
            .await;

        match result {
            Ok(renderer) => {
                let announced = {
                    let mut slot = self.renderer.lock();
                    if self.is_current(token) {
                        *slot = Some(renderer.clone());
                        true
                    } else {
                        false
                    }
                };
                if !announced {
                    tracing::debug!(token, "Dropping renderer from stale init");
                    return;
                }

                tracing::info!(enable_3d = options.enable_3d, "GeoGebra renderer ready");
                self.observer.on_ready(renderer.clone(), options);
                apply_view(renderer.as_ref(), &options);
            }
            Err(e) if e.is_cancelled() || !self.is_current(token) => {
                tracing::debug!(token, "Stale renderer init abandoned");
            }
            Err(e) => {
                tracing::error!(error = %e, "GeoGebra init failed");
                self.observer.on_error(&e);
            }
        }
    }

    async fn attempt(
        &self,
        token: u64,
        options: SessionOptions,
        attempt: u32,
    ) -> Result<Arc<dyn Renderer>, SessionError> {
        self.checkpoint(token)?;
        self.reset_container();

        self.ensure_entry_point(token, attempt).await?;
        self.checkpoint(token)?;

        let renderer = self.construct(options).await?;
        self.checkpoint(token)?;
        Ok(renderer)
    }

    async fn ensure_entry_point(&self, token: u64, attempt: u32) -> Result<(), SessionError> {
        if self.host.entry_point_available() {
            return Ok(());
        }

        // A retried attempt re-appends to recover from a corrupt load.
        if !self.host.loader_script_present() || attempt > 0 {
            self.host.append_loader_script(&loader_script_url());
        }

        let deadline = Instant::now() + self.policy.script_timeout;
        while Instant::now() < deadline {
            if self.host.entry_point_available() {
                return Ok(());
            }
            self.checkpoint(token)?;
            sleep(self.policy.poll_interval).await;
        }

        Err(TimedOut {
            message: "GeoGebra API load timeout".to_string(),
            after: self.policy.script_timeout,
        }
        .into())
    }

    async fn construct(&self, options: SessionOptions) -> Result<Arc<dyn Renderer>, SessionError> {
        with_timeout(
            self.construct_applet(options),
            self.policy.applet_timeout,
            "GeoGebra applet init timeout",
        )
        .await
    }

    async fn construct_applet(
        &self,
        options: SessionOptions,
    ) -> Result<Arc<dyn Renderer>, SessionError> {
        let size = self
            .host
            .container_size()
            .ok_or(SessionError::ContainerUnavailable)?;

        let (loaded, rx) = completion();
        self.host.construct(
            AppletParams::new(&options, size),
            Box::new(move |renderer| {
                loaded.complete(renderer);
            }),
        )?;

        match rx.await {
            Ok(Some(renderer)) => Ok(renderer),
            Ok(None) => Err(SessionError::MissingInstance),
            Err(_) => Err(RendererError::CallbackDropped.into()),
        }
    }
}

fn warn_on_failure<T>(method: &str, result: Result<T, RendererError>) {
    if let Err(e) = result {
        tracing::warn!(method, error = %e, "Renderer view adjustment failed");
    }
}

/// Post-init view adjustments; failures only degrade the layout
fn apply_view(renderer: &dyn Renderer, options: &SessionOptions) {
    if options.enable_3d && renderer.supports(Capability::ExecuteCommand) {
        warn_on_failure("executeCommand", renderer.execute_command("ShowView(5, true)"));
    }

    if !options.hide_sidebar {
        return;
    }

    let perspective = if options.enable_3d { "G3D" } else { "G" };
    if renderer.supports(Capability::SetPerspective) {
        warn_on_failure("setPerspective", renderer.set_perspective(perspective));
    }
    if renderer.supports(Capability::SetShowAlgebraInput) {
        warn_on_failure("setShowAlgebraInput", renderer.set_show_algebra_input(false));
    }
    if renderer.supports(Capability::SetShowToolBar) {
        warn_on_failure("setShowToolBar", renderer.set_show_tool_bar(false));
    }
}
