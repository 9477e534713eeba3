//! Scriptable renderer and host for deterministic tests
//!
//! [`MockRenderer`] records every call it receives and lets tests decide how
//! the optional callback APIs behave. [`MockRendererHost`] plays the page:
//! it tracks loader scripts and hands out the mock renderer from its loaded
//! callback.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ggbpuppy::renderer::mock::{MockCall, MockRenderer};
//! use ggbpuppy::share::ShareService;
//!
//! let renderer = Arc::new(MockRenderer::new());
//! assert!(ShareService::execute_share_code(renderer.as_ref(), "A=(1,2)"));
//! assert_eq!(renderer.calls(), vec![MockCall::Reset, MockCall::Eval("A=(1,2)".into())]);
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;

use super::callback::{DoneCallback, SvgCallback};
use super::{
    AppletParams, Base64Export, Capability, LoadCallback, Renderer, RendererError, RendererHost,
};

/// A call received by [`MockRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Eval(String),
    Reset,
    GetBase64,
    SetBase64(String),
    SetSize(u32, u32),
    SetPerspective(String),
    ExecuteCommand(String),
    ShowAlgebraInput(bool),
    ShowToolBar(bool),
    PngExport,
    SvgExport,
}

/// How `getBase64` answers
#[derive(Debug, Clone)]
pub enum SnapshotBehavior {
    Ready(String),
    Deferred(String),
    Fails,
}

/// How `setBase64` treats its done callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreBehavior {
    /// Call back once, right away
    Immediate,
    /// Call back twice
    Twice,
    /// Keep the callback and never call it
    Never,
    /// Return an error for the first `n` calls, then call back once
    FailTimes(u32),
}

/// A construction object reported by the inspection APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockObject {
    pub name: String,
    pub visible: bool,
    pub definition: String,
}

impl MockObject {
    pub fn new(name: &str, definition: &str) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            definition: definition.to_string(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Renderer double capturing every interaction
pub struct MockRenderer {
    capabilities: HashSet<Capability>,
    calls: Mutex<Vec<MockCall>>,
    failing_statements: HashSet<String>,
    fail_reset: bool,
    snapshot: SnapshotBehavior,
    restore: RestoreBehavior,
    restore_failures: AtomicU32,
    held_callbacks: Mutex<Vec<DoneCallback>>,
    objects: Vec<MockObject>,
    png: String,
    svg: String,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    /// Mock supporting every optional capability
    pub fn new() -> Self {
        let capabilities = [
            Capability::GetBase64,
            Capability::SetBase64,
            Capability::SetSize,
            Capability::SetPerspective,
            Capability::ExecuteCommand,
            Capability::SetShowAlgebraInput,
            Capability::SetShowToolBar,
            Capability::ObjectInspection,
            Capability::PngExport,
            Capability::SvgExport,
        ]
        .into_iter()
        .collect();

        Self {
            capabilities,
            calls: Mutex::new(Vec::new()),
            failing_statements: HashSet::new(),
            fail_reset: false,
            snapshot: SnapshotBehavior::Ready("UEsDBBQAAAAI".to_string()),
            restore: RestoreBehavior::Immediate,
            restore_failures: AtomicU32::new(0),
            held_callbacks: Mutex::new(Vec::new()),
            objects: Vec::new(),
            png: "iVBORw0KGgo=".to_string(),
            svg: "<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string(),
        }
    }

    /// Mock with only `evalCommand` and `reset`
    pub fn minimal() -> Self {
        let mut renderer = Self::new();
        renderer.capabilities.clear();
        renderer
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.capabilities.remove(&capability);
        self
    }

    /// Make `evalCommand` reject this statement
    pub fn failing_on(mut self, statement: &str) -> Self {
        self.failing_statements.insert(statement.to_string());
        self
    }

    pub fn failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    pub fn with_snapshot(mut self, behavior: SnapshotBehavior) -> Self {
        self.snapshot = behavior;
        self
    }

    pub fn with_restore(mut self, behavior: RestoreBehavior) -> Self {
        self.restore = behavior;
        self
    }

    pub fn with_objects(mut self, objects: Vec<MockObject>) -> Self {
        self.objects = objects;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Statements passed to `evalCommand`, in order
    pub fn evaluated(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                MockCall::Eval(statement) => Some(statement.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn reset_count(&self) -> usize {
        self.count(|call| *call == MockCall::Reset)
    }

    pub fn restore_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::SetBase64(_)))
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    fn require(&self, capability: Capability) -> Result<(), RendererError> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(RendererError::Unsupported(capability.method_name()))
        }
    }
}

impl Renderer for MockRenderer {
    fn eval_command(&self, statement: &str) -> Result<(), RendererError> {
        self.record(MockCall::Eval(statement.to_string()));
        if self.failing_statements.contains(statement) {
            return Err(RendererError::Rejected(statement.to_string()));
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), RendererError> {
        self.record(MockCall::Reset);
        if self.fail_reset {
            return Err(RendererError::Failed("reset refused".into()));
        }
        Ok(())
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn get_base64(&self) -> Result<Base64Export, RendererError> {
        self.require(Capability::GetBase64)?;
        self.record(MockCall::GetBase64);
        match &self.snapshot {
            SnapshotBehavior::Ready(data) => Ok(Base64Export::Ready(data.clone())),
            SnapshotBehavior::Deferred(data) => {
                let data = data.clone();
                Ok(Base64Export::Pending(
                    async move {
                        tokio::task::yield_now().await;
                        Ok(data)
                    }
                    .boxed(),
                ))
            }
            SnapshotBehavior::Fails => Err(RendererError::Failed("getBase64 failed".into())),
        }
    }

    fn set_base64(&self, data: &str, on_done: DoneCallback) -> Result<(), RendererError> {
        self.require(Capability::SetBase64)?;
        self.record(MockCall::SetBase64(data.to_string()));
        match self.restore {
            RestoreBehavior::Immediate => on_done(),
            RestoreBehavior::Twice => {
                on_done();
                on_done();
            }
            RestoreBehavior::Never => self.held_callbacks.lock().push(on_done),
            RestoreBehavior::FailTimes(times) => {
                if self.restore_failures.fetch_add(1, Ordering::SeqCst) < times {
                    return Err(RendererError::Failed("setBase64 rejected".into()));
                }
                on_done();
            }
        }
        Ok(())
    }

    fn set_size(&self, width: u32, height: u32) -> Result<(), RendererError> {
        self.require(Capability::SetSize)?;
        self.record(MockCall::SetSize(width, height));
        Ok(())
    }

    fn set_perspective(&self, perspective: &str) -> Result<(), RendererError> {
        self.require(Capability::SetPerspective)?;
        self.record(MockCall::SetPerspective(perspective.to_string()));
        Ok(())
    }

    fn execute_command(&self, command: &str) -> Result<bool, RendererError> {
        self.require(Capability::ExecuteCommand)?;
        self.record(MockCall::ExecuteCommand(command.to_string()));
        Ok(true)
    }

    fn set_show_algebra_input(&self, show: bool) -> Result<(), RendererError> {
        self.require(Capability::SetShowAlgebraInput)?;
        self.record(MockCall::ShowAlgebraInput(show));
        Ok(())
    }

    fn set_show_tool_bar(&self, show: bool) -> Result<(), RendererError> {
        self.require(Capability::SetShowToolBar)?;
        self.record(MockCall::ShowToolBar(show));
        Ok(())
    }

    fn get_all_object_names(&self) -> Result<Vec<String>, RendererError> {
        self.require(Capability::ObjectInspection)?;
        Ok(self.objects.iter().map(|o| o.name.clone()).collect())
    }

    fn get_visible(&self, name: &str) -> Result<bool, RendererError> {
        self.require(Capability::ObjectInspection)?;
        Ok(self
            .objects
            .iter()
            .any(|o| o.name == name && o.visible))
    }

    fn get_command_string(&self, name: &str) -> Result<String, RendererError> {
        self.require(Capability::ObjectInspection)?;
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.definition.clone())
            .ok_or_else(|| RendererError::Failed(format!("unknown object {}", name)))
    }

    fn get_png_base64(
        &self,
        _scale: f64,
        _transparent: bool,
        _dpi: u32,
    ) -> Result<String, RendererError> {
        self.require(Capability::PngExport)?;
        self.record(MockCall::PngExport);
        Ok(self.png.clone())
    }

    fn export_svg(&self, on_done: SvgCallback) -> Result<(), RendererError> {
        self.require(Capability::SvgExport)?;
        self.record(MockCall::SvgExport);
        on_done(self.svg.clone());
        Ok(())
    }
}

/// How the mock host answers one `construct` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructBehavior {
    /// Fire the loaded callback with the renderer right away
    Load,
    /// Fire the loaded callback after a delay
    LoadAfter(Duration),
    /// Fire the loaded callback without an instance
    LoadWithoutInstance,
    /// Never fire the loaded callback
    Hang,
    /// Fail synchronously
    Fail,
}

/// Page double for [`super::RendererSession`]
pub struct MockRendererHost {
    renderer: Arc<MockRenderer>,
    entry_point: AtomicBool,
    script_loads: bool,
    scripts: Mutex<Vec<String>>,
    clears: AtomicU32,
    container: Mutex<Option<(u32, u32)>>,
    behaviors: Mutex<VecDeque<ConstructBehavior>>,
    constructed: Mutex<Vec<AppletParams>>,
    pending: Mutex<Vec<LoadCallback>>,
}

impl MockRendererHost {
    pub fn new(renderer: Arc<MockRenderer>) -> Self {
        Self {
            renderer,
            entry_point: AtomicBool::new(false),
            script_loads: true,
            scripts: Mutex::new(Vec::new()),
            clears: AtomicU32::new(0),
            container: Mutex::new(Some((800, 600))),
            behaviors: Mutex::new(VecDeque::new()),
            constructed: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The entry point is defined before any script is appended
    pub fn with_entry_point(self) -> Self {
        self.entry_point.store(true, Ordering::SeqCst);
        self
    }

    /// Appending the loader script never defines the entry point
    pub fn with_broken_script(mut self) -> Self {
        self.script_loads = false;
        self
    }

    pub fn with_container(self, size: Option<(u32, u32)>) -> Self {
        *self.container.lock() = size;
        self
    }

    /// Behaviors for successive `construct` calls; `Load` once exhausted
    pub fn with_constructs(self, behaviors: Vec<ConstructBehavior>) -> Self {
        *self.behaviors.lock() = behaviors.into();
        self
    }

    pub fn renderer(&self) -> Arc<MockRenderer> {
        self.renderer.clone()
    }

    pub fn appended_scripts(&self) -> Vec<String> {
        self.scripts.lock().clone()
    }

    pub fn clear_count(&self) -> u32 {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn constructed(&self) -> Vec<AppletParams> {
        self.constructed.lock().clone()
    }

    /// Fire every loaded callback kept by `Hang`
    pub fn release_pending(&self) {
        let pending: Vec<LoadCallback> = self.pending.lock().drain(..).collect();
        for on_load in pending {
            on_load(Some(self.renderer.clone() as Arc<dyn Renderer>));
        }
    }
}

impl RendererHost for MockRendererHost {
    fn entry_point_available(&self) -> bool {
        self.entry_point.load(Ordering::SeqCst)
    }

    fn loader_script_present(&self) -> bool {
        !self.scripts.lock().is_empty()
    }

    fn append_loader_script(&self, url: &str) {
        self.scripts.lock().push(url.to_string());
        if self.script_loads {
            self.entry_point.store(true, Ordering::SeqCst);
        }
    }

    fn clear_container(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn container_size(&self) -> Option<(u32, u32)> {
        *self.container.lock()
    }

    fn construct(&self, params: AppletParams, on_load: LoadCallback) -> Result<(), RendererError> {
        self.constructed.lock().push(params);
        let behavior = self
            .behaviors
            .lock()
            .pop_front()
            .unwrap_or(ConstructBehavior::Load);

        let renderer = self.renderer.clone() as Arc<dyn Renderer>;
        match behavior {
            ConstructBehavior::Load => on_load(Some(renderer)),
            ConstructBehavior::LoadAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_load(Some(renderer));
                });
            }
            ConstructBehavior::LoadWithoutInstance => on_load(None),
            ConstructBehavior::Hang => self.pending.lock().push(on_load),
            ConstructBehavior::Fail => {
                return Err(RendererError::Failed("applet construction failed".into()))
            }
        }
        Ok(())
    }
}
