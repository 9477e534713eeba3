//! Stepwise execution of GeoGebra source against the live renderer.
//!
//! One statement is evaluated at a time, with a pause between statements so
//! the construction can be followed. Progress is published through a watch
//! channel for the editor to highlight the current source line.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::code::parse_commands_with_line_index;
use crate::config::RunnerConfig;
use crate::renderer::Renderer;
use crate::util::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Published run state; the default is "idle"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub running: bool,
    /// Zero-based source line of the statement being evaluated
    pub current_line: Option<usize>,
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing ran: already running, no renderer, or no statements
    Skipped,
    /// Every statement was evaluated; `failed` of them were rejected
    Completed { executed: usize, failed: usize },
    /// `stop()` interrupted the run after `executed` statements
    Stopped { executed: usize },
}

struct ActiveRun {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

struct Inner {
    config: RunnerConfig,
    renderer: Mutex<Option<Arc<dyn Renderer>>>,
    active: Mutex<Option<ActiveRun>>,
    next_id: AtomicU64,
    state: watch::Sender<RunState>,
}

/// Runs statements one at a time with cooperative cancellation
#[derive(Clone)]
pub struct StepwiseRunner {
    inner: Arc<Inner>,
}

impl Default for StepwiseRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepwiseRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Runner whose pauses stay within `config`'s interval bounds
    pub fn with_config(config: RunnerConfig) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            inner: Arc::new(Inner {
                config,
                renderer: Mutex::new(None),
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
                state,
            }),
        }
    }

    pub fn attach(&self, renderer: Arc<dyn Renderer>) {
        *self.inner.renderer.lock() = Some(renderer);
    }

    /// Forget the renderer and stop any run using it
    pub fn detach(&self) {
        self.stop();
        *self.inner.renderer.lock() = None;
    }

    pub fn is_running(&self) -> bool {
        self.inner.active.lock().is_some()
    }

    pub fn state(&self) -> RunState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    /// [`run`](Self::run) at the configured default interval
    pub async fn run_default(&self, code: &str) -> RunOutcome {
        self.run(code, self.inner.config.default_interval).await
    }

    /// Evaluate `code` statement by statement, pausing `interval` in between.
    ///
    /// `interval` is clamped into the configured bounds.
    pub async fn run(&self, code: &str, interval: Duration) -> RunOutcome {
        let interval = self.inner.config.clamp_interval(interval);
        let Some(renderer) = self.inner.renderer.lock().clone() else {
            return RunOutcome::Skipped;
        };
        let commands = parse_commands_with_line_index(code);
        if commands.is_empty() {
            return RunOutcome::Skipped;
        }

        let total = commands.len();
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = {
            let mut active = self.inner.active.lock();
            if active.is_some() {
                return RunOutcome::Skipped;
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
            *active = Some(ActiveRun {
                id,
                cancelled: cancelled.clone(),
            });
            id
        };

        self.publish(id, |state| {
            state.running = true;
            state.current_line = None;
            state.progress = Some(Progress { current: 0, total });
        });
        tracing::debug!(run = id, total, interval_ms = interval.as_millis() as u64, "Run started");

        if let Err(e) = renderer.reset() {
            tracing::warn!(error = %e, "Failed to reset canvas");
        }

        let mut executed = 0;
        let mut failed = 0;
        for (index, command) in commands.iter().enumerate() {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }

            self.publish(id, |state| {
                state.current_line = Some(command.source_line);
                state.progress = Some(Progress {
                    current: index + 1,
                    total,
                });
            });

            if let Err(e) = renderer.eval_command(&command.statement) {
                failed += 1;
                tracing::warn!(
                    line = command.source_line + 1,
                    statement = %command.statement,
                    error = %e,
                    "Statement failed"
                );
            }
            executed += 1;

            if index + 1 < total {
                sleep(interval).await;
            }
        }

        self.finish(id);
        if cancelled.load(Ordering::SeqCst) {
            tracing::debug!(run = id, executed, "Run stopped");
            RunOutcome::Stopped { executed }
        } else {
            RunOutcome::Completed { executed, failed }
        }
    }

    /// Cancel the active run and clear the run state right away
    pub fn stop(&self) {
        if let Some(active) = self.inner.active.lock().take() {
            active.cancelled.store(true, Ordering::SeqCst);
        }
        self.inner.state.send_replace(RunState::default());
    }

    /// Reset the canvas; refused while a run is active
    pub fn reset(&self) -> bool {
        if self.is_running() {
            return false;
        }
        let Some(renderer) = self.inner.renderer.lock().clone() else {
            return false;
        };
        if let Err(e) = renderer.reset() {
            tracing::warn!(error = %e, "Failed to reset canvas");
        }
        true
    }

    /// Update the state only while run `id` is still the active one
    fn publish(&self, id: u64, update: impl FnOnce(&mut RunState)) {
        let active = self.inner.active.lock();
        if active.as_ref().is_some_and(|run| run.id == id) {
            self.inner.state.send_modify(update);
        }
    }

    fn finish(&self, id: u64) {
        let mut active = self.inner.active.lock();
        if active.as_ref().is_some_and(|run| run.id == id) {
            *active = None;
            self.inner.state.send_replace(RunState::default());
        }
    }
}
