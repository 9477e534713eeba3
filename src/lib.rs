pub mod code;
pub mod config;
pub mod data;
pub mod export;
pub mod renderer;
pub mod runner;
pub mod share;
pub mod storage;
pub mod util;
pub mod web;

pub use code::{parse_commands, parse_commands_with_line_index, ParsedCommand};
pub use config::{Config, StorageMode};
pub use data::{Database, KvStore, SceneSnapshot, ShareOptions, ShareRecord};
pub use renderer::{Renderer, RendererError, RendererHost, RendererSession, SessionError};
pub use runner::{RunOutcome, RunState, StepwiseRunner};
pub use share::{ShareError, ShareLinks, ShareService, ShareViewer, ViewerState};
pub use storage::{LocalStorage, RemoteStorage, StorageError, StorageProvider};
pub use util::{retry_async, sleep, with_timeout, RetryPolicy, TimedOut};
