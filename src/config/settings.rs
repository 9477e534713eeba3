use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::renderer::InitPolicy;
use crate::share::RestoreOptions;
use crate::util::paths::config_path;
use crate::util::RetryPolicy;
use crate::web::ServerConfig;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Which backend persists share records
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// HTTP share backend
    Remote,
    /// SQLite file in the data directory
    #[default]
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Origin of the share backend (remote mode only)
    pub api_base_url: String,
    /// Extra read attempts while a fresh share is not visible yet
    pub max_read_retries: u32,
    /// Base of the linear read backoff
    pub read_retry_delay: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            api_base_url: "http://127.0.0.1:3000".to_string(),
            max_read_retries: 4,
            read_retry_delay: Duration::from_millis(350),
        }
    }
}

/// Timing of the share viewer pipeline
#[derive(Debug, Clone, Default)]
pub struct ViewerConfig {
    /// Renderer initialization budget
    pub init: InitPolicy,
    /// Scene restore budget
    pub restore: RestoreOptions,
    /// Retries for fetching the share record itself
    pub data_load: RetryPolicy,
}

/// Stepwise runner interval bounds
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    pub default_interval: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_millis(300),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(3),
        }
    }
}

impl RunnerConfig {
    /// Clamp a user supplied interval into the configured range
    pub fn clamp_interval(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_interval, self.max_interval)
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub viewer: ViewerConfig,
    pub runner: RunnerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlStorageConfig {
    mode: Option<StorageMode>,
    api_base_url: Option<String>,
    max_read_retries: Option<u32>,
    read_retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlViewerConfig {
    init_retries: Option<u32>,
    init_retry_delay_ms: Option<u64>,
    script_timeout_ms: Option<u64>,
    applet_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    scene_restore_timeout_ms: Option<u64>,
    scene_restore_retries: Option<u32>,
    scene_restore_retry_delay_ms: Option<u64>,
    data_load_retries: Option<u32>,
    data_load_retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlRunnerConfig {
    default_interval_secs: Option<f64>,
    min_interval_secs: Option<f64>,
    max_interval_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlServerConfig {
    host: Option<String>,
    port: Option<u16>,
    assets_dir: Option<PathBuf>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
struct TomlConfig {
    storage: Option<TomlStorageConfig>,
    viewer: Option<TomlViewerConfig>,
    runner: Option<TomlRunnerConfig>,
    server: Option<TomlServerConfig>,
}

fn millis(value: Option<u64>, target: &mut Duration) {
    if let Some(ms) = value {
        *target = Duration::from_millis(ms);
    }
}

fn secs(value: Option<f64>, target: &mut Duration) {
    if let Some(s) = value.filter(|s| s.is_finite() && *s >= 0.0) {
        *target = Duration::from_secs_f64(s);
    }
}

fn set<T>(value: Option<T>, target: &mut T) {
    if let Some(value) = value {
        *target = value;
    }
}

impl Config {
    /// Load configuration from file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        match fs::read_to_string(&config_file) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %config_file.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    /// Parse a TOML document and merge it over the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(storage) = toml_config.storage {
            set(storage.mode, &mut config.storage.mode);
            set(storage.api_base_url, &mut config.storage.api_base_url);
            set(storage.max_read_retries, &mut config.storage.max_read_retries);
            millis(storage.read_retry_delay_ms, &mut config.storage.read_retry_delay);
        }

        if let Some(viewer) = toml_config.viewer {
            let init = &mut config.viewer.init;
            set(viewer.init_retries, &mut init.max_retries);
            millis(viewer.init_retry_delay_ms, &mut init.retry_delay);
            millis(viewer.script_timeout_ms, &mut init.script_timeout);
            millis(viewer.applet_timeout_ms, &mut init.applet_timeout);
            millis(viewer.poll_interval_ms, &mut init.poll_interval);

            let restore = &mut config.viewer.restore;
            millis(viewer.scene_restore_timeout_ms, &mut restore.timeout);
            set(viewer.scene_restore_retries, &mut restore.retries);
            millis(viewer.scene_restore_retry_delay_ms, &mut restore.retry_delay);

            let data_load = &mut config.viewer.data_load;
            set(viewer.data_load_retries, &mut data_load.retries);
            millis(viewer.data_load_retry_delay_ms, &mut data_load.delay);
        }

        if let Some(runner) = toml_config.runner {
            secs(runner.default_interval_secs, &mut config.runner.default_interval);
            secs(runner.min_interval_secs, &mut config.runner.min_interval);
            secs(runner.max_interval_secs, &mut config.runner.max_interval);
            if config.runner.min_interval > config.runner.max_interval {
                std::mem::swap(&mut config.runner.min_interval, &mut config.runner.max_interval);
            }
        }

        if let Some(server) = toml_config.server {
            set(server.host, &mut config.server.host);
            set(server.port, &mut config.server.port);
            if server.assets_dir.is_some() {
                config.server.assets_dir = server.assets_dir;
            }
        }

        Ok(config)
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage.mode = mode;
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.storage.api_base_url = url.into();
        self
    }
}
