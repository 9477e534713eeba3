//! Locations under the GGBPuppy data directory (`~/.ggbpuppy` by default)

use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory for this process; `None` keeps the default.
///
/// Call before anything reads a path. Only the first call takes effect.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if let Err(rejected) = DATA_DIR.set(path) {
        tracing::debug!(
            path = %rejected.display(),
            current = %data_dir().display(),
            "Data directory already set"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ggbpuppy")
}

pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Share backend database
pub fn server_database_path() -> PathBuf {
    data_dir().join("shares.db")
}

/// Database behind local-mode storage
pub fn local_store_path() -> PathBuf {
    data_dir().join("local.db")
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn log_file_path() -> PathBuf {
    logs_dir().join("ggbpuppy.log")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
