mod settings;

pub use settings::{
    Config, RunnerConfig, StorageConfig, StorageMode, ViewerConfig, EXAMPLE_CONFIG,
};
