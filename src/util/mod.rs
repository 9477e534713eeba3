//! Utility modules

pub mod ids;
pub mod paths;
pub mod retry;

pub use ids::{generate_share_id, is_valid_share_id};
pub use paths::{
    config_path, data_dir, init_data_dir, local_store_path, log_file_path, logs_dir,
    server_database_path,
};
pub use retry::{retry_async, sleep, with_timeout, Retry, RetryPolicy, TimedOut};
