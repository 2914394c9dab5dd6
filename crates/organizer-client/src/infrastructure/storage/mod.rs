//! Configuration persistence.

pub mod config;

pub use config::{
    config_file_path, load_config, save_config, ApiConfig, AppConfig, ConfigError, SessionConfig,
};
