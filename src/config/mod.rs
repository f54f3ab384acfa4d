//! Configuration for the download worker
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use download_worker::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Downloading into: {}", config.paths.temp_folder.display());
//! ```
//!
//! # Environment Variables
//!
//! Any setting can be overridden with `DOWNLOAD_WORKER__<section>__<key>`:
//! - `DOWNLOAD_WORKER__BROKER__HOST=rabbitmq`
//! - `DOWNLOAD_WORKER__DOWNLOADER__FS_THRESHOLD=10GB`
//! - `DOWNLOAD_WORKER__DOWNLOADER__WHITELIST=dummy.nl,beeldengeluid.nl`
//!
//! S3 credentials are read from `S3_ACCESS_KEY` / `S3_SECRET_KEY`, falling
//! back to `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/download-worker.toml`.
//! This can be overridden using the `DOWNLOAD_WORKER_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    BrokerConfig, Config, DownloaderConfig, HttpConfig, LoggingConfig, PathsConfig,
    ResultStoreConfig, S3Config,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, a threshold does not parse,
    /// or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
