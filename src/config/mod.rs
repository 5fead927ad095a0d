//! Configuration management for tilexport
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use tilexport::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Finalize task type: {}", config.queue.finalize_task_type);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TILEXPORT__<section>__<key>`
//!
//! Examples:
//! - `TILEXPORT__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `TILEXPORT__QUEUE__MAX_ATTEMPTS=10`
//! - `TILEXPORT__STORAGE__TILE_SIZE_ESTIMATE=16KB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/tilexport.toml`.
//! This can be overridden using the `TILEXPORT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    CatalogConfig, Config, HttpSettings, JobManagerConfig, QueueConfig, RoiConfig, ServerConfig,
    StorageConfig,
};
pub use validation::ValidationError;

use crate::geometry::SimilarityOptions;
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
    /// Returns an error if the configuration file is malformed or a value is
    /// out of range.
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

    pub fn similarity_options(&self) -> SimilarityOptions {
        SimilarityOptions {
            min_contained_percentage: self.roi.min_contained_percentage,
            buffer_meters: self.roi.buffer_meters,
        }
    }
}
