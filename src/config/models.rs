use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub job_manager: JobManagerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub roi: RoiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Liveness endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Job store service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobManagerConfig {
    #[serde(default = "default_job_manager_url")]
    pub url: String,
    #[serde(default = "default_job_type")]
    pub job_type: String,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            url: default_job_manager_url(),
            job_type: default_job_type(),
        }
    }
}

fn default_job_manager_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_job_type() -> String {
    "Export".to_string()
}

/// Work queue and finalize loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_url")]
    pub url: String,
    #[serde(default = "default_finalize_task_type")]
    pub finalize_task_type: String,
    /// A task dequeued with more attempts than this is abandoned
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Idle sleep when a loop iteration found no work
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            finalize_task_type: default_finalize_task_type(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_queue_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_finalize_task_type() -> String {
    "finalize".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
        }
    }
}

fn default_catalog_url() -> String {
    "http://localhost:8083".to_string()
}

/// Duplicate detection tolerances
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoiConfig {
    #[serde(default = "default_min_contained_percentage")]
    pub min_contained_percentage: f64,
    #[serde(default = "default_buffer_meters")]
    pub buffer_meters: f64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            min_contained_percentage: default_min_contained_percentage(),
            buffer_meters: default_buffer_meters(),
        }
    }
}

fn default_min_contained_percentage() -> f64 {
    90.0
}

fn default_buffer_meters() -> f64 {
    10.0
}

/// Package output and capacity estimation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_download_server_url")]
    pub download_server_url: String,
    #[serde(default = "default_tile_size_estimate")]
    pub tile_size_estimate: ByteSize,
    /// Multiplier applied to the space still owed to in-flight jobs
    #[serde(default = "default_reservation_buffer_factor")]
    pub reservation_buffer_factor: f64,
    #[serde(default = "default_cleanup_expiration_days")]
    pub cleanup_expiration_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            download_server_url: default_download_server_url(),
            tile_size_estimate: default_tile_size_estimate(),
            reservation_buffer_factor: default_reservation_buffer_factor(),
            cleanup_expiration_days: default_cleanup_expiration_days(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/packages")
}

fn default_download_server_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_tile_size_estimate() -> ByteSize {
    ByteSize(12 * 1024) // 12 KB
}

fn default_reservation_buffer_factor() -> f64 {
    1.2
}

fn default_cleanup_expiration_days() -> u32 {
    30
}

/// Outbound HTTP defaults (job store, queue, catalog and callbacks)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            callback_timeout_ms: default_callback_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_callback_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    concat!("tilexport/", env!("CARGO_PKG_VERSION")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.roi.min_contained_percentage, 90.0);
        assert_eq!(config.storage.tile_size_estimate.as_u64(), 12 * 1024);
        assert_eq!(config.job_manager.job_type, "Export");
    }
}
