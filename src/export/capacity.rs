//! Approximate disk admission for new packages
//!
//! Estimates are point-in-time and are not re-checked when a job completes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::Disks;
use tracing::{debug, warn};

use super::error::{ExportError, Result};
use super::validation::ValidatedFeature;
use crate::clients::JobStore;
use crate::geometry::tile_count;
use crate::jobs::{JobQuery, JobRecord, OperationStatus};

/// Free space lookup for the filesystem holding a path
pub trait DiskSpace: Send + Sync {
    fn available_bytes(&self, path: &Path) -> Option<u64>;
}

/// Uses the mounted disk with the longest mount point prefixing the path
#[derive(Debug, Default)]
pub struct SysinfoDiskSpace;

impl DiskSpace for SysinfoDiskSpace {
    fn available_bytes(&self, path: &Path) -> Option<u64> {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
    }
}

/// Sum of tile counts across every feature and zoom level, times the per-tile size
pub fn estimate_package_size(features: &[ValidatedFeature], tile_size: u64) -> Result<u64> {
    let mut tiles = 0u64;
    for feature in features {
        for zoom in feature.min_zoom..=feature.max_zoom {
            tiles += tile_count(feature.bbox, zoom)?;
        }
    }
    Ok(tiles.saturating_mul(tile_size))
}

/// Space still owed to in-flight jobs, scaled by `buffer_factor`
pub fn reserved_bytes(jobs: &[JobRecord], buffer_factor: f64) -> u64 {
    let remaining: f64 = jobs
        .iter()
        .map(|job| {
            let done = f64::from(job.percentage.unwrap_or(0).min(100)) / 100.0;
            job.parameters.estimated_size_bytes as f64 * (1.0 - done)
        })
        .sum();

    (remaining * buffer_factor).round() as u64
}

pub struct CapacityChecker {
    disk: Arc<dyn DiskSpace>,
    store: Arc<dyn JobStore>,
    output_dir: PathBuf,
    buffer_factor: f64,
}

impl CapacityChecker {
    pub fn new(
        disk: Arc<dyn DiskSpace>,
        store: Arc<dyn JobStore>,
        output_dir: PathBuf,
        buffer_factor: f64,
    ) -> Self {
        Self {
            disk,
            store,
            output_dir,
            buffer_factor,
        }
    }

    /// Fail with `InsufficientStorage` when `required` bytes would not fit
    pub async fn ensure_capacity(&self, required: u64) -> Result<()> {
        let free = self.free_bytes().await?;

        let mut processing = Vec::new();
        for status in [OperationStatus::InProgress, OperationStatus::Pending] {
            processing.extend(self.store.find_jobs(&JobQuery::by_status(status)).await?);
        }

        let reserved = reserved_bytes(&processing, self.buffer_factor);
        let available = free.saturating_sub(reserved);
        debug!(free, reserved, available, required, "Capacity check");

        if required > available {
            warn!(required, available, "Not enough storage for export");
            return Err(ExportError::InsufficientStorage {
                required,
                available,
            });
        }

        Ok(())
    }

    /// Disk enumeration touches the filesystem, so it runs on the blocking pool
    async fn free_bytes(&self) -> Result<u64> {
        let disk = self.disk.clone();
        let dir = self.output_dir.clone();
        let free = tokio::task::spawn_blocking(move || disk.available_bytes(&dir))
            .await
            .map_err(|err| ExportError::Internal(format!("disk space lookup failed: {err}")))?;

        free.ok_or_else(|| {
            ExportError::Internal(format!(
                "no disk found for output directory {}",
                self.output_dir.display()
            ))
        })
    }
}
