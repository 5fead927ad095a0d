use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::jobs::{ArtifactLinks, CallbackOutcome, JobRecord, OperationStatus};

pub const DEFAULT_FAILURE_REASON: &str = "export failed";

/// Post-processing of exporter output into a callback outcome
///
/// A success finalize returning anything but `Completed` means the artifact
/// was not ready and the task should be retried.
#[async_trait]
pub trait ArtifactFinalizer: Send + Sync {
    async fn finalize_success(&self, job: &JobRecord) -> CallbackOutcome;

    async fn finalize_failure(&self, job: &JobRecord, reason: Option<&str>) -> CallbackOutcome;
}

/// Packages written by the exporter under a local output directory
pub struct LocalArtifactFinalizer {
    output_dir: PathBuf,
    download_server_url: String,
    expiration_days: i64,
}

impl LocalArtifactFinalizer {
    pub fn new(
        output_dir: PathBuf,
        download_server_url: impl Into<String>,
        expiration_days: u32,
    ) -> Self {
        Self {
            output_dir,
            download_server_url: download_server_url.into().trim_end_matches('/').to_string(),
            expiration_days: i64::from(expiration_days),
        }
    }

    fn download_url(&self, relative: &str) -> String {
        format!("{}/downloads/{}", self.download_server_url, relative.trim_start_matches('/'))
    }

    fn expiration(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.expiration_days)
    }
}

fn metadata_path(relative: &str) -> String {
    Path::new(relative)
        .with_extension("json")
        .to_string_lossy()
        .into_owned()
}

#[async_trait]
impl ArtifactFinalizer for LocalArtifactFinalizer {
    async fn finalize_success(&self, job: &JobRecord) -> CallbackOutcome {
        let relative = job.parameters.package_relative_path.as_str();
        let package = self.output_dir.join(relative);
        let expiration = self.expiration();

        let file_size = match tokio::fs::metadata(&package).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                warn!(job_id = %job.id, path = %package.display(), "Package path is not a file");
                return CallbackOutcome::failure(job, format!("package {relative} is not a file"));
            }
            Err(err) => {
                warn!(
                    job_id = %job.id,
                    path = %package.display(),
                    error = %err,
                    "Package not readable"
                );
                let reason = format!("package {relative} unavailable: {err}");
                return CallbackOutcome::failure(job, reason);
            }
        };

        let metadata_relative = metadata_path(relative);
        let sidecar = json!({
            "jobId": job.id,
            "resourceId": job.resource_id,
            "version": job.version,
            "catalogId": job.internal_id,
            "crs": job.parameters.crs,
            "roi": job.parameters.roi,
            "fileSize": file_size,
            "expirationTime": expiration,
        });

        let body = match serde_json::to_vec_pretty(&sidecar) {
            Ok(body) => body,
            Err(err) => {
                return CallbackOutcome::failure(job, format!("metadata encoding failed: {err}"));
            }
        };
        if let Err(err) = tokio::fs::write(self.output_dir.join(&metadata_relative), body).await {
            warn!(job_id = %job.id, error = %err, "Failed to write package metadata");
            return CallbackOutcome::failure(job, format!("metadata write failed: {err}"));
        }

        debug!(job_id = %job.id, file_size, "Package finalized");
        CallbackOutcome {
            status: OperationStatus::Completed,
            job_id: job.id,
            record_catalog_id: job.internal_id.clone(),
            expiration_time: Some(expiration),
            file_size: Some(file_size),
            links: Some(ArtifactLinks {
                data_uri: self.download_url(relative),
                metadata_uri: self.download_url(&metadata_relative),
            }),
            error_reason: None,
            roi: Some(job.parameters.roi.clone()),
        }
    }

    async fn finalize_failure(&self, job: &JobRecord, reason: Option<&str>) -> CallbackOutcome {
        let mut outcome = CallbackOutcome::failure(job, reason.unwrap_or(DEFAULT_FAILURE_REASON));
        outcome.expiration_time = Some(self.expiration());
        outcome
    }
}
