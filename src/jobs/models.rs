use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::geometry::Roi;

/// Lifecycle status shared by jobs and tasks in the job store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    #[serde(rename = "In-Progress")]
    InProgress,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "Pending",
            OperationStatus::InProgress => "In-Progress",
            OperationStatus::Completed => "Completed",
            OperationStatus::Failed => "Failed",
        }
    }
}

/// Subscriber notified when a job reaches a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackTarget {
    pub url: String,
}

impl CallbackTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLinks {
    #[serde(rename = "dataURI")]
    pub data_uri: String,
    #[serde(rename = "metadataURI")]
    pub metadata_uri: String,
}

/// Payload POSTed to every callback target of a finalized job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
    pub status: OperationStatus,
    pub job_id: Uuid,
    pub record_catalog_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ArtifactLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<Roi>,
}

impl CallbackOutcome {
    /// Failure payload carrying only the fields every outcome needs
    pub fn failure(job: &JobRecord, reason: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Failed,
            job_id: job.id,
            record_catalog_id: job.internal_id.clone(),
            expiration_time: None,
            file_size: None,
            links: None,
            error_reason: Some(reason.into()),
            roi: Some(job.parameters.roi.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
    #[serde(
        rename = "cleanupExpirationTimeUTC",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cleanup_expiration_time_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParameters {
    pub roi: Roi,
    pub crs: String,
    #[serde(default)]
    pub callbacks: Vec<CallbackTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_params: Option<CallbackOutcome>,
    /// Package location relative to the export output directory
    #[serde(default)]
    pub package_relative_path: String,
    #[serde(default)]
    pub estimated_size_bytes: u64,
    #[serde(default)]
    pub cleanup_data: CleanupData,
    #[serde(default)]
    pub additional_params: Map<String, Value>,
}

/// Export job as stored by the job store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub resource_id: String,
    pub version: String,
    pub internal_id: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub percentage: Option<u8>,
    pub parameters: JobParameters,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub task_count: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub failed_tasks: u32,
    #[serde(default)]
    pub is_cleaned: bool,
}

/// Filter for listing jobs; unset fields are not constrained
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobQuery {
    pub resource_id: Option<String>,
    pub version: Option<String>,
    pub internal_id: Option<String>,
    pub status: Option<OperationStatus>,
    pub is_cleaned: Option<bool>,
}

impl JobQuery {
    pub fn by_status(status: OperationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, job: &JobRecord) -> bool {
        self.resource_id.as_ref().is_none_or(|v| *v == job.resource_id)
            && self.version.as_ref().is_none_or(|v| *v == job.version)
            && self.internal_id.as_ref().is_none_or(|v| *v == job.internal_id)
            && self.status.is_none_or(|v| v == job.status)
            && self.is_cleaned.is_none_or(|v| v == job.is_cleaned)
    }
}

/// Partial job update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    /// `Some(None)` clears the stored percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Option<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<JobParameters>,
}

impl JobUpdate {
    pub fn apply(&self, job: &mut JobRecord) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(percentage) = self.percentage {
            job.percentage = percentage;
        }
        if let Some(reason) = &self.reason {
            job.reason = Some(reason.clone());
        }
        if let Some(parameters) = &self.parameters {
            job.parameters = parameters.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub resource_id: String,
    pub version: String,
    pub internal_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub product_type: String,
    pub description: Option<String>,
    pub status: OperationStatus,
    pub percentage: u8,
    pub parameters: JobParameters,
}

/// Finalize work item handed out by the work queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeTask {
    pub job_id: Uuid,
    pub task_id: Uuid,
    pub attempts: u32,
    pub exporter_task_status: OperationStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parameters of a finalize task before the queue assigns identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFinalizeTask {
    pub exporter_task_status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
