//! In-memory collaborators shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use tilexport::callbacks::CallbackSender;
use tilexport::clients::{Catalog, ClientError, JobStore, LayerMetadata, WorkQueue};
use tilexport::export::DiskSpace;
use tilexport::finalizer::ArtifactFinalizer;
use tilexport::geometry::{Roi, RoiGeometry, RoiProperties};
use tilexport::jobs::{
    ArtifactLinks, CallbackOutcome, CallbackTarget, CleanupData, FinalizeTask, JobParameters,
    JobQuery, JobRecord, JobUpdate, NewFinalizeTask, NewJob, OperationStatus,
};

type Result<T> = std::result::Result<T, ClientError>;

pub const ZOOM_10: f64 = 0.0006866455078125;
pub const ZOOM_12: f64 = 0.000171661376953125;

pub fn square_roi(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Roi {
    Roi::single(
        RoiGeometry::rectangle(min_x, min_y, max_x, max_y),
        RoiProperties::new(ZOOM_10, 0.703125),
    )
}

pub fn job(status: OperationStatus, roi: Roi, callbacks: &[&str]) -> JobRecord {
    JobRecord {
        id: Uuid::new_v4(),
        resource_id: "orthophoto".to_string(),
        version: "1.0".to_string(),
        internal_id: "catalog-1".to_string(),
        status,
        percentage: Some(40),
        parameters: JobParameters {
            roi,
            crs: "EPSG:4326".to_string(),
            callbacks: callbacks.iter().map(|url| CallbackTarget::new(*url)).collect(),
            callback_params: None,
            package_relative_path: "pkg/orthophoto.gpkg".to_string(),
            estimated_size_bytes: 0,
            cleanup_data: CleanupData::default(),
            additional_params: Default::default(),
        },
        reason: None,
        task_count: 1,
        completed_tasks: 0,
        failed_tasks: 0,
        is_cleaned: false,
    }
}

pub fn layer() -> LayerMetadata {
    LayerMetadata {
        id: "catalog-1".to_string(),
        product_id: "orthophoto".to_string(),
        product_version: "1.0".to_string(),
        product_type: "Orthophoto".to_string(),
        footprint: RoiGeometry::rectangle(34.0, 31.0, 35.0, 32.0),
        max_resolution_deg: ZOOM_12,
    }
}

#[derive(Default)]
pub struct InMemoryJobStore {
    pub jobs: Mutex<Vec<JobRecord>>,
    pub updates: Mutex<Vec<(Uuid, JobUpdate)>>,
    pub created: Mutex<Vec<NewJob>>,
    pub deleted_tasks: Mutex<Vec<(Uuid, Uuid)>>,
    pub fail_updates: AtomicBool,
}

impl InMemoryJobStore {
    pub fn with_jobs(jobs: Vec<JobRecord>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            ..Default::default()
        }
    }

    pub fn job(&self, id: Uuid) -> JobRecord {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .unwrap()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| query.matches(job))
            .cloned()
            .collect())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("job {job_id}")))
    }

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                method: "PUT",
                url: format!("jobs/{job_id}"),
                status: 500,
            });
        }

        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| ClientError::NotFound(format!("job {job_id}")))?;
        update.apply(job);
        self.updates.lock().unwrap().push((job_id, update.clone()));
        Ok(())
    }

    async fn create_job(&self, new_job: &NewJob) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.jobs.lock().unwrap().push(JobRecord {
            id,
            resource_id: new_job.resource_id.clone(),
            version: new_job.version.clone(),
            internal_id: new_job.internal_id.clone(),
            status: new_job.status,
            percentage: Some(new_job.percentage),
            parameters: new_job.parameters.clone(),
            reason: None,
            task_count: 0,
            completed_tasks: 0,
            failed_tasks: 0,
            is_cleaned: false,
        });
        self.created.lock().unwrap().push(new_job.clone());
        Ok(id)
    }

    async fn delete_task(&self, job_id: Uuid, task_id: Uuid) -> Result<()> {
        self.deleted_tasks.lock().unwrap().push((job_id, task_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryWorkQueue {
    pub tasks: Mutex<VecDeque<FinalizeTask>>,
    pub acked: Mutex<Vec<(Uuid, Uuid)>>,
    pub rejected: Mutex<Vec<(Uuid, Uuid, bool)>>,
    pub enqueued: Mutex<Vec<(Uuid, String, NewFinalizeTask)>>,
}

impl InMemoryWorkQueue {
    pub fn with_task(task: FinalizeTask) -> Self {
        let queue = Self::default();
        queue.tasks.lock().unwrap().push_back(task);
        queue
    }

    pub fn acked(&self) -> Vec<(Uuid, Uuid)> {
        self.acked.lock().unwrap().clone()
    }

    pub fn rejected(&self) -> Vec<(Uuid, Uuid, bool)> {
        self.rejected.lock().unwrap().clone()
    }

    pub fn enqueued(&self) -> Vec<(Uuid, String, NewFinalizeTask)> {
        self.enqueued.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn dequeue(&self, _task_type: &str) -> Result<Option<FinalizeTask>> {
        Ok(self.tasks.lock().unwrap().pop_front())
    }

    async fn ack(&self, job_id: Uuid, task_id: Uuid) -> Result<()> {
        self.acked.lock().unwrap().push((job_id, task_id));
        Ok(())
    }

    async fn reject(&self, job_id: Uuid, task_id: Uuid, requeue: bool) -> Result<()> {
        self.rejected.lock().unwrap().push((job_id, task_id, requeue));
        Ok(())
    }

    async fn enqueue(&self, job_id: Uuid, task_type: &str, task: &NewFinalizeTask) -> Result<()> {
        self.enqueued
            .lock()
            .unwrap()
            .push((job_id, task_type.to_string(), task.clone()));
        Ok(())
    }

    async fn has_pending(&self, job_id: Uuid, task_type: &str) -> Result<bool> {
        let queued = self.tasks.lock().unwrap().iter().any(|task| task.job_id == job_id);
        let enqueued = self
            .enqueued
            .lock()
            .unwrap()
            .iter()
            .any(|(id, kind, _)| *id == job_id && kind == task_type);
        Ok(queued || enqueued)
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub calls: Mutex<Vec<(String, CallbackOutcome)>>,
}

impl RecordingSender {
    pub fn calls(&self) -> Vec<(String, CallbackOutcome)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackSender for RecordingSender {
    async fn send(&self, url: &str, outcome: &CallbackOutcome) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), outcome.clone()));
        Ok(())
    }
}

/// Success finalize returns `success_status`; failure finalize echoes the reason
pub struct StubArtifacts {
    pub success_status: OperationStatus,
}

impl StubArtifacts {
    pub fn ready() -> Self {
        Self {
            success_status: OperationStatus::Completed,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            success_status: OperationStatus::Failed,
        }
    }
}

#[async_trait]
impl ArtifactFinalizer for StubArtifacts {
    async fn finalize_success(&self, job: &JobRecord) -> CallbackOutcome {
        if self.success_status != OperationStatus::Completed {
            return CallbackOutcome::failure(job, "package missing");
        }

        CallbackOutcome {
            status: OperationStatus::Completed,
            job_id: job.id,
            record_catalog_id: job.internal_id.clone(),
            expiration_time: Some(Utc::now() + Duration::days(30)),
            file_size: Some(4096),
            links: Some(ArtifactLinks {
                data_uri: "http://downloads/pkg/orthophoto.gpkg".to_string(),
                metadata_uri: "http://downloads/pkg/orthophoto.json".to_string(),
            }),
            error_reason: None,
            roi: Some(job.parameters.roi.clone()),
        }
    }

    async fn finalize_failure(&self, job: &JobRecord, reason: Option<&str>) -> CallbackOutcome {
        let mut outcome = CallbackOutcome::failure(job, reason.unwrap_or("export failed"));
        outcome.expiration_time = Some(Utc::now() + Duration::days(30));
        outcome
    }
}

pub struct FixedDisk(pub Option<u64>);

impl DiskSpace for FixedDisk {
    fn available_bytes(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    pub layers: HashMap<String, LayerMetadata>,
}

impl InMemoryCatalog {
    pub fn with_layer(layer: LayerMetadata) -> Self {
        let mut layers = HashMap::new();
        layers.insert(layer.id.clone(), layer);
        Self { layers }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_layer(&self, catalog_id: &str) -> Result<Option<LayerMetadata>> {
        Ok(self.layers.get(catalog_id).cloned())
    }
}
