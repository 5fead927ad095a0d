//! Reuse of completed or in-flight jobs for equivalent export requests

use bon::Builder;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::Result;
use crate::clients::JobStore;
use crate::geometry::{Roi, SimilarityOptions, is_similar};
use crate::jobs::{
    CallbackOutcome, CallbackTarget, JobQuery, JobRecord, JobUpdate, OperationStatus,
};
use crate::observability::Metrics;

/// Identity and geometry of an incoming export request
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct DuplicateQuery {
    pub resource_id: String,
    pub version: String,
    pub catalog_id: String,
    pub roi: Roi,
    pub crs: String,
    #[builder(default)]
    pub callbacks: Vec<CallbackTarget>,
}

/// Handle to an in-flight job that already covers the request
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingHandle {
    pub job_id: Uuid,
    pub percentage: Option<u8>,
    pub status: OperationStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateHit {
    Completed(CallbackOutcome),
    Processing(ProcessingHandle),
}

/// Union of callback targets by URL; existing order first
pub fn merge_callback_targets(
    existing: &[CallbackTarget],
    incoming: &[CallbackTarget],
) -> Vec<CallbackTarget> {
    let mut merged: Vec<CallbackTarget> = Vec::with_capacity(existing.len() + incoming.len());
    for target in existing.iter().chain(incoming) {
        if !merged.iter().any(|seen| seen.url == target.url) {
            merged.push(target.clone());
        }
    }
    merged
}

pub struct DuplicationResolver {
    store: Arc<dyn JobStore>,
    options: SimilarityOptions,
    expiration_days: i64,
    metrics: Arc<Metrics>,
}

impl DuplicationResolver {
    pub fn new(
        store: Arc<dyn JobStore>,
        options: SimilarityOptions,
        expiration_days: u32,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            options,
            expiration_days: i64::from(expiration_days),
            metrics,
        }
    }

    /// Find a job that already satisfies `query`
    ///
    /// Completed jobs win over processing ones. A processing hit triggers one
    /// more completed lookup to catch a job that finished in between.
    pub async fn check_for_duplicate(
        &self,
        query: &DuplicateQuery,
    ) -> Result<Option<DuplicateHit>> {
        if let Some(outcome) = self.find_completed(query).await? {
            self.metrics.duplicate_completed();
            return Ok(Some(DuplicateHit::Completed(outcome)));
        }

        let Some(handle) = self.find_processing(query).await? else {
            debug!(catalog_id = %query.catalog_id, "No duplicate job found");
            return Ok(None);
        };

        if let Some(outcome) = self.find_completed(query).await? {
            info!(
                job_id = %outcome.job_id,
                catalog_id = %query.catalog_id,
                "Job completed while checking for duplicates"
            );
            self.metrics.duplicate_completed();
            return Ok(Some(DuplicateHit::Completed(outcome)));
        }

        self.metrics.duplicate_processing();
        Ok(Some(DuplicateHit::Processing(handle)))
    }

    async fn find_completed(&self, query: &DuplicateQuery) -> Result<Option<CallbackOutcome>> {
        let jobs = self
            .store
            .find_jobs(&identity_query(query, OperationStatus::Completed, Some(false)))
            .await?;

        let Some(job) = self.first_similar(query, jobs) else {
            return Ok(None);
        };

        let expiration = self.extend_expiration(&job).await?;
        info!(job_id = %job.id, catalog_id = %query.catalog_id, "Found completed duplicate");

        let mut outcome = job.parameters.callback_params.clone().unwrap_or(CallbackOutcome {
            status: OperationStatus::Completed,
            job_id: job.id,
            record_catalog_id: job.internal_id.clone(),
            expiration_time: None,
            file_size: None,
            links: None,
            error_reason: None,
            roi: Some(job.parameters.roi.clone()),
        });
        outcome.status = OperationStatus::Completed;
        outcome.expiration_time = expiration;
        Ok(Some(outcome))
    }

    async fn find_processing(&self, query: &DuplicateQuery) -> Result<Option<ProcessingHandle>> {
        for status in [OperationStatus::InProgress, OperationStatus::Pending] {
            let jobs = self
                .store
                .find_jobs(&identity_query(query, status, None))
                .await?;

            if let Some(job) = self.first_similar(query, jobs) {
                self.merge_callbacks(&job, &query.callbacks).await?;
                info!(job_id = %job.id, status = status.as_str(), "Found processing duplicate");
                return Ok(Some(ProcessingHandle {
                    job_id: job.id,
                    percentage: job.percentage,
                    status: job.status,
                }));
            }
        }

        Ok(None)
    }

    fn first_similar(&self, query: &DuplicateQuery, jobs: Vec<JobRecord>) -> Option<JobRecord> {
        jobs.into_iter().find(|job| {
            job.parameters.crs == query.crs
                && is_similar(&query.roi, &job.parameters.roi, &self.options)
        })
    }

    /// Push the cleanup expiration forward; never pulls it back
    async fn extend_expiration(&self, job: &JobRecord) -> Result<Option<chrono::DateTime<Utc>>> {
        let proposed = Utc::now() + Duration::days(self.expiration_days);
        let current = job.parameters.cleanup_data.cleanup_expiration_time_utc;

        if current.is_some_and(|current| current >= proposed) {
            debug!(
                job_id = %job.id,
                ?current,
                %proposed,
                "Expiration already later, leaving unchanged"
            );
            return Ok(current);
        }

        let mut parameters = job.parameters.clone();
        parameters.cleanup_data.cleanup_expiration_time_utc = Some(proposed);
        if let Some(callback_params) = parameters.callback_params.as_mut() {
            callback_params.expiration_time = Some(proposed);
        }

        self.store
            .update_job(
                job.id,
                &JobUpdate {
                    parameters: Some(parameters),
                    ..Default::default()
                },
            )
            .await?;

        debug!(job_id = %job.id, %proposed, "Extended job expiration");
        Ok(Some(proposed))
    }

    async fn merge_callbacks(&self, job: &JobRecord, incoming: &[CallbackTarget]) -> Result<()> {
        let merged = merge_callback_targets(&job.parameters.callbacks, incoming);
        if merged.len() == job.parameters.callbacks.len() {
            return Ok(());
        }

        let mut parameters = job.parameters.clone();
        parameters.callbacks = merged;
        self.store
            .update_job(
                job.id,
                &JobUpdate {
                    parameters: Some(parameters),
                    ..Default::default()
                },
            )
            .await?;

        debug!(job_id = %job.id, "Merged callback targets into processing job");
        Ok(())
    }
}

fn identity_query(
    query: &DuplicateQuery,
    status: OperationStatus,
    is_cleaned: Option<bool>,
) -> JobQuery {
    JobQuery {
        resource_id: Some(query.resource_id.clone()),
        version: Some(query.version.clone()),
        internal_id: Some(query.catalog_id.clone()),
        status: Some(status),
        is_cleaned,
    }
}
