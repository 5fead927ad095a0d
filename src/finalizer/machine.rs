use bon::Builder;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::artifacts::ArtifactFinalizer;
use crate::callbacks::CallbackDispatcher;
use crate::clients::{ClientError, JobStore, WorkQueue};
use crate::jobs::{
    CallbackOutcome, FinalizeTask, JobQuery, JobRecord, JobUpdate, NewFinalizeTask,
    OperationStatus,
};
use crate::observability::Metrics;

/// Where a dequeued finalize task ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinalizeState {
    ClosedCompleted,
    ClosedFailed,
    Requeued,
    Abandoned,
    /// Redelivered task for a job that is already terminal
    AlreadyClosed,
}

impl FinalizeState {
    fn as_str(&self) -> &'static str {
        match self {
            FinalizeState::ClosedCompleted => "closed_completed",
            FinalizeState::ClosedFailed => "closed_failed",
            FinalizeState::Requeued => "requeued",
            FinalizeState::Abandoned => "abandoned",
            FinalizeState::AlreadyClosed => "already_closed",
        }
    }
}

/// Drives exporter-finished jobs to a terminal state
///
/// `job_status_poll` turns task counters into finalize work;
/// `job_finalize_poll` consumes that work one task at a time with bounded
/// retry. Neither poll returns an error for a single bad job or task.
#[derive(Builder)]
#[builder(on(String, into))]
pub struct FinalizationStateMachine {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    artifacts: Arc<dyn ArtifactFinalizer>,
    dispatcher: CallbackDispatcher,
    metrics: Arc<Metrics>,
    #[builder(default = "finalize".to_string())]
    task_type: String,
    #[builder(default = 5)]
    max_attempts: u32,
}

/// Finalize work implied by a job's task counters, if any
pub fn finalize_request(job: &JobRecord) -> Option<NewFinalizeTask> {
    if job.failed_tasks > 0 {
        return Some(NewFinalizeTask {
            exporter_task_status: OperationStatus::Failed,
            reason: Some(format!(
                "{} of {} export tasks failed",
                job.failed_tasks, job.task_count
            )),
        });
    }

    if job.task_count > 0 && job.completed_tasks == job.task_count {
        return Some(NewFinalizeTask {
            exporter_task_status: OperationStatus::Completed,
            reason: None,
        });
    }

    None
}

impl FinalizationStateMachine {
    /// Enqueue finalize work for in-progress jobs whose tasks are done
    ///
    /// Returns whether any new work was enqueued. Only the initial listing
    /// fails the poll; per-job errors are logged and skipped.
    pub async fn job_status_poll(&self) -> Result<bool, ClientError> {
        let jobs = self
            .store
            .find_jobs(&JobQuery::by_status(OperationStatus::InProgress))
            .await?;

        let mut found = false;
        for job in &jobs {
            let Some(request) = finalize_request(job) else {
                continue;
            };

            match self.enqueue_once(job, &request).await {
                Ok(enqueued) => found |= enqueued,
                Err(err) => {
                    error!(job_id = %job.id, error = %err, "Failed to enqueue finalize task");
                }
            }
        }

        Ok(found)
    }

    async fn enqueue_once(
        &self,
        job: &JobRecord,
        request: &NewFinalizeTask,
    ) -> Result<bool, ClientError> {
        if self.queue.has_pending(job.id, &self.task_type).await? {
            debug!(job_id = %job.id, "Finalize task already queued");
            return Ok(false);
        }

        self.queue.enqueue(job.id, &self.task_type, request).await?;
        self.metrics.finalize_task_enqueued();
        info!(
            job_id = %job.id,
            exporter_status = request.exporter_task_status.as_str(),
            "Finalize task enqueued"
        );
        Ok(true)
    }

    /// Dequeue and process at most one finalize task
    ///
    /// Returns `true` whenever a task was dequeued, whatever its fate.
    pub async fn job_finalize_poll(&self) -> bool {
        let task = match self.queue.dequeue(&self.task_type).await {
            Ok(Some(task)) => task,
            Ok(None) => return false,
            Err(err) => {
                error!(error = %err, "Failed to dequeue finalize task");
                return false;
            }
        };

        match self.finalize(&task).await {
            Ok(state) => {
                info!(
                    job_id = %task.job_id,
                    task_id = %task.task_id,
                    attempts = task.attempts,
                    state = state.as_str(),
                    "Finalize task processed"
                );
            }
            Err(err) => {
                error!(
                    job_id = %task.job_id,
                    task_id = %task.task_id,
                    attempts = task.attempts,
                    error = %err,
                    "Finalize task failed, requeueing"
                );
                self.requeue(&task).await;
            }
        }

        true
    }

    async fn finalize(&self, task: &FinalizeTask) -> Result<FinalizeState, ClientError> {
        let job = self.store.get_job(task.job_id).await?;

        if job.status.is_terminal() {
            warn!(
                job_id = %job.id,
                task_id = %task.task_id,
                status = job.status.as_str(),
                "Job already closed, acknowledging redelivered task"
            );
            self.queue.ack(task.job_id, task.task_id).await?;
            return Ok(FinalizeState::AlreadyClosed);
        }

        if task.attempts > self.max_attempts {
            return self.abandon(&job, task).await;
        }

        match task.exporter_task_status {
            OperationStatus::Completed => self.close_completed(&job, task).await,
            _ => self.close_failed(&job, task).await,
        }
    }

    async fn close_completed(
        &self,
        job: &JobRecord,
        task: &FinalizeTask,
    ) -> Result<FinalizeState, ClientError> {
        let outcome = self.artifacts.finalize_success(job).await;
        if outcome.status != OperationStatus::Completed {
            warn!(
                job_id = %job.id,
                task_id = %task.task_id,
                reason = outcome.error_reason.as_deref().unwrap_or_default(),
                "Artifact not ready, requeueing"
            );
            self.queue.reject(task.job_id, task.task_id, true).await?;
            self.metrics.task_requeued();
            return Ok(FinalizeState::Requeued);
        }

        self.queue.ack(task.job_id, task.task_id).await?;
        self.persist(job, OperationStatus::Completed, Some(100), &outcome).await?;
        self.dispatcher.send_callbacks(job, &outcome).await;
        self.metrics.job_completed();
        Ok(FinalizeState::ClosedCompleted)
    }

    async fn close_failed(
        &self,
        job: &JobRecord,
        task: &FinalizeTask,
    ) -> Result<FinalizeState, ClientError> {
        let outcome = self
            .artifacts
            .finalize_failure(job, task.reason.as_deref())
            .await;

        self.queue.ack(task.job_id, task.task_id).await?;
        self.persist(job, OperationStatus::Failed, job.percentage, &outcome).await?;
        self.dispatcher.send_callbacks(job, &outcome).await;
        self.store.delete_task(task.job_id, task.task_id).await?;
        self.metrics.job_failed();
        Ok(FinalizeState::ClosedFailed)
    }

    /// Attempts exhausted: drop the task for good and fail the job
    async fn abandon(
        &self,
        job: &JobRecord,
        task: &FinalizeTask,
    ) -> Result<FinalizeState, ClientError> {
        warn!(
            job_id = %job.id,
            task_id = %task.task_id,
            attempts = task.attempts,
            max_attempts = self.max_attempts,
            "Finalize attempts exhausted, abandoning task"
        );
        self.queue.reject(task.job_id, task.task_id, false).await?;

        let reason = task
            .reason
            .clone()
            .unwrap_or_else(|| format!("finalize abandoned after {} attempts", task.attempts));

        self.store
            .update_job(
                job.id,
                &JobUpdate {
                    status: Some(OperationStatus::Failed),
                    percentage: Some(None),
                    reason: Some(reason.clone()),
                    parameters: None,
                },
            )
            .await?;

        let outcome = CallbackOutcome::failure(job, reason);
        self.dispatcher.send_callbacks(job, &outcome).await;
        self.metrics.job_abandoned();
        Ok(FinalizeState::Abandoned)
    }

    async fn persist(
        &self,
        job: &JobRecord,
        status: OperationStatus,
        percentage: Option<u8>,
        outcome: &CallbackOutcome,
    ) -> Result<(), ClientError> {
        let mut parameters = job.parameters.clone();
        parameters.callback_params = Some(outcome.clone());
        if outcome.expiration_time.is_some() {
            parameters.cleanup_data.cleanup_expiration_time_utc = outcome.expiration_time;
        }

        self.store
            .update_job(
                job.id,
                &JobUpdate {
                    status: Some(status),
                    percentage: Some(percentage),
                    reason: outcome.error_reason.clone(),
                    parameters: Some(parameters),
                },
            )
            .await
    }

    async fn requeue(&self, task: &FinalizeTask) {
        match self.queue.reject(task.job_id, task.task_id, true).await {
            Ok(()) => self.metrics.task_requeued(),
            Err(err) => {
                error!(
                    job_id = %task.job_id,
                    task_id = %task.task_id,
                    error = %err,
                    "Failed to requeue task"
                );
            }
        }
    }
}
