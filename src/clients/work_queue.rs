use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::error::Result;
use super::http::{JsonClient, decode, ensure_success};
use crate::jobs::{FinalizeTask, NewFinalizeTask, OperationStatus};

/// At-least-once queue of finalize work
///
/// `ack` and `reject` are expected to be idempotent on the queue side.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn dequeue(&self, task_type: &str) -> Result<Option<FinalizeTask>>;

    async fn ack(&self, job_id: Uuid, task_id: Uuid) -> Result<()>;

    /// `requeue = true` puts the task back with its attempts incremented
    async fn reject(&self, job_id: Uuid, task_id: Uuid, requeue: bool) -> Result<()>;

    async fn enqueue(&self, job_id: Uuid, task_type: &str, task: &NewFinalizeTask) -> Result<()>;

    /// Whether a not-yet-finished task of `task_type` exists for the job
    async fn has_pending(&self, job_id: Uuid, task_type: &str) -> Result<bool>;
}

/// Task as returned by the queue service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuedTask {
    id: Uuid,
    job_id: Uuid,
    #[serde(rename = "type", default)]
    task_type: String,
    status: OperationStatus,
    #[serde(default)]
    attempts: u32,
    parameters: NewFinalizeTask,
}

impl From<QueuedTask> for FinalizeTask {
    fn from(task: QueuedTask) -> Self {
        FinalizeTask {
            job_id: task.job_id,
            task_id: task.id,
            attempts: task.attempts,
            exporter_task_status: task.parameters.exporter_task_status,
            reason: task.parameters.reason,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTask<'a> {
    #[serde(rename = "type")]
    task_type: &'a str,
    parameters: &'a NewFinalizeTask,
}

/// Work queue backed by the job manager's task endpoints
pub struct HttpWorkQueue {
    jobs: JsonClient,
    queue: JsonClient,
    job_type: String,
}

impl HttpWorkQueue {
    pub fn new(jobs: JsonClient, queue: JsonClient, job_type: impl Into<String>) -> Self {
        Self {
            jobs,
            queue,
            job_type: job_type.into(),
        }
    }
}

#[async_trait]
impl WorkQueue for HttpWorkQueue {
    async fn dequeue(&self, task_type: &str) -> Result<Option<FinalizeTask>> {
        let path = format!("tasks/{}/{}/startPending", self.job_type, task_type);
        let response = self.queue.request(Method::POST, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success("POST", response)?;
        let task: QueuedTask = decode(response).await?;
        debug!(
            job_id = %task.job_id,
            task_id = %task.id,
            attempts = task.attempts,
            "Dequeued task"
        );
        Ok(Some(task.into()))
    }

    async fn ack(&self, job_id: Uuid, task_id: Uuid) -> Result<()> {
        let body = json!({ "status": OperationStatus::Completed, "percentage": 100 });
        self.jobs
            .send_json(Method::PUT, &format!("jobs/{job_id}/tasks/{task_id}"), &body)
            .await?;
        Ok(())
    }

    async fn reject(&self, job_id: Uuid, task_id: Uuid, requeue: bool) -> Result<()> {
        let body = json!({ "isRecoverable": requeue });
        self.queue
            .send_json(Method::POST, &format!("tasks/{job_id}/{task_id}/reject"), &body)
            .await?;
        Ok(())
    }

    async fn enqueue(&self, job_id: Uuid, task_type: &str, task: &NewFinalizeTask) -> Result<()> {
        let body = CreateTask {
            task_type,
            parameters: task,
        };
        self.jobs
            .send_json(Method::POST, &format!("jobs/{job_id}/tasks"), &body)
            .await?;
        Ok(())
    }

    async fn has_pending(&self, job_id: Uuid, task_type: &str) -> Result<bool> {
        let tasks: Option<Vec<QueuedTask>> = self
            .jobs
            .get_optional(&format!("jobs/{job_id}/tasks"), &[])
            .await?;

        Ok(tasks.unwrap_or_default().iter().any(|task| {
            task.task_type == task_type
                && matches!(task.status, OperationStatus::Pending | OperationStatus::InProgress)
        }))
    }
}
