use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::error::Result;
use super::http::{JsonClient, decode};
use crate::jobs::{JobQuery, JobRecord, JobUpdate, NewJob};

/// System of record for export jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>>;

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord>;

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<()>;

    async fn create_job(&self, job: &NewJob) -> Result<Uuid>;

    async fn delete_task(&self, job_id: Uuid, task_id: Uuid) -> Result<()>;
}

/// Job store backed by the job manager's REST API
pub struct HttpJobStore {
    http: JsonClient,
    job_type: String,
}

#[derive(Deserialize)]
struct CreatedJob {
    id: Uuid,
}

impl HttpJobStore {
    pub fn new(http: JsonClient, job_type: impl Into<String>) -> Self {
        Self {
            http,
            job_type: job_type.into(),
        }
    }

    fn query_params(&self, query: &JobQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("type", self.job_type.clone()),
            ("shouldReturnTasks", "false".to_string()),
        ];
        if let Some(resource_id) = &query.resource_id {
            params.push(("resourceId", resource_id.clone()));
        }
        if let Some(version) = &query.version {
            params.push(("version", version.clone()));
        }
        if let Some(internal_id) = &query.internal_id {
            params.push(("internalId", internal_id.clone()));
        }
        if let Some(status) = query.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(is_cleaned) = query.is_cleaned {
            params.push(("isCleaned", is_cleaned.to_string()));
        }
        params
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let params = self.query_params(query);
        let jobs: Option<Vec<JobRecord>> = self.http.get_optional("jobs", &params).await?;
        let jobs = jobs.unwrap_or_default();
        debug!(count = jobs.len(), ?query, "Fetched jobs");
        Ok(jobs)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord> {
        self.http
            .get(&format!("jobs/{job_id}"), &[("shouldReturnTasks", "false".to_string())])
            .await
    }

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<()> {
        self.http
            .send_json(Method::PUT, &format!("jobs/{job_id}"), update)
            .await?;
        debug!(%job_id, "Job updated");
        Ok(())
    }

    async fn create_job(&self, job: &NewJob) -> Result<Uuid> {
        let response = self.http.send_json(Method::POST, "jobs", job).await?;
        let created: CreatedJob = decode(response).await?;
        Ok(created.id)
    }

    async fn delete_task(&self, job_id: Uuid, task_id: Uuid) -> Result<()> {
        self.http.delete(&format!("jobs/{job_id}/tasks/{task_id}")).await
    }
}
