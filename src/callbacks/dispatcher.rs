use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::sender::CallbackSender;
use crate::jobs::{CallbackOutcome, JobRecord};
use crate::observability::Metrics;

/// Per-call delivery tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans an outcome out to every callback target of a job
///
/// Deliveries run concurrently and are all awaited; a failing target never
/// cancels its siblings. Failed deliveries are logged and counted, not retried.
pub struct CallbackDispatcher {
    sender: Arc<dyn CallbackSender>,
    metrics: Arc<Metrics>,
}

impl CallbackDispatcher {
    pub fn new(sender: Arc<dyn CallbackSender>, metrics: Arc<Metrics>) -> Self {
        Self { sender, metrics }
    }

    pub async fn send_callbacks(
        &self,
        job: &JobRecord,
        outcome: &CallbackOutcome,
    ) -> DispatchReport {
        let targets = &job.parameters.callbacks;
        if targets.is_empty() {
            debug!(job_id = %job.id, "No callback targets registered");
            return DispatchReport::default();
        }

        let deliveries = targets.iter().map(|target| async move {
            let result = self.sender.send(&target.url, outcome).await;
            (target.url.as_str(), result)
        });

        let mut report = DispatchReport::default();
        for (url, result) in join_all(deliveries).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    self.metrics.callback_failed();
                    warn!(job_id = %job.id, url, error = %err, "Callback delivery failed");
                }
            }
        }

        info!(
            job_id = %job.id,
            status = outcome.status.as_str(),
            delivered = report.delivered,
            failed = report.failed,
            "Callbacks dispatched"
        );

        report
    }
}
