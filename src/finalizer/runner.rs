use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::machine::FinalizationStateMachine;

/// Cooperative loop running both polls back to back
pub struct PollRunner {
    machine: Arc<FinalizationStateMachine>,
    idle_interval: Duration,
}

impl PollRunner {
    pub fn new(machine: Arc<FinalizationStateMachine>, idle_interval: Duration) -> Self {
        Self {
            machine,
            idle_interval,
        }
    }

    /// One iteration; returns whether either poll found work
    pub async fn tick(&self) -> bool {
        let status_work = match self.machine.job_status_poll().await {
            Ok(found) => found,
            Err(err) => {
                error!(error = %err, "Job status poll failed");
                false
            }
        };

        let finalize_work = self.machine.job_finalize_poll().await;
        status_work || finalize_work
    }

    /// Run until `shutdown` turns `true` or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(idle_ms = self.idle_interval.as_millis() as u64, "Poll runner started");

        while !*shutdown.borrow() {
            if self.tick().await {
                continue;
            }

            debug!("No finalize work, idling");
            tokio::select! {
                _ = tokio::time::sleep(self.idle_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Poll runner stopped");
    }
}
