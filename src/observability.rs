//! In-process counters for the export and finalize paths

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_created: AtomicU64,
    duplicates_completed: AtomicU64,
    duplicates_processing: AtomicU64,
    finalize_tasks_enqueued: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_abandoned: AtomicU64,
    tasks_requeued: AtomicU64,
    callbacks_failed: AtomicU64,
}

macro_rules! counter {
    ($method:ident, $field:ident) => {
        pub fn $method(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(counter = stringify!($field), "Metric incremented");
        }
    };
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(job_created, jobs_created);
    counter!(duplicate_completed, duplicates_completed);
    counter!(duplicate_processing, duplicates_processing);
    counter!(finalize_task_enqueued, finalize_tasks_enqueued);
    counter!(job_completed, jobs_completed);
    counter!(job_failed, jobs_failed);
    counter!(job_abandoned, jobs_abandoned);
    counter!(task_requeued, tasks_requeued);
    counter!(callback_failed, callbacks_failed);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_created: self.jobs_created.load(Ordering::Relaxed),
            duplicates_completed: self.duplicates_completed.load(Ordering::Relaxed),
            duplicates_processing: self.duplicates_processing.load(Ordering::Relaxed),
            finalize_tasks_enqueued: self.finalize_tasks_enqueued.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_abandoned: self.jobs_abandoned.load(Ordering::Relaxed),
            tasks_requeued: self.tasks_requeued.load(Ordering::Relaxed),
            callbacks_failed: self.callbacks_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_created: u64,
    pub duplicates_completed: u64,
    pub duplicates_processing: u64,
    pub finalize_tasks_enqueued: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_abandoned: u64,
    pub tasks_requeued: u64,
    pub callbacks_failed: u64,
}
