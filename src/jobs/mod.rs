//! Export job records and the work items that drive them to completion

pub mod models;

pub use models::{
    ArtifactLinks, CallbackOutcome, CallbackTarget, CleanupData, FinalizeTask, JobParameters,
    JobQuery, JobRecord, JobUpdate, NewFinalizeTask, NewJob, OperationStatus,
};
