//! Export request handling
//!
//! An incoming request is validated against its source layer, checked for an
//! equivalent completed or in-flight job, admitted against free disk space and
//! only then turned into a new job in the job store.

pub mod capacity;
pub mod duplication;
pub mod error;
pub mod service;
pub mod validation;

pub use capacity::{CapacityChecker, DiskSpace, SysinfoDiskSpace};
pub use duplication::{
    DuplicateHit, DuplicateQuery, DuplicationResolver, ProcessingHandle, merge_callback_targets,
};
pub use error::ExportError;
pub use service::{ExportRequest, ExportResponse, ExportService, ExportSettings};
pub use validation::{ValidatedFeature, validate_roi};
