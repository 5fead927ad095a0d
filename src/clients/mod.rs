//! Clients for the external systems the service coordinates
//!
//! Each collaborator is an async trait so the export and finalize logic can
//! be driven by in-memory fakes in tests. The HTTP implementations share
//! [`http::JsonClient`].

pub mod catalog;
pub mod error;
pub mod http;
pub mod job_store;
pub mod work_queue;

pub use catalog::{Catalog, HttpCatalog, LayerMetadata};
pub use error::{ClientError, Result};
pub use http::{HttpConfig, JsonClient};
pub use job_store::{HttpJobStore, JobStore};
pub use work_queue::{HttpWorkQueue, WorkQueue};
