//! Closing export jobs once the exporter is done with them
//!
//! - [`machine`] - status and finalize polls with bounded retry
//! - [`artifacts`] - turning exporter output into callback outcomes
//! - [`runner`] - the polling loop driving the machine

pub mod artifacts;
pub mod machine;
pub mod runner;

pub use artifacts::{ArtifactFinalizer, DEFAULT_FAILURE_REASON, LocalArtifactFinalizer};
pub use machine::{FinalizationStateMachine, finalize_request};
pub use runner::PollRunner;
