use thiserror::Error;

use crate::clients::ClientError;
use crate::geometry::GeometryError;

/// Failures surfaced synchronously to whoever requested an export
///
/// None of these are retried here; the caller maps them to a response.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient storage: {required} bytes required, {available} bytes available")]
    InsufficientStorage { required: u64, available: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Validation(_) => "VALIDATION_ERROR",
            ExportError::NotFound(_) => "NOT_FOUND",
            ExportError::InsufficientStorage { .. } => "INSUFFICIENT_STORAGE",
            ExportError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ClientError> for ExportError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(what) => ExportError::NotFound(what),
            other => ExportError::Internal(other.to_string()),
        }
    }
}

impl From<GeometryError> for ExportError {
    fn from(err: GeometryError) -> Self {
        ExportError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
