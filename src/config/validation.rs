use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyUrl { field: &'static str },

    #[error("roi.min_contained_percentage must be in (0, 100], got {0}")]
    InvalidContainedPercentage(f64),

    #[error("roi.buffer_meters must be a non-negative number, got {0}")]
    InvalidBufferMeters(f64),

    #[error("queue.max_attempts must be positive")]
    InvalidMaxAttempts,

    #[error("storage.reservation_buffer_factor must be at least 1.0, got {0}")]
    InvalidBufferFactor(f64),

    #[error("storage.tile_size_estimate must be positive")]
    InvalidTileSize,

    #[error("storage.cleanup_expiration_days must be positive")]
    InvalidExpirationDays,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_urls(config)?;
    validate_roi(config)?;
    validate_queue(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_urls(config: &Config) -> Result<(), ValidationError> {
    let urls = [
        ("job_manager.url", &config.job_manager.url),
        ("queue.url", &config.queue.url),
        ("catalog.url", &config.catalog.url),
        ("storage.download_server_url", &config.storage.download_server_url),
    ];

    for (field, url) in urls {
        if url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl { field });
        }
    }

    Ok(())
}

fn validate_roi(config: &Config) -> Result<(), ValidationError> {
    let percentage = config.roi.min_contained_percentage;
    if !(percentage > 0.0 && percentage <= 100.0) {
        return Err(ValidationError::InvalidContainedPercentage(percentage));
    }

    let buffer = config.roi.buffer_meters;
    if !(buffer.is_finite() && buffer >= 0.0) {
        return Err(ValidationError::InvalidBufferMeters(buffer));
    }

    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    if config.queue.max_attempts == 0 {
        return Err(ValidationError::InvalidMaxAttempts);
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    let factor = config.storage.reservation_buffer_factor;
    if !(factor.is_finite() && factor >= 1.0) {
        return Err(ValidationError::InvalidBufferFactor(factor));
    }

    if config.storage.tile_size_estimate.as_u64() == 0 {
        return Err(ValidationError::InvalidTileSize);
    }

    if config.storage.cleanup_expiration_days == 0 {
        return Err(ValidationError::InvalidExpirationDays);
    }

    Ok(())
}
