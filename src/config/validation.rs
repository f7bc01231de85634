//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, fee limit > 0)
//! - Validate endpoint URLs and the funder address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PoolConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::PoolConfig;
use crate::flow::types::Address;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("access.{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("funder.address: invalid address '{0}'")]
    InvalidFunderAddress(String),

    #[error("pool.pool_file must not be empty")]
    EmptyPoolFile,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PoolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.access.rest_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "rest_url",
            value: config.access.rest_url.clone(),
        });
    }
    for failover in &config.access.failover_urls {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "failover_urls",
                value: failover.clone(),
            });
        }
    }
    if config.access.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("access.request_timeout_secs"));
    }
    if config.access.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("access.poll_interval_ms"));
    }
    if config.pool.fee_limit == 0 {
        errors.push(ValidationError::Zero("pool.fee_limit"));
    }
    if config.pool.seal_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero("pool.seal_timeout_secs"));
    }
    if config.pool.pool_file.trim().is_empty() {
        errors.push(ValidationError::EmptyPoolFile);
    }
    if config.funder.address.parse::<Address>().is_err() {
        errors.push(ValidationError::InvalidFunderAddress(
            config.funder.address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
