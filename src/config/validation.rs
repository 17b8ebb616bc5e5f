//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Returns every violation, not
//! just the first, so a broken config file can be fixed in one pass.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic violation in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("fetch.user_agent must be a non-empty header value")]
    InvalidUserAgent,

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive: [(&'static str, u64); 6] = [
        ("listener.port", config.listener.port as u64),
        ("fetch.timeout_secs", config.fetch.timeout_secs),
        ("fetch.max_body_bytes", config.fetch.max_body_bytes as u64),
        ("dns.timeout_secs", config.dns.timeout_secs),
        ("rate_limit.max_requests", config.rate_limit.max_requests as u64),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let ua = config.fetch.user_agent.trim();
    if ua.is_empty() || HeaderValue::from_str(ua).is_err() {
        errors.push(ValidationError::InvalidUserAgent);
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::UnknownLogFormat(other.to_string())),
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
