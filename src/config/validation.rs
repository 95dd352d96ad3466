//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, timeouts > 0)
//! - Reject duplicate routing paths and fixed-route mounts at registration
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.routing.delimiter.is_empty() {
        errors.push(ValidationError::new("routing.delimiter", "must not be empty"));
    }

    let mut mounts = HashSet::new();
    for (i, route) in config.routing.fixed_routes.iter().enumerate() {
        if !route.mount.starts_with('/') {
            errors.push(ValidationError::new(
                format!("routing.fixed_routes[{}].mount", i),
                "must start with '/'",
            ));
        } else if route.mount == "/" || route.mount.contains(['{', '}', '*']) {
            errors.push(ValidationError::new(
                format!("routing.fixed_routes[{}].mount", i),
                "must be a literal path other than '/'",
            ));
        }
        if !mounts.insert(route.mount.as_str()) {
            errors.push(ValidationError::new(
                format!("routing.fixed_routes[{}].mount", i),
                format!("'{}' is mounted twice", route.mount),
            ));
        }
        if route.path.is_empty() {
            errors.push(ValidationError::new(
                format!("routing.fixed_routes[{}].path", i),
                "must not be empty",
            ));
        }
    }

    let mut routing_paths = HashSet::new();
    for (i, endpoint) in config.discovery.endpoints.iter().enumerate() {
        let field = format!("discovery.endpoints[{}]", i);
        if endpoint.routing_path.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.routing_path", field),
                "must not be empty",
            ));
        } else if !routing_paths.insert(endpoint.routing_path.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.routing_path", field),
                format!("'{}' is already registered", endpoint.routing_path),
            ));
        }
        match Url::parse(&endpoint.address) {
            Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                format!("{}.address", field),
                "must be an http:// URL with a host",
            )),
            Err(e) => errors.push(ValidationError::new(format!("{}.address", field), e.to_string())),
        }
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("breaker.failure_threshold", "must be at least 1"));
    }
    if config.breaker.rolling_window_ms == 0 {
        errors.push(ValidationError::new("breaker.rolling_window_ms", "must be > 0"));
    }
    if config.breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.reset_timeout_ms", "must be > 0"));
    }
    if config.breaker.operation_timeout_ms == Some(0) {
        errors.push(ValidationError::new("breaker.operation_timeout_ms", "must be > 0"));
    }
    if config.timeouts.call_ms == 0 {
        errors.push(ValidationError::new("timeouts.call_ms", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let longest_call = config
        .breaker
        .operation_timeout_ms
        .map_or(config.timeouts.call_ms, |op| op.max(config.timeouts.call_ms));
    if config.timeouts.request_secs > 0 && request_ms <= longest_call {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!("{} ms must exceed the backend call timeout of {} ms", request_ms, longest_call),
        ));
    }

    let statuses = [
        ("response.not_found_status", config.response.not_found_status),
        ("response.discovery_failure_status", config.response.discovery_failure_status),
        ("response.dispatch_failure_status", config.response.dispatch_failure_status),
        ("response.breaker_open_status", config.response.breaker_open_status),
        ("response.request_timeout_status", config.response.request_timeout_status),
    ];
    for (field, status) in statuses {
        if !(100..=599).contains(&status) {
            errors.push(ValidationError::new(field, format!("{} is not an HTTP status", status)));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
