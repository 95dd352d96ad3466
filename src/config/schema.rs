//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::EndpointStatus;
use crate::resilience::circuit_breaker::BreakerSettings;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Routing key extraction and fixed routes.
    pub routing: RoutingConfig,

    /// Endpoint directory settings and statically registered endpoints.
    pub discovery: DiscoveryConfig,

    /// Circuit breaker settings.
    pub breaker: BreakerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Envelope status codes per failure kind.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Delimiter bounding the routing key in a path.
    pub delimiter: String,

    /// Inbound paths that always dispatch to a fixed backend path.
    pub fixed_routes: Vec<FixedRouteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            delimiter: "/".to_string(),
            fixed_routes: Vec::new(),
        }
    }
}

/// A fixed route: requests on `mount` are routed and forwarded as `path`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FixedRouteConfig {
    /// Inbound path the route is mounted on (e.g., "/authorize").
    pub mount: String,

    /// Path used both for key extraction and as the forwarded path.
    pub path: String,
}

/// Endpoint directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum age of a cached directory snapshot in milliseconds.
    /// Zero disables caching: every resolution queries discovery.
    pub cache_ttl_ms: u64,

    /// Endpoints registered with the built-in registry.
    pub endpoints: Vec<EndpointConfig>,
}

impl DiscoveryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// A statically registered endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Registration name, used in logs.
    pub name: String,

    /// Routing prefix served by this endpoint (e.g., "orders").
    pub routing_path: String,

    /// Base URL of the backend (e.g., "http://127.0.0.1:3000").
    pub address: String,

    /// Advisory status reported by discovery.
    #[serde(default)]
    pub status: EndpointStatus,
}

/// Which operation key a dispatch attempt is guarded under.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker guards all outbound dispatch.
    Shared,
    /// One breaker per routing path, created on first use.
    #[default]
    PerEndpoint,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Breaker granularity.
    pub scope: BreakerScope,

    /// Failures within the rolling window that open the circuit.
    pub failure_threshold: u32,

    /// Rolling window for failure counting in milliseconds.
    pub rolling_window_ms: u64,

    /// Time an open circuit waits before admitting a trial, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Optional deadline for a whole guarded operation in milliseconds.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            scope: BreakerScope::default(),
            failure_threshold: 5,
            rolling_window_ms: 10_000,
            reset_timeout_ms: 30_000,
            operation_timeout_ms: None,
        }
    }
}

impl BreakerConfig {
    pub fn settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            rolling_window: Duration::from_millis(self.rolling_window_ms),
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
            operation_timeout: self.operation_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Per-call dispatch timeout in milliseconds.
    pub call_ms: u64,

    /// Whole inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            call_ms: 10_000,
            request_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Envelope status codes for each failure kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// No endpoint registered for the routing key.
    pub not_found_status: u16,

    /// Discovery could not be queried.
    pub discovery_failure_status: u16,

    /// Backend call failed or timed out.
    pub dispatch_failure_status: u16,

    /// Breaker short-circuited the attempt.
    pub breaker_open_status: u16,

    /// Whole request exceeded `timeouts.request_secs`.
    pub request_timeout_status: u16,

    /// Maximum backend response body in bytes.
    pub max_backend_body_bytes: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            not_found_status: 404,
            discovery_failure_status: 503,
            dispatch_failure_status: 502,
            breaker_open_status: 503,
            request_timeout_status: 504,
            max_backend_body_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
