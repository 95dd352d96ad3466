//! Route target computation.
//!
//! # Responsibilities
//! - Decide where a request's routing key comes from (its own path or a fixed path)
//! - Produce the routing key and the path forwarded to the backend
//!
//! # Design Decisions
//! - One router serves every inbound surface; surfaces differ only by `KeySource`
//! - Immutable after construction (thread-safe without locks)
//! - The query string of the inbound request is always preserved

use axum::http::Uri;

use crate::config::{FixedRouteConfig, RoutingConfig};
use crate::routing::key::extract_routing_key;

/// Where the pipeline takes its routing key from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Key and forwarded path come from the inbound request.
    RequestPath,
    /// Key and forwarded path come from a configured path.
    Fixed { path: String },
}

/// A resolved routing decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Routing key to resolve in the directory.
    pub key: String,
    /// Path and query forwarded to the backend.
    pub forward_path: String,
}

/// Computes route targets from requests.
#[derive(Debug, Clone)]
pub struct PrefixRouter {
    delimiter: String,
    fixed_routes: Vec<FixedRouteConfig>,
}

impl PrefixRouter {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            fixed_routes: Vec::new(),
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            delimiter: config.delimiter.clone(),
            fixed_routes: config.fixed_routes.clone(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Fixed routes as (mount path, key source) pairs.
    pub fn fixed_sources(&self) -> impl Iterator<Item = (&str, KeySource)> + '_ {
        self.fixed_routes.iter().map(|route| {
            (
                route.mount.as_str(),
                KeySource::Fixed {
                    path: route.path.clone(),
                },
            )
        })
    }

    /// Compute the routing key and forwarded path for a request URI.
    pub fn target(&self, source: &KeySource, uri: &Uri) -> RouteTarget {
        let path = match source {
            KeySource::RequestPath => uri.path(),
            KeySource::Fixed { path } => path.as_str(),
        };

        let forward_path = match uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        RouteTarget {
            key: extract_routing_key(path, &self.delimiter),
            forward_path,
        }
    }
}
