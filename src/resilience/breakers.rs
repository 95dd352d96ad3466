//! Breaker registry keyed by operation.
//!
//! # Responsibilities
//! - Map a resolved endpoint to the breaker that guards its dispatch
//! - Create breakers once per operation key
//! - Drop breakers of routing paths that are no longer registered
//!
//! # Design Decisions
//! - `Shared` scope: a single breaker (`dispatch`) for all outbound calls,
//!   created at startup
//! - `PerEndpoint` scope: one breaker per routing path, created on first use
//! - Concurrent first use of a key yields one breaker (DashMap entry API)

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{BreakerConfig, BreakerScope};
use crate::resilience::circuit_breaker::{BreakerSettings, BreakerStatus, CircuitBreaker};

/// Operation key of the breaker used in `Shared` scope.
pub const SHARED_KEY: &str = "dispatch";

/// All breakers of the gateway.
#[derive(Debug)]
pub struct BreakerRegistry {
    scope: BreakerScope,
    settings: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(scope: BreakerScope, settings: BreakerSettings) -> Self {
        let breakers = DashMap::new();
        if scope == BreakerScope::Shared {
            breakers.insert(
                SHARED_KEY.to_string(),
                Arc::new(CircuitBreaker::new(SHARED_KEY, settings.clone())),
            );
        }
        Self {
            scope,
            settings,
            breakers,
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.scope, config.settings())
    }

    pub fn scope(&self) -> BreakerScope {
        self.scope
    }

    /// Operation key guarding dispatch to `routing_path`.
    pub fn key_for<'a>(&self, routing_path: &'a str) -> &'a str {
        match self.scope {
            BreakerScope::Shared => SHARED_KEY,
            BreakerScope::PerEndpoint => routing_path,
        }
    }

    /// Breaker guarding dispatch to `routing_path`.
    pub fn breaker_for(&self, routing_path: &str) -> Arc<CircuitBreaker> {
        let key = self.key_for(routing_path);
        if let Some(breaker) = self.breakers.get(key) {
            return breaker.clone();
        }
        self.breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(breaker = %key, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(key, self.settings.clone()))
            })
            .clone()
    }

    /// Drop per-endpoint breakers whose routing path is not in `routing_paths`.
    ///
    /// The shared breaker is never dropped.
    pub fn retain_routing_paths(&self, routing_paths: &[String]) {
        if self.scope == BreakerScope::Shared {
            return;
        }
        self.breakers.retain(|key, _| {
            let keep = routing_paths.iter().any(|path| path == key);
            if !keep {
                tracing::debug!(breaker = %key, "Dropping circuit breaker of deregistered endpoint");
            }
            keep
        });
    }

    /// Status of every breaker, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, BreakerStatus)> {
        let mut statuses: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status()))
            .collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }
}
