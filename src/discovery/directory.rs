//! Endpoint directory: routing-key lookup over discovery snapshots.
//!
//! # Responsibilities
//! - Fetch a snapshot of registered records from the discovery collaborator
//! - Resolve a routing key to exactly one record (exact match)
//! - Optionally reuse a snapshot for a bounded staleness window
//!
//! # Design Decisions
//! - Exact string match on routing path, no longest-prefix matching
//! - Duplicate routing paths: first record in snapshot order wins (undefined
//!   by contract, stable in practice)
//! - Failed refreshes are never cached
//! - The cache lock is never held across an await

use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::discovery::{Discovery, DiscoveryError, EndpointRecord};

/// Errors from directory lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// No registered record serves the routing key.
    #[error("No endpoint registered for routing key '{0}'")]
    NotFound(String),

    /// The discovery collaborator could not be queried.
    #[error(transparent)]
    DiscoveryUnavailable(#[from] DiscoveryError),
}

struct CachedSnapshot {
    records: Arc<[EndpointRecord]>,
    fetched_at: Instant,
}

/// Queryable view over the discovery collaborator.
pub struct EndpointDirectory {
    discovery: Arc<dyn Discovery>,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedSnapshot>>,
}

impl EndpointDirectory {
    /// Create a directory. A zero `cache_ttl` queries discovery on every call.
    pub fn new(discovery: Arc<dyn Discovery>, cache_ttl: Duration) -> Self {
        Self {
            discovery,
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    /// The underlying collaborator.
    pub fn discovery(&self) -> &Arc<dyn Discovery> {
        &self.discovery
    }

    /// Current registered records.
    pub async fn snapshot(&self) -> Result<Arc<[EndpointRecord]>, DirectoryError> {
        if let Some(records) = self.cached() {
            return Ok(records);
        }

        let records: Arc<[EndpointRecord]> = self.discovery.list_records().await?.into();

        if !self.cache_ttl.is_zero() {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            *cache = Some(CachedSnapshot {
                records: records.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(records)
    }

    /// Resolve a routing key to the first record serving it.
    pub async fn resolve(&self, key: &str) -> Result<EndpointRecord, DirectoryError> {
        let records = self.snapshot().await?;
        records
            .iter()
            .find(|r| r.routing_path == key)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(key.to_string()))
    }

    /// Drop any cached snapshot so the next lookup queries discovery.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }

    fn cached(&self) -> Option<Arc<[EndpointRecord]>> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.cache_ttl)
            .map(|c| c.records.clone())
    }
}
