//! In-process service registry.
//!
//! # Responsibilities
//! - Hold the set of registered endpoint records
//! - Serve consistent snapshots to concurrent readers
//! - Apply registrations from configuration (startup and hot reload)
//!
//! # Design Decisions
//! - Record set lives behind `ArcSwap`: a snapshot is a single atomic load
//! - Writers build a new set and swap it in; readers never block
//! - Duplicate routing paths are accepted here; lookup order is registration order

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use url::Url;

use crate::config::EndpointConfig;
use crate::discovery::{Discovery, DiscoveryError, EndpointRecord, Location, ServiceHandle};

/// A registry backed by process memory.
#[derive(Debug)]
pub struct StaticRegistry {
    records: ArcSwap<Vec<EndpointRecord>>,
    available: AtomicBool,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<EndpointRecord>) -> Self {
        Self {
            records: ArcSwap::from_pointee(records),
            available: AtomicBool::new(true),
        }
    }

    /// Create a registry from configured endpoints.
    pub fn from_config(endpoints: &[EndpointConfig]) -> Self {
        Self::with_records(records_from_config(endpoints))
    }

    /// Register a record, replacing any record with the same name.
    pub fn register(&self, record: EndpointRecord) {
        tracing::info!(name = %record.name, routing_path = %record.routing_path, "Endpoint registered");
        self.records.rcu(|current| {
            let mut next: Vec<EndpointRecord> = current
                .iter()
                .filter(|r| r.name != record.name)
                .cloned()
                .collect();
            next.push(record.clone());
            next
        });
    }

    /// Remove a record by name. Returns true if one was removed.
    pub fn deregister(&self, name: &str) -> bool {
        let previous = self.records.rcu(|current| {
            current
                .iter()
                .filter(|r| r.name != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|r| r.name == name);
        if removed {
            tracing::info!(name = %name, "Endpoint deregistered");
        }
        removed
    }

    /// Replace the whole record set in one swap.
    pub fn replace_all(&self, records: Vec<EndpointRecord>) {
        tracing::info!(count = records.len(), "Endpoint registry replaced");
        self.records.store(Arc::new(records));
    }

    /// Toggle availability; an unavailable registry fails every query.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), DiscoveryError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DiscoveryError::Unavailable("registry is not accepting queries".to_string()))
        }
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Discovery for StaticRegistry {
    async fn list_records(&self) -> Result<Vec<EndpointRecord>, DiscoveryError> {
        self.ensure_available()?;
        Ok(self.records.load_full().as_ref().clone())
    }

    async fn resolve_client(&self, record: &EndpointRecord) -> Result<ServiceHandle, DiscoveryError> {
        self.ensure_available()?;

        let unavailable = |reason: &str| DiscoveryError::ReferenceUnavailable {
            name: record.name.clone(),
            reason: reason.to_string(),
        };

        // The record may have been deregistered since it was resolved.
        let still_registered = self
            .records
            .load()
            .iter()
            .any(|r| r.name == record.name && r.location == record.location);
        if !still_registered {
            return Err(unavailable("no longer registered"));
        }

        let url = Url::parse(record.location.as_str()).map_err(|e| unavailable(&e.to_string()))?;
        ServiceHandle::from_url(&record.name, &url).ok_or_else(|| unavailable("location has no host"))
    }
}

/// Convert configured endpoints into records, preserving order.
pub fn records_from_config(endpoints: &[EndpointConfig]) -> Vec<EndpointRecord> {
    endpoints
        .iter()
        .map(|e| {
            EndpointRecord::new(&e.name, &e.routing_path, Location::new(&e.address)).with_status(e.status)
        })
        .collect()
}
