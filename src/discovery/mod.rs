//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Routing key
//!     → directory.rs (snapshot of registered records, exact-match lookup)
//!     → Discovery collaborator (list_records)
//!     → Return: EndpointRecord or NotFound
//!
//! Dispatch:
//!     EndpointRecord
//!     → Discovery collaborator (resolve_client)
//!     → ServiceHandle used by the transport
//! ```
//!
//! # Design Decisions
//! - Records are owned by the collaborator; the gateway never mutates them
//! - Snapshots are taken atomically (no torn reads during re-registration)
//! - Location handles are opaque outside of Discovery implementations
//! - Status is advisory; unhealthy backends are left to the circuit breaker

pub mod directory;
pub mod record;
pub mod registry;

use async_trait::async_trait;
use thiserror::Error;

pub use directory::{DirectoryError, EndpointDirectory};
pub use record::{EndpointRecord, EndpointStatus, Location, ServiceHandle};
pub use registry::StaticRegistry;

/// Errors reported by a discovery collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The registry could not be queried.
    #[error("Discovery unavailable: {0}")]
    Unavailable(String),

    /// A record could not be turned into a callable handle.
    #[error("Reference unavailable for '{name}': {reason}")]
    ReferenceUnavailable { name: String, reason: String },
}

/// The query interface a service registry exposes to the gateway.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// All currently registered records, as one consistent snapshot.
    async fn list_records(&self) -> Result<Vec<EndpointRecord>, DiscoveryError>;

    /// Resolve a callable client handle for a record.
    async fn resolve_client(&self, record: &EndpointRecord) -> Result<ServiceHandle, DiscoveryError>;
}
