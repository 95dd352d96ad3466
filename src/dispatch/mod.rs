//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointRecord + ForwardRequest
//!     → dispatcher.rs (resolve client handle, apply call timeout)
//!     → headers.rs (drop hop-by-hop headers)
//!     → client.rs (Transport: send, buffer response)
//!     → Return: BackendResponse or DispatchFailure
//! ```
//!
//! # Design Decisions
//! - Only 5xx, connection errors, reference errors and timeouts are failures;
//!   4xx is relayed to the caller
//! - No retries: a failed call is reported once and the breaker decides

pub mod client;
pub mod dispatcher;
pub mod headers;

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::discovery::DiscoveryError;

pub use client::{BackendResponse, HyperTransport, OutboundRequest, Transport, TransportError};
pub use dispatcher::{Dispatcher, ForwardRequest};

/// Why a dispatch attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchFailure {
    #[error("Client reference unavailable: {0}")]
    Reference(DiscoveryError),

    #[error("Backend connection failed: {0}")]
    Connection(String),

    #[error("Backend responded with {0}")]
    Status(StatusCode),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend response unreadable: {0}")]
    Body(String),
}

impl From<TransportError> for DispatchFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(reason) | TransportError::Connect(reason) => {
                DispatchFailure::Connection(reason)
            }
            TransportError::Body(reason) => DispatchFailure::Body(reason),
        }
    }
}
