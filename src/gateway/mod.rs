//! Gateway pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest + KeySource
//!     → routing (routing key, forwarded path)
//!     → discovery directory (EndpointRecord or NotFound / DiscoveryUnavailable)
//!     → resilience (breaker for the operation key)
//!     → dispatch (backend call)
//!     → http::response (exactly one Envelope)
//! ```
//!
//! # Design Decisions
//! - One pipeline for every inbound surface; surfaces differ only by `KeySource`
//! - Suspension points are the discovery query and the backend call
//! - Nothing on the request path is fatal; every failure becomes an envelope

pub mod pipeline;

pub use pipeline::{Gateway, InboundRequest};
