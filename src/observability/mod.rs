//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway pipeline, breakers, server:
//!     → logging.rs (tracing subscriber, structured events)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (observability.metrics_address)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through spans and into backend calls
//! - Metrics are cheap (atomic increments) and off unless enabled

pub mod logging;
pub mod metrics;
