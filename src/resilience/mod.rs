//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch attempt:
//!     → breakers.rs (pick the breaker for the operation key)
//!     → circuit_breaker.rs (admit, short-circuit, or admit single trial)
//!     → timeouts.rs (enforce operation deadline)
//!     → Outcome: completed value or fallback value
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries at this layer; retry policy belongs to callers
//! - Circuit breaker prevents cascading failures
//! - Breaker bookkeeping is serialized, guarded calls run concurrently

pub mod breakers;
pub mod circuit_breaker;
pub mod timeouts;

pub use breakers::BreakerRegistry;
pub use circuit_breaker::{
    BreakerSettings, BreakerStatus, CircuitBreaker, CircuitState, Outcome, Rejection,
};
pub use timeouts::{with_deadline, DeadlineExceeded};
