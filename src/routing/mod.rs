//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path or fixed path)
//!     → router.rs (pick key source, keep query)
//!     → key.rs (extract delimiter-bounded routing key)
//!     → Return: RouteTarget { key, forward_path }
//! ```
//!
//! # Design Decisions
//! - Routing keys are computed per request, never stored
//! - No regex in hot path (single delimiter split)
//! - Deterministic: same input always yields the same key
//! - Key extraction never fails; empty paths map to the root key

pub mod key;
pub mod router;

pub use key::{extract_routing_key, ROOT_KEY};
pub use router::{KeySource, PrefixRouter, RouteTarget};
