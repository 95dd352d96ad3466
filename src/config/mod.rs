//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + GATEWAY_* environment
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared with the server at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server re-registers discovery endpoints atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the endpoint registry is hot-reloaded; breaker and timeout
//!   settings take effect on restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerConfig, BreakerScope, DiscoveryConfig, EndpointConfig, FixedRouteConfig,
    GatewayConfig, ListenerConfig, ObservabilityConfig, ResponseConfig, RoutingConfig,
    TimeoutConfig,
};
