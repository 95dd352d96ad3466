//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Resolve the log filter from `RUST_LOG`, falling back to configuration
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `observability.log_level` so operators can raise
//!   verbosity without editing the config file
//! - Human-readable fmt output; fields stay structured for log shippers

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor configuration yields a valid one.
const FALLBACK_FILTER: &str = "service_gateway=info,tower_http=info";

/// Build the filter for a configured log level.
pub fn filter_for(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(log_level)))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Expand a bare level (`debug`) to crate-scoped directives; pass full
/// directive strings through unchanged.
fn directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("service_gateway={level},tower_http={level}")
    }
}

/// Install the global subscriber.
pub fn init(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
