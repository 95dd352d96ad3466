//! Service gateway library: prefix routing, circuit breaking and dispatch
//! to registered backends behind a uniform response envelope.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
