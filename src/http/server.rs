//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: catch-all gateway route plus fixed routes
//! - Wire up middleware (request ID, tracing)
//! - Hand each request to the gateway pipeline
//! - Apply reloaded endpoint registrations
//! - Serve until shutdown is signalled
//!
//! # Design Decisions
//! - Body limit and request deadline are enforced in the handler, so callers
//!   get an envelope for those failures too

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::discovery::registry::records_from_config;
use crate::discovery::{Discovery, StaticRegistry};
use crate::dispatch::{HyperTransport, Transport};
use crate::gateway::{Gateway, InboundRequest};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response::{Envelope, NOT_AVAILABLE_MESSAGE};
use crate::resilience::with_deadline;
use crate::routing::KeySource;

/// Message for bodies over the configured limit.
const BODY_TOO_LARGE_MESSAGE: &str = "Request body exceeds the configured limit.";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub request_timeout_status: u16,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<Gateway>,
    registry: Arc<StaticRegistry>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server backed by the configured endpoints and a hyper transport.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(StaticRegistry::from_config(&config.discovery.endpoints));
        let transport = Arc::new(HyperTransport::new(
            config.timeouts.connect(),
            config.response.max_backend_body_bytes,
        ));
        Self::with_transport(config, registry, transport)
    }

    /// Create a server over explicit collaborators.
    pub fn with_transport(
        config: GatewayConfig,
        registry: Arc<StaticRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let discovery: Arc<dyn Discovery> = registry.clone();
        let gateway = Arc::new(Gateway::from_config(&config, discovery, transport));

        let state = AppState {
            gateway: gateway.clone(),
            max_body_bytes: config.listener.max_body_bytes,
            request_timeout: config.timeouts.request(),
            request_timeout_status: config.response.request_timeout_status,
        };

        let router = Self::build_router(&gateway, state);
        Self {
            router,
            gateway,
            registry,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(gateway: &Gateway, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler));

        for (mount, source) in gateway.router().fixed_sources() {
            tracing::info!(mount = %mount, source = ?source, "Mounting fixed route");
            router = router.route(
                mount,
                any(move |State(state): State<AppState>, request: Request<Body>| {
                    let source = source.clone();
                    async move { serve(state, &source, request).await }
                }),
            );
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn registry(&self) -> &Arc<StaticRegistry> {
        &self.registry
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Apply reloaded configurations as they arrive.
    ///
    /// Only endpoint registrations are hot-reloadable; other settings take
    /// effect on restart.
    pub fn watch_config(&self, mut updates: mpsc::UnboundedReceiver<GatewayConfig>) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                let records = records_from_config(&config.discovery.endpoints);
                tracing::info!(endpoints = records.len(), "Applying reloaded endpoint registrations");
                let routing_paths: Vec<String> =
                    records.iter().map(|r| r.routing_path.clone()).collect();
                registry.replace_all(records);
                gateway.directory().invalidate();
                gateway.breakers().retain_routing_paths(&routing_paths);
            }
        })
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.registry.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: the routing key comes from the request path.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Envelope {
    serve(state, &KeySource::RequestPath, request).await
}

async fn serve(state: AppState, source: &KeySource, request: Request<Body>) -> Envelope {
    let request_id = request_id(request.headers());
    let status = state.request_timeout_status;

    match with_deadline(state.request_timeout, forward(&state, source, request)).await {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request deadline exceeded");
            Envelope::error(status, vec![NOT_AVAILABLE_MESSAGE.to_string()])
        }
    }
}

async fn forward(state: &AppState, source: &KeySource, request: Request<Body>) -> Envelope {
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return Envelope::error(413, vec![BODY_TOO_LARGE_MESSAGE.to_string()]);
        }
    };

    let inbound = InboundRequest {
        request_id,
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };
    state.gateway.handle(source, inbound).await
}
