//! The route → resolve → breaker → dispatch → envelope pipeline.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, Uri};

use crate::config::{GatewayConfig, ResponseConfig};
use crate::discovery::{DirectoryError, Discovery, EndpointDirectory, EndpointRecord};
use crate::dispatch::{BackendResponse, DispatchFailure, Dispatcher, ForwardRequest, Transport};
use crate::http::response::{
    payload_from_body, Envelope, EnvelopeType, NOT_AVAILABLE_MESSAGE, NOT_REGISTERED_MESSAGE,
    TEMPORARILY_UNAVAILABLE_MESSAGE,
};
use crate::observability::metrics;
use crate::resilience::{BreakerRegistry, Rejection};
use crate::routing::{KeySource, PrefixRouter, RouteTarget};

/// Metrics label for requests that resolved to no endpoint.
const UNRESOLVED_LABEL: &str = "none";

/// An inbound call, detached from the server's request type.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub request_id: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Everything needed to serve one request end to end.
pub struct Gateway {
    router: PrefixRouter,
    directory: EndpointDirectory,
    breakers: BreakerRegistry,
    dispatcher: Dispatcher,
    responses: ResponseConfig,
}

impl Gateway {
    pub fn new(
        router: PrefixRouter,
        directory: EndpointDirectory,
        breakers: BreakerRegistry,
        dispatcher: Dispatcher,
        responses: ResponseConfig,
    ) -> Self {
        Self {
            router,
            directory,
            breakers,
            dispatcher,
            responses,
        }
    }

    /// Wire a gateway from configuration and its two collaborators.
    pub fn from_config(
        config: &GatewayConfig,
        discovery: Arc<dyn Discovery>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::new(
            PrefixRouter::from_config(&config.routing),
            EndpointDirectory::new(discovery.clone(), config.discovery.cache_ttl()),
            BreakerRegistry::from_config(&config.breaker),
            Dispatcher::new(discovery, transport, config.timeouts.call()),
            config.response.clone(),
        )
    }

    pub fn router(&self) -> &PrefixRouter {
        &self.router
    }

    pub fn directory(&self) -> &EndpointDirectory {
        &self.directory
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Serve one request. Always yields exactly one envelope.
    pub async fn handle(&self, source: &KeySource, request: InboundRequest) -> Envelope {
        let start = Instant::now();
        let target = self.router.target(source, &request.uri);
        let method = request.method.clone();

        tracing::debug!(
            request_id = %request.request_id,
            method = %method,
            routing_key = %target.key,
            path = %target.forward_path,
            "Routing request"
        );

        let (envelope, resolved) = self.serve(&target, request).await;

        metrics::record_request(
            method.as_str(),
            envelope.status_code,
            metrics_label(resolved.as_deref()),
            start,
        );
        envelope
    }

    /// Returns the envelope and the routing path it resolved to, if any.
    async fn serve(&self, target: &RouteTarget, request: InboundRequest) -> (Envelope, Option<String>) {
        let record = match self.directory.resolve(&target.key).await {
            Ok(record) => record,
            Err(DirectoryError::NotFound(key)) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    routing_key = %key,
                    "No endpoint registered for routing key"
                );
                let envelope = Envelope::error(
                    self.responses.not_found_status,
                    vec![NOT_REGISTERED_MESSAGE.to_string()],
                );
                return (envelope, None);
            }
            Err(DirectoryError::DiscoveryUnavailable(error)) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    routing_key = %target.key,
                    error = %error,
                    "Discovery unavailable"
                );
                let envelope = Envelope::error(
                    self.responses.discovery_failure_status,
                    vec![NOT_REGISTERED_MESSAGE.to_string()],
                );
                return (envelope, None);
            }
        };

        let breaker = self.breakers.breaker_for(&record.routing_path);
        let request_id = request.request_id;
        let forward = ForwardRequest {
            method: request.method,
            path_and_query: target.forward_path.clone(),
            headers: request.headers,
            body: request.body,
        };

        let dispatcher = &self.dispatcher;
        let record_ref = &record;
        let envelope = breaker
            .execute(
                || async move { dispatcher.dispatch(record_ref, forward).await.map(relay) },
                |rejection| self.fallback(&record, &request_id, rejection),
            )
            .await
            .into_inner();
        (envelope, Some(record.routing_path.clone()))
    }

    fn fallback(
        &self,
        record: &EndpointRecord,
        request_id: &str,
        rejection: Rejection<DispatchFailure>,
    ) -> Envelope {
        match rejection {
            Rejection::ShortCircuited => {
                tracing::warn!(
                    request_id = %request_id,
                    endpoint = %record.name,
                    "Circuit open, request short-circuited"
                );
                Envelope::error(
                    self.responses.breaker_open_status,
                    vec![TEMPORARILY_UNAVAILABLE_MESSAGE.to_string()],
                )
            }
            Rejection::Failed(failure) => {
                tracing::warn!(
                    request_id = %request_id,
                    endpoint = %record.name,
                    error = %failure,
                    "Dispatch failed"
                );
                Envelope::error(
                    self.responses.dispatch_failure_status,
                    vec![NOT_AVAILABLE_MESSAGE.to_string()],
                )
            }
            Rejection::TimedOut(limit) => {
                tracing::warn!(
                    request_id = %request_id,
                    endpoint = %record.name,
                    timeout = ?limit,
                    "Dispatch exceeded breaker deadline"
                );
                Envelope::error(
                    self.responses.dispatch_failure_status,
                    vec![NOT_AVAILABLE_MESSAGE.to_string()],
                )
            }
        }
    }
}

fn metrics_label(resolved: Option<&str>) -> &str {
    resolved.unwrap_or(UNRESOLVED_LABEL)
}

/// Relay a backend response: 4xx as an error envelope, everything else as success.
fn relay(response: BackendResponse) -> Envelope {
    let kind = if response.status.is_client_error() {
        EnvelopeType::Error
    } else {
        EnvelopeType::Success
    };
    let location = if response.status.is_redirection() {
        response.headers.get(header::LOCATION).cloned()
    } else {
        None
    };
    Envelope::build(
        kind,
        response.status.as_u16(),
        payload_from_body(&response.body),
        Vec::new(),
    )
    .with_location(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use futures_util::future::join_all;
    use serde_json::json;

    use crate::config::{BreakerScope, FixedRouteConfig};
    use crate::discovery::{Location, ServiceHandle, StaticRegistry};
    use crate::dispatch::{OutboundRequest, TransportError};
    use crate::resilience::CircuitState;

    /// Transport replying from a queue, falling back to a default reply.
    struct FakeTransport {
        replies: Mutex<VecDeque<Result<BackendResponse, TransportError>>>,
        default_reply: Result<BackendResponse, TransportError>,
        delay: Duration,
        calls: AtomicUsize,
        paths: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(default_reply: Result<BackendResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::new()),
                default_reply,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                paths: Mutex::new(Vec::new()),
            })
        }

        fn ok(body: &'static str) -> Arc<Self> {
            Self::new(Ok(BackendResponse::new(StatusCode::OK, body)))
        }

        fn push(&self, reply: Result<BackendResponse, TransportError>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(
            &self,
            _handle: &ServiceHandle,
            request: OutboundRequest,
        ) -> Result<BackendResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.paths.lock().unwrap().push(request.path_and_query);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let queued = self.replies.lock().unwrap().pop_front();
            queued.unwrap_or_else(|| self.default_reply.clone())
        }
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.breaker.failure_threshold = 2;
        config.breaker.rolling_window_ms = 10_000;
        config.breaker.reset_timeout_ms = 5_000;
        config.timeouts.call_ms = 1_000;
        config
    }

    fn registry() -> Arc<StaticRegistry> {
        Arc::new(StaticRegistry::with_records(vec![
            EndpointRecord::new("orders-service", "orders", Location::new("http://127.0.0.1:3001")),
            EndpointRecord::new("auth-service", "auth", Location::new("http://127.0.0.1:3002")),
        ]))
    }

    fn gateway(config: &GatewayConfig, registry: Arc<StaticRegistry>, transport: Arc<FakeTransport>) -> Gateway {
        Gateway::from_config(config, registry, transport)
    }

    fn get(path: &str) -> InboundRequest {
        InboundRequest {
            request_id: "req-1".to_string(),
            method: Method::GET,
            uri: path.parse().unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn server_error() -> Result<BackendResponse, TransportError> {
        Ok(BackendResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "boom"))
    }

    #[tokio::test]
    async fn test_success_relays_backend_body() {
        let transport = FakeTransport::ok(r#"{"id":123,"state":"shipped"}"#);
        let gateway = gateway(&config(), registry(), transport.clone());

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/123")).await;

        assert_eq!(
            envelope,
            Envelope::success(200, vec![json!({"id": 123, "state": "shipped"})])
        );
        assert_eq!(transport.paths.lock().unwrap().as_slice(), ["/orders/123"]);
    }

    #[tokio::test]
    async fn test_redirect_keeps_location() {
        let mut redirect = BackendResponse::new(StatusCode::FOUND, "");
        redirect
            .headers
            .insert(header::LOCATION, "/orders/v2/1".parse().unwrap());
        let transport = FakeTransport::new(Ok(redirect));
        let gateway = gateway(&config(), registry(), transport);

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;

        assert!(envelope.is_success());
        assert_eq!(envelope.status_code, 302);
        assert_eq!(envelope.location.unwrap(), "/orders/v2/1");
    }

    #[test]
    fn test_location_only_relayed_for_redirects() {
        let mut created = BackendResponse::new(StatusCode::CREATED, "{}");
        created
            .headers
            .insert(header::LOCATION, "/orders/7".parse().unwrap());
        assert!(relay(created).location.is_none());
    }

    #[tokio::test]
    async fn test_metrics_label_is_resolved_routing_path() {
        let gateway = gateway(&config(), registry(), FakeTransport::ok("[]"));
        let target = gateway
            .router()
            .target(&KeySource::RequestPath, &"/orders/1".parse().unwrap());
        let (_, resolved) = gateway.serve(&target, get("/orders/1")).await;
        assert_eq!(metrics_label(resolved.as_deref()), "orders");

        let target = gateway
            .router()
            .target(&KeySource::RequestPath, &"/3f2a9c/x".parse().unwrap());
        let (envelope, resolved) = gateway.serve(&target, get("/3f2a9c/x")).await;
        assert_eq!(envelope.status_code, 404);
        assert_eq!(metrics_label(resolved.as_deref()), UNRESOLVED_LABEL);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_dispatched() {
        let transport = FakeTransport::ok("[]");
        let gateway = gateway(&config(), registry(), transport.clone());

        let envelope = gateway.handle(&KeySource::RequestPath, get("/unknown/1")).await;

        assert_eq!(envelope, Envelope::error(404, vec![NOT_REGISTERED_MESSAGE.to_string()]));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_discovery_unavailable() {
        let registry = registry();
        registry.set_available(false);
        let transport = FakeTransport::ok("[]");
        let gateway = gateway(&config(), registry, transport.clone());

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;

        assert_eq!(envelope, Envelope::error(503, vec![NOT_REGISTERED_MESSAGE.to_string()]));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_client_error_is_relayed_without_tripping() {
        let transport = FakeTransport::new(Ok(BackendResponse::new(
            StatusCode::NOT_FOUND,
            r#"{"error":"no such order"}"#,
        )));
        let gateway = gateway(&config(), registry(), transport.clone());

        for _ in 0..5 {
            let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/9")).await;
            assert_eq!(envelope.kind, EnvelopeType::Error);
            assert_eq!(envelope.status_code, 404);
            assert_eq!(envelope.payload, vec![json!({"error": "no such order"})]);
            assert!(envelope.messages.is_empty());
        }

        assert_eq!(transport.calls(), 5);
        assert_eq!(gateway.breakers().breaker_for("orders").state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_short_circuits() {
        let transport = FakeTransport::new(server_error());
        let gateway = gateway(&config(), registry(), transport.clone());

        for _ in 0..2 {
            let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
            assert_eq!(envelope, Envelope::error(502, vec![NOT_AVAILABLE_MESSAGE.to_string()]));
        }
        assert_eq!(transport.calls(), 2);

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        assert_eq!(
            envelope,
            Envelope::error(503, vec![TEMPORARILY_UNAVAILABLE_MESSAGE.to_string()])
        );
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_while_open_never_dispatch() {
        let transport = FakeTransport::new(server_error());
        let gateway = gateway(&config(), registry(), transport.clone());
        for _ in 0..2 {
            gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        }

        let source = KeySource::RequestPath;
        let envelopes = join_all((0..32).map(|_| gateway.handle(&source, get("/orders/1")))).await;

        assert!(envelopes.iter().all(|e| e.status_code == 503
            && e.messages == [TEMPORARILY_UNAVAILABLE_MESSAGE]));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_reset_timeout() {
        let transport = FakeTransport::ok("[]");
        transport.push(server_error());
        transport.push(server_error());
        let gateway = gateway(&config(), registry(), transport.clone());

        for _ in 0..2 {
            gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        }
        assert_eq!(gateway.breakers().breaker_for("orders").state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(5)).await;

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        assert_eq!(envelope, Envelope::success(200, vec![]));
        assert_eq!(gateway.breakers().breaker_for("orders").state(), CircuitState::Closed);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_endpoint_breakers_are_isolated() {
        let transport = FakeTransport::new(server_error());
        let gateway = gateway(&config(), registry(), transport.clone());
        for _ in 0..2 {
            gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        }

        let envelope = gateway.handle(&KeySource::RequestPath, get("/auth/check")).await;
        assert_eq!(envelope.status_code, 502);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_breaker_trips_for_all_endpoints() {
        let mut config = config();
        config.breaker.scope = BreakerScope::Shared;
        let transport = FakeTransport::new(server_error());
        let gateway = gateway(&config, registry(), transport.clone());
        for _ in 0..2 {
            gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        }

        let envelope = gateway.handle(&KeySource::RequestPath, get("/auth/check")).await;
        assert_eq!(envelope.status_code, 503);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let transport = Arc::new(FakeTransport {
            replies: Mutex::new(VecDeque::new()),
            default_reply: Ok(BackendResponse::new(StatusCode::OK, "[]")),
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        });
        let gateway = gateway(&config(), registry(), transport);

        let envelope = gateway.handle(&KeySource::RequestPath, get("/orders/1")).await;
        assert_eq!(envelope, Envelope::error(502, vec![NOT_AVAILABLE_MESSAGE.to_string()]));
        assert_eq!(gateway.breakers().breaker_for("orders").status().failure_count, 1);
    }

    #[tokio::test]
    async fn test_fixed_source_uses_configured_path() {
        let mut config = config();
        config.routing.fixed_routes.push(FixedRouteConfig {
            mount: "/authorize".into(),
            path: "/auth/authorize".into(),
        });
        let transport = FakeTransport::ok(r#"{"granted":true}"#);
        let gateway = gateway(&config, registry(), transport.clone());

        let (_, source) = gateway.router().fixed_sources().next().unwrap();
        let envelope = gateway.handle(&source, get("/authorize?scope=read")).await;

        assert!(envelope.is_success());
        assert_eq!(transport.paths.lock().unwrap().as_slice(), ["/auth/authorize?scope=read"]);
    }

    #[tokio::test]
    async fn test_root_key_without_registration() {
        let gateway = gateway(&config(), registry(), FakeTransport::ok("[]"));
        let envelope = gateway.handle(&KeySource::RequestPath, get("/")).await;
        assert_eq!(envelope.status_code, 404);
    }
}
