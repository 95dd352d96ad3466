//! Dispatch of one call to a resolved backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::discovery::{Discovery, EndpointRecord};
use crate::dispatch::client::{BackendResponse, OutboundRequest, Transport};
use crate::dispatch::headers::forwardable_headers;
use crate::dispatch::DispatchFailure;
use crate::resilience::with_deadline;

/// The caller's request as it should reach the backend.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Forwards calls to backends through a [`Transport`].
#[derive(Clone)]
pub struct Dispatcher {
    discovery: Arc<dyn Discovery>,
    transport: Arc<dyn Transport>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(discovery: Arc<dyn Discovery>, transport: Arc<dyn Transport>, call_timeout: Duration) -> Self {
        Self {
            discovery,
            transport,
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Resolve `record` to a client handle and forward `request` to it.
    ///
    /// Responses below 500 are relayed as `Ok`, including 4xx. The whole
    /// call is bounded by the call timeout; on expiry the in-flight call is
    /// dropped.
    pub async fn dispatch(
        &self,
        record: &EndpointRecord,
        request: ForwardRequest,
    ) -> Result<BackendResponse, DispatchFailure> {
        let call = async {
            let handle = self
                .discovery
                .resolve_client(record)
                .await
                .map_err(DispatchFailure::Reference)?;

            let outbound = OutboundRequest {
                method: request.method,
                path_and_query: request.path_and_query,
                headers: forwardable_headers(&request.headers),
                body: request.body,
            };

            tracing::trace!(
                backend = %handle.name(),
                authority = %handle.authority(),
                path = %outbound.path_and_query,
                "Forwarding to backend"
            );

            let response = self.transport.send(&handle, outbound).await?;
            if response.status.is_server_error() {
                return Err(DispatchFailure::Status(response.status));
            }
            Ok::<_, DispatchFailure>(response)
        };

        with_deadline(self.call_timeout, call)
            .await
            .map_err(|e| DispatchFailure::Timeout(e.0))?
    }
}
